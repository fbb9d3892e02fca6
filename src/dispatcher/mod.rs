//! # Dispatcher Module
//!
//! The HTTP-agnostic entry point. The host hands over an [`IncomingRequest`] and
//! writes back the [`HandlerResponse`].
//!
//! ## Request Flow
//!
//! 1. The raw URL is normalised ([`normalize_path`])
//! 2. A [`RequestContext`](crate::RequestContext) is built from headers, cookies and query
//! 3. The router finds the first matching route
//! 4. The auth gate asks the [`SessionSource`](crate::session::SessionSource)
//! 5. The route binds the body and invokes the method
//! 6. The outcome is rendered as JSON
//!
//! ## Rendering
//!
//! | Outcome | Status | Body |
//! |---|---|---|
//! | string result | 200 | `{"response": "..."}` |
//! | `()` / `null` | 200 | empty |
//! | other result | 200 | the value |
//! | unauthorized | 401 | `{"error": "You're not connected."}` |
//! | unknown path | 404 | `{"error": "Unknown path"}` |
//! | [`Fault`](crate::Fault) | 400 | `{"error": reason, "code": code}` |
//! | other errors | [`DispatchError::status`](crate::DispatchError::status) | `{"error": message}` |

mod core;
mod path;
mod request;
mod response;

pub use core::{Dispatcher, RouterBuilder, NOT_CONNECTED, UNKNOWN_PATH};
pub use path::normalize_path;
pub use request::IncomingRequest;
pub use response::{HandlerResponse, JSON_CONTENT_TYPE};
