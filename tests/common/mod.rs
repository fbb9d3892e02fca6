#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;

    use tempfile::NamedTempFile;

    /// Writes a handler config to a fresh `.yaml` file, removed on drop.
    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("jsonrest_test_")
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}

pub mod services {
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use jsonrest::{Bindable, Fault, RequestContext};

    #[derive(Debug, PartialEq, Bindable)]
    pub struct Address {
        pub street: String,
        pub zip: i32,
    }

    #[derive(Debug, PartialEq, Bindable)]
    pub struct Person {
        pub name: String,
        pub nickname: Option<String>,
        pub address: Address,
        #[bind(rename = "tags")]
        pub labels: Vec<String>,
    }

    /// Service covering every binding and dispatch path.
    #[derive(Debug, Default)]
    pub struct People {
        pub secret_calls: AtomicUsize,
    }

    #[jsonrest::service]
    impl People {
        pub fn register(&self, name: String, age: i32) -> String {
            format!("{name}:{age}")
        }

        pub fn zip_of(&self, address: Address) -> i32 {
            address.zip
        }

        pub fn describe(&self, person: Person) -> String {
            format!(
                "{} ({}) {} {} [{}]",
                person.name,
                person.nickname.unwrap_or_default(),
                person.address.street,
                person.address.zip,
                person.labels.join(",")
            )
        }

        pub fn fixed(&self, values: [i32; 3]) -> Vec<i32> {
            values.to_vec()
        }

        pub fn boxed(&self, values: Box<[i32]>) -> usize {
            values.len()
        }

        pub fn list(&self, values: Vec<i32>) -> Vec<i32> {
            values
        }

        #[requires_auth]
        pub fn secret(&self) -> String {
            self.secret_calls.fetch_add(1, Ordering::SeqCst);
            "classified".to_string()
        }

        #[log_io]
        pub fn add(&self, a: i64, b: i64) -> i64 {
            a + b
        }

        pub fn fail(&self, reason: String) -> anyhow::Result<i32> {
            Err(anyhow!(reason))
        }

        pub fn refuse(&self) -> anyhow::Result<()> {
            Err(Fault::new("not today").with_code("E_REFUSED").into())
        }

        pub fn boom(&self) -> i32 {
            panic!("boom")
        }

        pub fn nothing(&self) {}

        pub fn path_of(&self, ctx: RequestContext, suffix: String) -> String {
            format!("{}{suffix}", ctx.path)
        }

        pub fn object(&self) -> serde_json::Value {
            serde_json::json!({ "a": 1 })
        }

        fn hidden(&self) -> i32 {
            1
        }

        pub(crate) fn crate_only(&self) -> i32 {
            self.hidden()
        }

        pub fn associated() -> i32 {
            0
        }
    }

    impl fmt::Display for People {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("People")
        }
    }

    /// Names exposed by [`People`], in declaration order.
    pub const PEOPLE_METHODS: [&str; 14] = [
        "register", "zip_of", "describe", "fixed", "boxed", "list", "secret", "add", "fail",
        "refuse", "boom", "nothing", "path_of", "object",
    ];
}

pub mod sinks {
    use std::error::Error;
    use std::fmt;
    use std::sync::Mutex;

    use jsonrest::binder::BoundArguments;
    use jsonrest::trace::{TraceSink, TracingSink};
    use serde_json::Value;

    /// Keeps every trace line in memory.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub lines: Mutex<Vec<String>>,
        pub errors: Mutex<Vec<String>>,
    }

    impl TraceSink for RecordingSink {
        fn log_call_input(&self, method: &str, args: &BoundArguments) -> fmt::Result {
            let line = TracingSink::format_call(method, args)?;
            self.lines.lock().unwrap().push(line);
            Ok(())
        }

        fn log_call_output(&self, method: &str, result: &Value, args: &BoundArguments) -> fmt::Result {
            let line = TracingSink::format_result(method, result, args)?;
            self.lines.lock().unwrap().push(line);
            Ok(())
        }

        fn log_error(&self, message: &str, error: &dyn Error) {
            self.errors.lock().unwrap().push(format!("{message} {error}"));
        }
    }

    /// Fails on input and panics on output.
    #[derive(Debug, Default)]
    pub struct BrokenSink {
        pub errors: Mutex<Vec<String>>,
    }

    impl TraceSink for BrokenSink {
        fn log_call_input(&self, _method: &str, _args: &BoundArguments) -> fmt::Result {
            Err(fmt::Error)
        }

        fn log_call_output(&self, _method: &str, _result: &Value, _args: &BoundArguments) -> fmt::Result {
            panic!("sink exploded")
        }

        fn log_error(&self, message: &str, error: &dyn Error) {
            self.errors.lock().unwrap().push(format!("{message} | {error}"));
        }
    }
}
