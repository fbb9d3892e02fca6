//! Procedural macros for `jsonrest`.
//!
//! - `#[service]` turns an inherent `impl` block into a route table
//! - `#[derive(Bindable)]` lets structs be bound from JSON objects

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, FnArg, ImplItem,
    ImplItemFn, ItemImpl, LitStr, Pat, ReturnType, Type, Visibility,
};

const REQUIRES_AUTH: &str = "requires_auth";
const LOG_IO: &str = "log_io";

/// Exposes the `pub fn` methods taking `&self` of an inherent impl block.
///
/// Methods are exposed in declaration order. Private methods, methods without
/// a receiver and trait impls are never exposed. `#[requires_auth]` and
/// `#[log_io]` on a method set the corresponding descriptor flags.
#[proc_macro_attribute]
pub fn service(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(Span::call_site(), "#[service] takes no arguments")
            .to_compile_error()
            .into();
    }
    let mut item_impl = parse_macro_input!(item as ItemImpl);
    match expand_service(&mut item_impl) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Implements `Bindable` for a struct with named fields.
///
/// `#[bind(rename = "name")]` on a field changes the key it is matched against.
#[proc_macro_derive(Bindable, attributes(bind))]
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_bindable(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct Param {
    name: String,
    ty: Type,
}

fn expand_service(item_impl: &mut ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &item_impl.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[service] must be placed on an inherent impl block",
        ));
    }

    let type_name = type_name(&item_impl.self_ty);
    let mut entries = Vec::new();

    for item in &mut item_impl.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let requires_auth = take_marker(&mut method.attrs, REQUIRES_AUTH);
        let log_io = take_marker(&mut method.attrs, LOG_IO);

        if !matches!(method.vis, Visibility::Public(_)) {
            continue;
        }
        let Some(receiver) = method.sig.receiver() else {
            continue;
        };
        if receiver.reference.is_none() || receiver.mutability.is_some() || receiver.colon_token.is_some() {
            return Err(syn::Error::new_spanned(
                receiver,
                "exposed methods must take `&self`",
            ));
        }
        check_signature(method)?;

        entries.push(method_entry(method, requires_auth, log_io)?);
    }

    let self_ty = &item_impl.self_ty;
    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    Ok(quote! {
        #item_impl

        impl #impl_generics ::jsonrest::service::Service for #self_ty #where_clause {
            fn type_name(&self) -> &'static str {
                #type_name
            }

            fn methods() -> ::std::vec::Vec<::jsonrest::service::MethodEntry<Self>> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}

fn check_signature(method: &ImplItemFn) -> syn::Result<()> {
    let sig = &method.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "exposed methods cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "exposed methods cannot be generic",
        ));
    }
    Ok(())
}

fn method_entry(method: &ImplItemFn, requires_auth: bool, log_io: bool) -> syn::Result<TokenStream2> {
    let sig = &method.sig;
    let method_ident = &sig.ident;
    let method_name = method_ident.unraw().to_string();
    let params = params(method)?;

    let (return_type, wrap) = match &sig.output {
        ReturnType::Default => ("()".to_string(), quote!(::jsonrest::service::from_unit)),
        ReturnType::Type(_, ty) if is_result(ty) => {
            (type_to_string(ty), quote!(::jsonrest::service::from_result))
        }
        ReturnType::Type(_, ty) => (type_to_string(ty), quote!(::jsonrest::service::from_value)),
    };

    let descriptor_params = params.iter().map(|Param { name, ty }| {
        quote! { .param(#name, <#ty as ::jsonrest::binder::Bindable>::shape) }
    });

    let locals: Vec<_> = (0..params.len()).map(|i| format_ident!("__arg{}", i)).collect();
    let reads = params.iter().zip(&locals).map(|(Param { name, ty }, local)| {
        quote! { let #local = __cursor.next_arg::<#ty>(#name)?; }
    });

    let body = if params.is_empty() {
        quote! {
            let _ = __args;
            #wrap(__service.#method_ident())
        }
    } else {
        quote! {
            let mut __cursor = __args.into_cursor();
            #(#reads)*
            #wrap(__service.#method_ident(#(#locals),*))
        }
    };

    Ok(quote! {
        ::jsonrest::service::MethodEntry::new(
            ::jsonrest::service::MethodDescriptor::new(#method_name, #return_type)
                #(#descriptor_params)*
                .requires_auth(#requires_auth)
                .log_io(#log_io),
            |__service: &Self, __args: ::jsonrest::binder::BoundArguments|
                -> ::jsonrest::service::InvokeResult {
                #body
            },
        )
    })
}

fn params(method: &ImplItemFn) -> syn::Result<Vec<Param>> {
    let mut params = Vec::new();
    for input in &method.sig.inputs {
        let FnArg::Typed(pat_type) = input else {
            continue;
        };
        let Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
            return Err(syn::Error::new_spanned(
                &pat_type.pat,
                "parameters of exposed methods must be plain identifiers",
            ));
        };
        if matches!(pat_type.ty.as_ref(), Type::Reference(_)) {
            return Err(syn::Error::new_spanned(
                &pat_type.ty,
                "parameters of exposed methods must be owned types",
            ));
        }
        params.push(Param {
            name: pat_ident.ident.unraw().to_string(),
            ty: (*pat_type.ty).clone(),
        });
    }
    Ok(params)
}

/// Removes every `#[name]` attribute; returns whether one was present.
fn take_marker(attrs: &mut Vec<Attribute>, name: &str) -> bool {
    let before = attrs.len();
    attrs.retain(|attr| !attr.path().is_ident(name));
    attrs.len() != before
}

fn is_result(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Result"),
        _ => false,
    }
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.unraw().to_string())
            .unwrap_or_else(|| type_to_string(ty)),
        other => type_to_string(other),
    }
}

/// Renders a type the way it is usually written: `Vec<u8>`, not `Vec < u8 >`.
fn type_to_string(ty: &Type) -> String {
    let raw = quote!(#ty).to_string();
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let glue_prev = matches!(out.chars().last(), Some(':' | '<' | '&' | '(' | '['));
            let glue_next = matches!(
                chars.get(i + 1).copied(),
                Some(':' | '<' | '>' | ',' | ')' | ']' | ';')
            );
            if glue_prev || glue_next {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn expand_bindable(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let name = ident.unraw().to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "Bindable can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "Bindable can only be derived for structs",
            ))
        }
    };

    let mut members = Vec::with_capacity(fields.len());
    let mut takes = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let member = match bind_rename(&field.attrs)? {
            Some(rename) => rename,
            None => field_ident.unraw().to_string(),
        };
        let ty = &field.ty;
        members.push(quote! {
            ::jsonrest::binder::MemberShape::new(#member, <#ty as ::jsonrest::binder::Bindable>::shape)
        });
        takes.push(quote! { #field_ident: __members.take::<#ty>(#member)?, });
    }

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::jsonrest::binder::Bindable));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let from_bound = if takes.is_empty() {
        quote! {
            let _ = bound.into_members(#name)?;
            ::core::result::Result::Ok(Self {})
        }
    } else {
        quote! {
            let mut __members = bound.into_members(#name)?;
            ::core::result::Result::Ok(Self { #(#takes)* })
        }
    };

    Ok(quote! {
        impl #impl_generics ::jsonrest::binder::Bindable for #ident #ty_generics #where_clause {
            fn shape() -> ::jsonrest::binder::TypeShape {
                ::jsonrest::binder::TypeShape::Composite(::jsonrest::binder::CompositeShape::new(
                    #name,
                    ::std::vec![#(#members),*],
                ))
            }

            fn from_bound(
                bound: ::jsonrest::binder::Bound,
            ) -> ::core::result::Result<Self, ::jsonrest::binder::BindError> {
                #from_bound
            }
        }
    })
}

fn bind_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("bind")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported bind attribute, expected `rename = \"...\"`"))
            }
        })?;
    }
    Ok(rename)
}
