//! Marker macros for the `sprig` crate. Use them through the re-exports in `sprig`, since the
//! generated code refers to `::sprig` paths.

use crate::bean::expand_bean;
use crate::interface::{expand_injectable, register_bean_interface};
use crate::routes::expand_routes;
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, Error, Item};

mod attributes;
mod bean;
mod interface;
mod routes;

/// Registers a struct as a bean candidate. The role is declared with one of the helper
/// attributes, each accepting an optional explicit bean name:
///
/// * `#[controller]` / `#[controller(name = "...")]`,
/// * `#[service]` / `#[service(name = "...")]`,
/// * `#[component]` / `#[component(name = "...")]`.
///
/// Controllers can declare a base path with `#[request_mapping("/base")]`. Fields of type
/// `Autowired<T>` marked with `#[autowired]` or `#[autowired(name = "...")]` are injected after all
/// beans are created.
///
/// Beans are created with [Default], unless a custom constructor returning `Result<Self, E>` is
/// given with `#[bean(constructor = "path::to::function")]`.
#[proc_macro_derive(
    Bean,
    attributes(controller, service, component, request_mapping, autowired, bean)
)]
pub fn derive_bean(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_bean(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Makes `dyn Trait + Send + Sync` injectable, so it can be used as `Autowired<dyn Trait + Send +
/// Sync>` and as a bean key of services implementing it.
#[proc_macro_attribute]
pub fn injectable(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as Item);
    expand_injectable(&item)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Registers an injectable trait implementation as an interface of the implementing bean. Services
/// without an explicit name are registered under each of their interfaces.
#[proc_macro_attribute]
pub fn bean_interface(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as Item);
    register_bean_interface(&item)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Registers public `&self` methods marked with `#[request_mapping("/path")]` as request handlers.
/// Parameters are bound by their types: `&dyn Request`, `&mut dyn Response`, textual (`String`,
/// `&str`, `Option<String>`) or anything else implementing [Default].
#[proc_macro_attribute]
pub fn routes(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as Item);
    expand_routes(item)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}
