//! Attribute macros for the `conflux` runtime.
//!
//! Both macros accept an optional `worker_threads = N` argument.

mod utils;

use proc_macro::{TokenStream, TokenTree};

/// Runs an `async fn main` on a freshly built scheduler.
///
/// ```rust,ignore
/// #[conflux::main(worker_threads = 2)]
/// async fn main() {
///     println!("running on {:?}", conflux::this_coro::scheduler().await);
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = match utils::parse_options(attr) {
        Ok(options) => options,
        Err(msg) => return utils::compile_error(&msg),
    };

    match utils::wrap_body(item, &options) {
        Some(tokens) => tokens.into_iter().collect(),
        None => utils::compile_error("#[conflux::main] expects a function with a body"),
    }
}

/// Turns an `async fn` into a `#[test]` that runs on its own scheduler.
///
/// The function may return any type a `#[test]` may return, such as
/// `anyhow::Result<()>`.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = match utils::parse_options(attr) {
        Ok(options) => options,
        Err(msg) => return utils::compile_error(&msg),
    };

    let Some(tokens) = utils::wrap_body(item, &options) else {
        return utils::compile_error("#[conflux::test] expects a function with a body");
    };

    let mut result: Vec<TokenTree> = match "#[test]".parse::<TokenStream>() {
        Ok(attr) => attr.into_iter().collect(),
        Err(_) => return utils::compile_error("failed to build the #[test] attribute"),
    };
    result.extend(tokens);

    result.into_iter().collect()
}
