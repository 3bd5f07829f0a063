//! Attribute macros for `specleft`.
//!
//! `#[scenario(feature_id = "...", scenario_id = "...")]` binds a test to a
//! spec scenario and `#[traced]` records an unbound test. Both validate their
//! arguments at compile time and wrap the test body in the runtime hooks; use
//! them through the `specleft` re-exports.

use proc_macro::TokenStream;
use syn::{ItemFn, parse_macro_input};

mod args;
mod crate_path;
mod expand;
mod validate;

#[cfg(test)]
mod tests;

/// Bind a test function to a scenario.
///
/// Arguments:
///
/// - `feature_id = "CALC-1"`: upper-case letters, digits and `-`.
/// - `scenario_id = "add-positive"`: lower-case letters, digits and `-`.
/// - `skip` or `skip = true`: record the test as skipped without running it.
/// - `reason = "..."`: why the test is skipped.
/// - `crate = "path"`: where `specleft` is found when renamed.
///
/// An invalid identifier, an unknown argument or a second binding attribute
/// on the same function is a compile error.
#[proc_macro_attribute]
pub fn scenario(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = args::ScenarioArgs::default();
    let parser = syn::meta::parser(|meta| args.apply(&meta));
    parse_macro_input!(attr with parser);
    let function = parse_macro_input!(item as ItemFn);
    expand::scenario(&args, function)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Record a test that is not bound to any scenario.
///
/// The result lands in the run's unclassified bucket. Accepts
/// `crate = "path"` like [`macro@scenario`].
#[proc_macro_attribute]
pub fn traced(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = args::TracedArgs::default();
    let parser = syn::meta::parser(|meta| args.apply(&meta));
    parse_macro_input!(attr with parser);
    let function = parse_macro_input!(item as ItemFn);
    expand::traced(&args, function)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
