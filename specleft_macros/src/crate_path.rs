//! Crate path resolution for renamed `specleft` dependencies.
//!
//! Turns the optional `crate = "..."` argument into the tokens that prefix
//! every runtime path in generated code.

use proc_macro2::TokenStream;
use quote::quote;

/// Resolve the runtime crate path, defaulting to `::specleft`.
///
/// # Examples
///
/// ```rust,ignore
/// assert_eq!(resolve(None).to_string(), ":: specleft");
///
/// let path: syn::Path = syn::parse_str("tracing_alias").unwrap();
/// assert_eq!(resolve(Some(&path)).to_string(), "tracing_alias");
/// ```
pub(crate) fn resolve(crate_path: Option<&syn::Path>) -> TokenStream {
    crate_path.map_or_else(|| quote! { ::specleft }, |path| quote! { #path })
}
