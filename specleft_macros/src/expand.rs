//! Code generation for the binding attributes.
//!
//! Both attributes rewrite the function body to run inside a `TestGuard`.
//! The guard records the result whether the body returns, returns `Err` or
//! panics, and the body's value is returned unchanged.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{ItemFn, ReturnType};

use crate::args::{ScenarioArgs, TracedArgs};
use crate::{crate_path, validate};

/// Expand `#[scenario(...)]`.
pub(crate) fn scenario(args: &ScenarioArgs, item: ItemFn) -> syn::Result<TokenStream> {
    validate::item(&item, "scenario")?;
    let (feature, scenario) = args.identifiers(item.sig.ident.span())?;
    validate::feature_id(feature)?;
    validate::scenario_id(scenario)?;

    let krate = crate_path::resolve(args.crate_path.as_ref());
    let skip = args.skip;
    let reason = args.reason.as_ref().map_or_else(
        || quote! { ::core::option::Option::None },
        |reason| quote! { ::core::option::Option::Some(#reason) },
    );
    let enter = quote! {
        #krate::Session::global().enter_declared(
            __specleft_test_id,
            &#krate::ScenarioDecl {
                feature_id: #feature,
                scenario_id: #scenario,
                skip: #skip,
                reason: #reason,
            },
        )
    };
    Ok(wrap(&krate, item, &enter))
}

/// Expand `#[traced]`.
pub(crate) fn traced(args: &TracedArgs, item: ItemFn) -> syn::Result<TokenStream> {
    validate::item(&item, "traced")?;
    let krate = crate_path::resolve(args.crate_path.as_ref());
    let enter = quote! { #krate::Session::global().enter(__specleft_test_id) };
    Ok(wrap(&krate, item, &enter))
}

fn skip_return(output: &ReturnType) -> TokenStream {
    match output {
        ReturnType::Default => quote! { return; },
        ReturnType::Type(..) => quote! {
            return ::core::result::Result::Ok(::core::default::Default::default());
        },
    }
}

fn wrap(krate: &TokenStream, item: ItemFn, enter: &TokenStream) -> TokenStream {
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = item;
    let ident = &sig.ident;
    let output = match &sig.output {
        ReturnType::Default => TokenStream::new(),
        ReturnType::Type(_, ty) => quote! { -> #ty },
    };
    let skipped = skip_return(&sig.output);

    quote! {
        #(#attrs)*
        #vis #sig {
            let __specleft_test_id = #krate::TestId::new(::core::concat!(
                ::core::module_path!(),
                "::",
                ::core::stringify!(#ident),
            ));
            let __specleft_guard = #enter;
            __specleft_guard.check_binding();
            if __specleft_guard.is_skipped() {
                __specleft_guard.finish(::core::option::Option::None);
                #skipped
            }
            __specleft_guard.run(move || #output #block)
        }
    }
}
