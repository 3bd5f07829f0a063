//! Compile-time checks on identifiers and the annotated function.
//!
//! The grammars match the runtime ones in `specleft::FeatureId` and
//! `specleft::ScenarioId`; a declaration that passes here registers cleanly
//! at run time.

use syn::{Attribute, ItemFn, LitStr};

const BINDING_ATTRS: [&str; 2] = ["scenario", "traced"];

/// Upper-case letters, digits and `-`.
pub(crate) fn feature_id(lit: &LitStr) -> syn::Result<()> {
    identifier(
        lit,
        "feature_id",
        |c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-',
        "only upper-case letters, digits and '-' are allowed",
    )
}

/// Lower-case letters, digits and `-`.
pub(crate) fn scenario_id(lit: &LitStr) -> syn::Result<()> {
    identifier(
        lit,
        "scenario_id",
        |c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-',
        "only lower-case letters, digits and '-' are allowed",
    )
}

fn identifier(
    lit: &LitStr,
    kind: &str,
    allowed: fn(char) -> bool,
    reason: &str,
) -> syn::Result<()> {
    let value = lit.value();
    if value.is_empty() {
        return Err(syn::Error::new(
            lit.span(),
            format!("invalid {kind} '': must not be empty"),
        ));
    }
    if value.chars().all(allowed) {
        Ok(())
    } else {
        Err(syn::Error::new(
            lit.span(),
            format!("invalid {kind} '{value}': {reason}"),
        ))
    }
}

fn is_binding_attr(attr: &Attribute) -> bool {
    attr.path()
        .segments
        .last()
        .is_some_and(|segment| BINDING_ATTRS.iter().any(|name| segment.ident == name))
}

/// Reject functions the hooks cannot wrap, and a second binding attribute.
pub(crate) fn item(item: &ItemFn, attr_name: &str) -> syn::Result<()> {
    if let Some(asyncness) = &item.sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            format!("#[{attr_name}] does not support async functions"),
        ));
    }
    if let Some(extra) = item.attrs.iter().find(|attr| is_binding_attr(attr)) {
        return Err(syn::Error::new_spanned(
            extra,
            "a test can be bound to only one scenario; remove the extra attribute",
        ));
    }
    Ok(())
}
