//! Argument parsing for `#[scenario(...)]` and `#[traced(...)]`.

use proc_macro2::Span;
use syn::meta::ParseNestedMeta;
use syn::{Lit, LitStr, Token};

/// Parsed `#[scenario(...)]` arguments.
#[derive(Default)]
pub(crate) struct ScenarioArgs {
    pub feature_id: Option<LitStr>,
    pub scenario_id: Option<LitStr>,
    pub skip: bool,
    pub reason: Option<LitStr>,
    pub crate_path: Option<syn::Path>,
}

/// Parsed `#[traced(...)]` arguments.
#[derive(Default)]
pub(crate) struct TracedArgs {
    pub crate_path: Option<syn::Path>,
}

fn lit_str(meta: &ParseNestedMeta, key: &str) -> syn::Result<LitStr> {
    match meta.value()?.parse::<Lit>()? {
        Lit::Str(s) => Ok(s),
        other => Err(syn::Error::new(other.span(), format!("{key} must be a string"))),
    }
}

fn set_once<T>(
    slot: &mut Option<T>,
    value: T,
    meta: &ParseNestedMeta,
    key: &str,
) -> syn::Result<()> {
    if slot.is_some() {
        return Err(meta.error(format!("duplicate `{key}` argument")));
    }
    *slot = Some(value);
    Ok(())
}

fn crate_path(meta: &ParseNestedMeta, slot: &mut Option<syn::Path>) -> syn::Result<()> {
    let s = lit_str(meta, "crate")?;
    let path: syn::Path = syn::parse_str(&s.value()).map_err(|e| syn::Error::new(s.span(), e))?;
    set_once(slot, path, meta, "crate")
}

impl ScenarioArgs {
    /// Apply one `key = value` pair from the attribute.
    pub(crate) fn apply(&mut self, meta: &ParseNestedMeta) -> syn::Result<()> {
        match meta.path.get_ident().map(ToString::to_string).as_deref() {
            Some("feature_id") => {
                let value = lit_str(meta, "feature_id")?;
                set_once(&mut self.feature_id, value, meta, "feature_id")
            }
            Some("scenario_id") => {
                let value = lit_str(meta, "scenario_id")?;
                set_once(&mut self.scenario_id, value, meta, "scenario_id")
            }
            Some("skip") => {
                // Accept both `skip` and `skip = true`.
                self.skip = if meta.input.peek(Token![=]) {
                    meta.value()?.parse::<syn::LitBool>()?.value
                } else {
                    true
                };
                Ok(())
            }
            Some("reason") => {
                let value = lit_str(meta, "reason")?;
                set_once(&mut self.reason, value, meta, "reason")
            }
            Some("crate") => crate_path(meta, &mut self.crate_path),
            _ => Err(meta.error(concat!(
                "unknown argument; expected `feature_id`, `scenario_id`, ",
                "`skip`, `reason` or `crate`",
            ))),
        }
    }

    /// Both identifiers, or an error naming the first one missing.
    pub(crate) fn identifiers(&self, span: Span) -> syn::Result<(&LitStr, &LitStr)> {
        let feature = self
            .feature_id
            .as_ref()
            .ok_or_else(|| syn::Error::new(span, "missing `feature_id = \"...\"`"))?;
        let scenario = self
            .scenario_id
            .as_ref()
            .ok_or_else(|| syn::Error::new(span, "missing `scenario_id = \"...\"`"))?;
        Ok((feature, scenario))
    }
}

impl TracedArgs {
    /// Apply one `key = value` pair from the attribute.
    pub(crate) fn apply(&mut self, meta: &ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("crate") {
            crate_path(meta, &mut self.crate_path)
        } else {
            Err(meta.error("unknown argument; expected `crate`"))
        }
    }
}
