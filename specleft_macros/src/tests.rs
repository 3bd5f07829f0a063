//! Unit tests for argument parsing, validation and expansion.

#![allow(
    unfulfilled_lint_expectations,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
#![expect(clippy::expect_used, reason = "tests panic to surface expansion mistakes")]

use anyhow::{Result, ensure};
use proc_macro2::TokenStream;
use quote::quote;
use rstest::rstest;
use syn::parse::Parser;

use crate::args::{ScenarioArgs, TracedArgs};
use crate::expand;

fn scenario_args(tokens: TokenStream) -> syn::Result<ScenarioArgs> {
    let mut args = ScenarioArgs::default();
    syn::meta::parser(|meta| args.apply(&meta)).parse2(tokens)?;
    Ok(args)
}

fn expand_scenario(attr: TokenStream, item: TokenStream) -> syn::Result<String> {
    let args = scenario_args(attr)?;
    let function = syn::parse2(item)?;
    expand::scenario(&args, function).map(|tokens| tokens.to_string())
}

fn plain_test() -> TokenStream {
    quote! {
        #[test]
        fn adds() {
            assert_eq!(2 + 3, 5);
        }
    }
}

#[rstest]
fn scenario_expansion_declares_the_binding() -> Result<()> {
    let out = expand_scenario(
        quote!(feature_id = "CALC-1", scenario_id = "add-positive"),
        plain_test(),
    )?;
    ensure!(out.contains("enter_declared"), "missing declaration: {out}");
    ensure!(out.contains("\"CALC-1\""), "feature id not forwarded: {out}");
    ensure!(out.contains("check_binding"), "binding not checked: {out}");
    ensure!(out.contains("# [test]"), "test attribute dropped: {out}");
    Ok(())
}

#[rstest]
fn skip_and_reason_are_forwarded() -> Result<()> {
    let out = expand_scenario(
        quote!(feature_id = "CALC-1", scenario_id = "div-zero", skip, reason = "pending"),
        plain_test(),
    )?;
    ensure!(out.contains("skip : true"), "skip flag missing: {out}");
    ensure!(out.contains("Some (\"pending\")"), "reason missing: {out}");
    Ok(())
}

#[rstest]
fn result_tests_return_ok_when_skipped() -> Result<()> {
    let out = expand_scenario(
        quote!(feature_id = "CALC-1", scenario_id = "add-positive"),
        quote! {
            #[test]
            fn adds() -> Result<(), String> { Ok(()) }
        },
    )?;
    ensure!(out.contains("Result :: Ok"), "skip path must return Ok: {out}");
    Ok(())
}

#[rstest]
fn crate_override_retargets_paths() -> Result<()> {
    let out = expand_scenario(
        quote!(feature_id = "CALC-1", scenario_id = "add-positive", crate = "spec_trace"),
        plain_test(),
    )?;
    ensure!(out.contains("spec_trace :: Session"), "crate path ignored: {out}");
    ensure!(!out.contains(":: specleft ::"), "default path leaked: {out}");
    Ok(())
}

#[rstest]
#[case::lower_feature(
    quote!(feature_id = "calc-1", scenario_id = "add"),
    "invalid feature_id 'calc-1'"
)]
#[case::upper_scenario(
    quote!(feature_id = "CALC-1", scenario_id = "Add"),
    "invalid scenario_id 'Add'"
)]
#[case::empty_scenario(quote!(feature_id = "CALC-1", scenario_id = ""), "must not be empty")]
#[case::missing_feature(quote!(scenario_id = "add"), "missing `feature_id")]
#[case::missing_scenario(quote!(feature_id = "CALC-1"), "missing `scenario_id")]
fn invalid_arguments_are_rejected(#[case] attr: TokenStream, #[case] expected: &str) {
    let err = expand_scenario(attr, plain_test()).expect_err("arguments must be rejected");
    assert!(
        err.to_string().contains(expected),
        "unexpected error: {err}"
    );
}

#[rstest]
#[case::duplicate_key(quote!(feature_id = "A", feature_id = "B"), "duplicate `feature_id`")]
#[case::unknown_key(quote!(story = "x"), "unknown argument")]
#[case::non_string(quote!(feature_id = 1), "feature_id must be a string")]
fn malformed_arguments_fail_to_parse(#[case] attr: TokenStream, #[case] expected: &str) {
    let Err(err) = scenario_args(attr) else {
        panic!("arguments should not parse");
    };
    assert!(err.to_string().contains(expected), "unexpected error: {err}");
}

#[rstest]
fn second_binding_attribute_is_rejected() {
    let err = expand_scenario(
        quote!(feature_id = "CALC-1", scenario_id = "add"),
        quote! {
            #[specleft::scenario(feature_id = "CALC-1", scenario_id = "sub")]
            #[test]
            fn adds() {}
        },
    )
    .expect_err("double binding must fail");
    assert!(err.to_string().contains("only one scenario"));
}

#[rstest]
fn async_functions_are_rejected() {
    let err = expand_scenario(
        quote!(feature_id = "CALC-1", scenario_id = "add"),
        quote! { async fn adds() {} },
    )
    .expect_err("async must fail");
    assert!(err.to_string().contains("async"));
}

#[rstest]
fn traced_uses_the_unbound_entry_point() -> Result<()> {
    let mut args = TracedArgs::default();
    syn::meta::parser(|meta| args.apply(&meta)).parse2(TokenStream::new())?;
    let out = expand::traced(&args, syn::parse2(plain_test())?)?.to_string();
    ensure!(out.contains(". enter (__specleft_test_id)"), "unexpected expansion: {out}");
    ensure!(!out.contains("ScenarioDecl"), "traced must not declare a binding: {out}");
    Ok(())
}
