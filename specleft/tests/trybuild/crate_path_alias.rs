//! Generated code follows `crate = "..."` to a re-exported path.

mod support {
    pub use specleft as tracing_alias;
}

#[specleft::scenario(
    feature_id = "CALC-1",
    scenario_id = "add-positive",
    crate = "support::tracing_alias"
)]
fn adds() {
    assert_eq!(2 + 3, 5);
}

#[specleft::traced(crate = "support::tracing_alias")]
fn helper() {}

fn main() {
    let _unused = (adds as fn(), helper as fn());
}
