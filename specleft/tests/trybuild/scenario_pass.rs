//! `#[scenario]` and `#[traced]` on the shapes tests usually take.

use specleft::{scenario, step, traced};

#[scenario(feature_id = "AUTH-2", scenario_id = "login-ok")]
#[test]
fn logs_in() {
    let _s = step("submit credentials");
}

#[scenario(feature_id = "AUTH-2", scenario_id = "login-locked", skip = true)]
fn locked_out() -> Result<(), String> {
    Err("account locked".to_owned())
}

#[scenario(feature_id = "AUTH-2", scenario_id = "token-refresh", reason = "unused without skip")]
fn refreshes(count: u32) -> Result<u32, std::num::ParseIntError> {
    let parsed: u32 = "41".parse()?;
    Ok(parsed + count)
}

#[traced]
fn helper() {}

fn main() {
    let _unused = (locked_out as fn() -> Result<(), String>, helper as fn());
    let _also_unused = refreshes as fn(u32) -> Result<u32, std::num::ParseIntError>;
}
