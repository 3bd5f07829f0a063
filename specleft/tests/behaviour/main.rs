//! Behavioural tests for `specleft` using `rstest-bdd`.
//!
//! Step implementations live under [`steps`], fixtures under [`fixtures`],
//! and [`scenarios`] binds the `.feature` files to them.

mod fixtures;
mod scenarios;
mod steps;
