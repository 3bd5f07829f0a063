//! Test helpers shared across the specleft workspace.
//!
//! - [`env`]: RAII guards for environment variables, including scrubbing
//!   every `SPECLEFT_*` variable a developer may have exported.
//! - [`cwd`]: RAII guard for the process working directory.
//! - [`figment`]: `figment::Jail` plumbing that returns `anyhow` results.
//! - [`results`]: scratch directories for result stores.

pub mod cwd;
pub mod env;
pub mod figment;
pub mod results;
