//! `figment::Jail` plumbing for configuration tests.

use anyhow::{Result, anyhow};

/// Run `f` inside a [`figment::Jail`] and return its value.
///
/// The jail changes into a fresh directory and restores the environment when
/// it ends, even if `f` fails.
///
/// # Errors
///
/// Returns an error if the jail cannot be set up or `f` fails.
pub fn with_jail<F, T>(f: F) -> Result<T>
where
    F: FnOnce(&mut figment::Jail) -> figment::error::Result<T>,
{
    let mut output = None;
    figment::Jail::try_with(|jail| {
        output = Some(f(jail)?);
        Ok(())
    })
    .map_err(|err| anyhow!(err.to_string()))?;
    output.ok_or_else(|| anyhow!("jail closure did not return a value"))
}

/// Convert any displayable error into a [`figment::Error`] so `?` works
/// inside a jail closure.
#[expect(
    clippy::needless_pass_by_value,
    reason = "used with map_err, which hands over owned errors"
)]
pub fn jail_error<E: ToString>(err: E) -> figment::Error {
    figment::Error::from(err.to_string())
}
