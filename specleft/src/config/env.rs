//! Environment provider that reads comma-separated lists.
//!
//! Wraps `figment::providers::Env` so that `SPECLEFT_INCLUDE_TAGS=smoke,fast`
//! deserialises into a `Vec<String>`. Keys registered as lists always become
//! arrays, even with a single element; other values containing a comma are
//! split unless they look like structured data.

use figment::providers::Env;
use figment::util::nest;
use figment::value::{Dict, Map, Value};
use figment::{Error, Metadata, Profile, Provider};

/// Environment provider with list support.
#[derive(Clone)]
pub struct ListEnv {
    inner: Env,
    list_keys: &'static [&'static str],
}

impl ListEnv {
    /// Provider for variables starting with `prefix`, nesting keys at `__`.
    #[must_use]
    pub fn prefixed(prefix: &str) -> Self {
        Self {
            inner: Env::prefixed(prefix).split("__"),
            list_keys: &[],
        }
    }

    /// Dotted keys whose values are always lists.
    #[must_use]
    pub const fn list_keys(mut self, keys: &'static [&'static str]) -> Self {
        self.list_keys = keys;
        self
    }

    fn looks_structured(value: &str) -> bool {
        matches!(value.chars().next(), Some('[' | '{' | '"' | '\''))
    }

    fn split(value: &str) -> Value {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::from(item.to_owned()))
            .collect::<Vec<_>>()
            .into()
    }

    fn parse_value(&self, key: &str, raw: &str) -> Value {
        let trimmed = raw.trim();
        if Self::looks_structured(trimmed) {
            return trimmed
                .parse()
                .unwrap_or_else(|_| Value::from(trimmed.to_owned()));
        }
        if self.list_keys.contains(&key) || trimmed.contains(',') {
            Self::split(trimmed)
        } else {
            trimmed
                .parse()
                .unwrap_or_else(|_| Value::from(trimmed.to_owned()))
        }
    }
}

/// Merge `incoming` into `target`, descending into nested tables.
fn merge_dict(target: &mut Dict, incoming: Dict) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Dict(_, existing)), Value::Dict(_, nested)) => {
                merge_dict(existing, nested);
            }
            (_, replacement) => {
                target.insert(key, replacement);
            }
        }
    }
}

impl Provider for ListEnv {
    fn metadata(&self) -> Metadata {
        self.inner.metadata()
    }

    fn profile(&self) -> Option<Profile> {
        Some(self.inner.profile.clone())
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();
        for (key, raw) in self.inner.iter() {
            let value = self.parse_value(key.as_str(), &raw);
            let Some(nested) = nest(key.as_str(), value).into_dict() else {
                return Err(Error::from(format!(
                    "environment key `{key}` produced a non-object value"
                )));
            };
            merge_dict(&mut dict, nested);
        }
        Ok(self.inner.profile.collect(dict))
    }
}
