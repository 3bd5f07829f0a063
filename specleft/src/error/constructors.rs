//! Constructors and conversions for `SpecleftError`.

use std::fmt::Display;

use figment::Error as FigmentError;

use super::SpecleftError;
use crate::ids::IdentifierKind;

impl SpecleftError {
    /// Construct an [`SpecleftError::InvalidIdentifier`].
    ///
    /// # Examples
    ///
    /// ```
    /// use specleft::{IdentifierKind, SpecleftError};
    /// let err = SpecleftError::invalid_identifier(IdentifierKind::Feature, "calc", "lower case");
    /// assert_eq!(err.to_string(), "invalid feature_id 'calc': lower case");
    /// ```
    #[must_use]
    pub fn invalid_identifier(
        kind: IdentifierKind,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidIdentifier {
            kind,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Construct a [`SpecleftError::CorruptRecord`] for `path`.
    #[must_use]
    pub fn corrupt(path: impl Display, reason: impl Display) -> Self {
        Self::CorruptRecord {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Construct a [`SpecleftError::StoreWrite`] for `path`.
    #[must_use]
    pub fn store_write(path: impl Display, source: std::io::Error) -> Self {
        Self::StoreWrite {
            path: path.to_string(),
            source,
        }
    }

    /// Construct a [`SpecleftError::StoreRead`] for `path`.
    #[must_use]
    pub fn store_read(path: impl Display, source: std::io::Error) -> Self {
        Self::StoreRead {
            path: path.to_string(),
            source,
        }
    }

    /// Construct a [`SpecleftError::NotFound`] for `run_id`.
    #[must_use]
    pub fn not_found(run_id: impl Display) -> Self {
        Self::NotFound {
            run_id: run_id.to_string(),
        }
    }

    /// True for errors caused by a misused step context rather than I/O.
    #[must_use]
    pub const fn is_context_misuse(&self) -> bool {
        matches!(self, Self::AlreadyBound { .. } | Self::NotBound)
    }
}

impl From<FigmentError> for SpecleftError {
    fn from(e: FigmentError) -> Self {
        Self::Config(Box::new(e))
    }
}
