//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the opaque identifiers the provider hands
//! out. Each newtype ensures validity at construction time; none of them
//! interpret their contents beyond the non-emptiness check, because the
//! provider treats them as opaque and so do we.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

macro_rules! opaque_string_newtype {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new value, rejecting empty strings.
            ///
            /// # Errors
            /// Returns `DomainError::InvalidId` if the value is empty.
            pub fn new(value: String) -> Result<Self, DomainError> {
                if value.trim().is_empty() {
                    return Err(DomainError::InvalidId(format!(
                        "{} cannot be empty",
                        $label
                    )));
                }
                Ok(Self(value))
            }

            /// Get the inner string reference
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s.to_string())
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.0
            }
        }
    };
}

opaque_string_newtype!(
    /// Provider drive identifier (opaque string)
    DriveId,
    "Drive id"
);

opaque_string_newtype!(
    /// Provider item identifier, globally unique within a drive
    ///
    /// Format example: `01BYE5RZ6QN3ZWBTUFOFD3GSPGOHDJD36K`
    ExternalId,
    "External item id"
);

opaque_string_newtype!(
    /// Provider subscription identifier
    SubscriptionId,
    "Subscription id"
);

/// Opaque delta continuation cursor
///
/// The cursor is the sole durable synchronization primitive: it means
/// "everything up to here has been observed". We store the provider's
/// delta link verbatim and never inspect it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeltaCursor(String);

impl DeltaCursor {
    /// Create a new cursor
    ///
    /// # Errors
    /// Returns `DomainError::InvalidCursor` if the value is empty. An
    /// absent cursor is represented as `Option::None`, never as an empty
    /// string.
    pub fn new(value: String) -> Result<Self, DomainError> {
        if value.trim().is_empty() {
            return Err(DomainError::InvalidCursor(
                "cursor cannot be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeltaCursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeltaCursor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for DeltaCursor {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DeltaCursor> for String {
    fn from(c: DeltaCursor) -> Self {
        c.0
    }
}
