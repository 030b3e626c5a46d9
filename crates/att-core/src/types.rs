//! Identifier and enum types shared across the attendance core.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from constructing core types out of raw values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Unknown registration method string.
    #[error("invalid registration method: {value}")]
    InvalidRegistrationMethod { value: String },
}

/// Generates an integer row-id newtype with common trait implementations.
macro_rules! define_row_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database row id.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row id.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_row_id!(
    /// Identifier of a scheduled session.
    EventId
);

define_row_id!(
    /// Identifier of a registered subject (internal attendee with statistics).
    SubjectId
);

define_row_id!(
    /// Identifier of an externally approved guest.
    GuestId
);

define_row_id!(
    /// Identifier of an operator (the person submitting records).
    OperatorId
);

define_row_id!(
    /// Identifier of a persisted attendance record.
    AttendanceId
);

/// A validated account number.
///
/// Account numbers identify subjects, guests, and operators alike. They must
/// be non-empty; the exact format is owned by the registrar's office.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Creates a new account number after validation.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(TypeError::Empty {
                field: "account number",
            });
        }
        Ok(Self(value))
    }

    /// Returns the account number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How an attendance record was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMethod {
    /// Typed in by an operator at the registration desk.
    Manual,
    /// Captured by scanning the attendee's credential.
    Scanned,
    /// Brought in through a bulk historical import.
    Imported,
}

impl RegistrationMethod {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scanned => "scanned",
            Self::Imported => "imported",
        }
    }
}

impl Default for RegistrationMethod {
    fn default() -> Self {
        Self::Manual
    }
}

impl fmt::Display for RegistrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RegistrationMethod {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "scanned" => Ok(Self::Scanned),
            "imported" => Ok(Self::Imported),
            _ => Err(TypeError::InvalidRegistrationMethod {
                value: s.to_string(),
            }),
        }
    }
}

/// Reference to the attendee a record belongs to.
///
/// Exactly one variant is set by construction; the two-nullable-columns shape
/// of the storage layer goes through [`AttendeeRef::from_parts`], which is
/// where the exclusivity rule is still checked at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeRef {
    /// A registered subject, tracked for statistics.
    Subject(SubjectId),
    /// An externally approved guest. No statistics are kept.
    Guest(GuestId),
}

impl AttendeeRef {
    /// Builds a reference from the nullable column pair.
    ///
    /// Fails unless exactly one of the two ids is present.
    pub fn from_parts(
        subject: Option<SubjectId>,
        guest: Option<GuestId>,
    ) -> Result<Self, crate::validator::ValidationError> {
        match (subject, guest) {
            (Some(id), None) => Ok(Self::Subject(id)),
            (None, Some(id)) => Ok(Self::Guest(id)),
            _ => Err(crate::validator::ValidationError::InvalidAttendeeReference),
        }
    }

    /// Returns the subject id when this reference is the internal variant.
    #[must_use]
    pub const fn subject_id(self) -> Option<SubjectId> {
        match self {
            Self::Subject(id) => Some(id),
            Self::Guest(_) => None,
        }
    }

    /// True for the internal subject variant.
    #[must_use]
    pub const fn is_subject(self) -> bool {
        matches!(self, Self::Subject(_))
    }
}

impl fmt::Display for AttendeeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject(id) => write!(f, "subject {id}"),
            Self::Guest(id) => write!(f, "guest {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_number_rejects_empty() {
        assert!(AccountNumber::new("").is_err());
        assert!(AccountNumber::new("   ").is_err());
        assert!(AccountNumber::new("20251234").is_ok());
    }

    #[test]
    fn account_number_serde_rejects_empty() {
        let result: Result<AccountNumber, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
        let parsed: AccountNumber = serde_json::from_str("\"20251234\"").unwrap();
        assert_eq!(parsed.as_str(), "20251234");
    }

    #[test]
    fn registration_method_from_str() {
        assert_eq!(
            "manual".parse::<RegistrationMethod>().unwrap(),
            RegistrationMethod::Manual
        );
        assert_eq!(
            "scanned".parse::<RegistrationMethod>().unwrap(),
            RegistrationMethod::Scanned
        );
        assert_eq!(
            "imported".parse::<RegistrationMethod>().unwrap(),
            RegistrationMethod::Imported
        );
        assert!("barcode".parse::<RegistrationMethod>().is_err());
    }

    #[test]
    fn registration_method_round_trips_as_str() {
        for method in [
            RegistrationMethod::Manual,
            RegistrationMethod::Scanned,
            RegistrationMethod::Imported,
        ] {
            assert_eq!(method.as_str().parse::<RegistrationMethod>(), Ok(method));
        }
    }

    #[test]
    fn attendee_ref_from_parts_requires_exactly_one() {
        assert!(AttendeeRef::from_parts(Some(SubjectId::new(1)), None).is_ok());
        assert!(AttendeeRef::from_parts(None, Some(GuestId::new(2))).is_ok());
        assert!(AttendeeRef::from_parts(None, None).is_err());
        assert!(AttendeeRef::from_parts(Some(SubjectId::new(1)), Some(GuestId::new(2))).is_err());
    }

    #[test]
    fn event_id_display_and_convert() {
        let id = EventId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i64::from(id), 42);
        assert_eq!(EventId::from(42), id);
    }
}
