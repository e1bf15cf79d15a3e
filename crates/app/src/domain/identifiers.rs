//! External Identifiers
//!
//! Identifiers that originate outside this system: tenants are keyed by the
//! id of the server/account that onboarded, while groups, subjects, roles and
//! resources are numeric ids owned by the directory service.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Tenant identifier (the onboarding account's external id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Wrap a raw tenant id.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Convert to the signed representation used by storage.
            ///
            /// # Errors
            ///
            /// Returns an error when the id does not fit in an `i64`.
            pub fn to_i64(self) -> Result<i64, std::num::TryFromIntError> {
                i64::try_from(self.0)
            }

            /// Convert from the signed representation used by storage.
            ///
            /// # Errors
            ///
            /// Returns an error when the stored value is negative.
            pub fn from_i64(value: i64) -> Result<Self, std::num::TryFromIntError> {
                u64::try_from(value).map(Self)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// External group (guild) identifier in the directory service.
    GroupId
);

numeric_id!(
    /// External identity whose role is reconciled.
    SubjectId
);

numeric_id!(
    /// Directory role handle.
    RoleId
);

numeric_id!(
    /// Resource (place/app) a tenant credential is scoped to.
    ResourceId
);

/// Compact numeric rank as used by the directory role catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(pub u8);

impl Rank {
    /// Storage representation.
    #[must_use]
    pub fn to_i16(self) -> i16 {
        i16::from(self.0)
    }

    /// Convert from the storage representation.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored value is outside `0..=255`.
    pub fn from_i16(value: i16) -> Result<Self, std::num::TryFromIntError> {
        u8::try_from(value).map(Self)
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

/// Map an integer conversion failure into a sqlx column decode error.
pub(crate) fn decode_error(column: &str, source: std::num::TryFromIntError) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}
