//! Core identifier types used throughout the service
//!
//! Every identifier is an opaque UUID wrapped in its own newtype so a
//! `UserId` can never be passed where an `OrderId` is expected.
//! All of them serialize as plain UUID strings and map to `UUID` columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Generate a random (v4) identifier
            pub fn new_random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the inner UUID value
            pub fn inner(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// User ID - created on first enrollment, never deleted.
    UserId
);

uuid_id!(
    /// Order ID - chosen by the calling service when funds are reserved.
    OrderId
);

uuid_id!(
    /// Service ID - the billed service an order belongs to.
    ServiceId
);

uuid_id!(
    /// Report ID - opaque handle of a generated monthly report artifact.
    ReportId
);
