//! Domain model of the account ledger: value objects, entities, events and the
//! ports the application layer depends on.

macro_rules! uuid_id {
    ($t:ident, $name:literal) => {
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t(uuid::Uuid);

        impl $t {
            /// Creates a fresh time-ordered identifier.
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::str::FromStr for $t {
            type Err = crate::error::LedgerError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self).map_err(|e| {
                    crate::error::LedgerError::InvalidArgument(format!("{}: {}", $name, e))
                })
            }
        }
    };
}

pub mod account;
pub mod events;
pub mod hold;
pub mod ports;
