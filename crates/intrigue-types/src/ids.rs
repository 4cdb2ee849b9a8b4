//! Type-safe identifier wrappers.
//!
//! Every entity owned by the world arena (leaders, locations, armies, roads)
//! has a strongly-typed [`Uuid`] wrapper so identifiers cannot be mixed at
//! compile time. New entities created by the engine itself (spawned armies)
//! derive their id from the injected turn RNG through
//! [`ArmyId::from_random_bytes`], which keeps seeded runs reproducible.
//!
//! Factions are a small closed set configured up front, so [`FactionId`] is a
//! plain `u8` with a reserved [`FactionId::NEUTRAL`] value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Create an identifier from caller-supplied random bytes.
            ///
            /// The bytes are stamped with the UUID v4 version and variant
            /// bits, so the same bytes always yield the same identifier.
            pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
                Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a leader (covert agent, governor, commander).
    LeaderId
}

define_id! {
    /// Unique identifier for a territory.
    LocationId
}

define_id! {
    /// Unique identifier for an army, including spawned insurgent forces.
    ArmyId
}

define_id! {
    /// Unique identifier for a road connecting two territories.
    RoadId
}

/// Identifier of a faction.
///
/// `0` is reserved for [`FactionId::NEUTRAL`], the owner of unaligned
/// territories and of neutral uprisings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactionId(pub u8);

impl FactionId {
    /// The unaligned faction.
    pub const NEUTRAL: Self = Self(0);

    /// Whether this is the neutral faction.
    pub const fn is_neutral(self) -> bool {
        self.0 == 0
    }
}

impl core::fmt::Display for FactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_neutral() {
            write!(f, "neutral")
        } else {
            write!(f, "faction-{}", self.0)
        }
    }
}
