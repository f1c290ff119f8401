//! Typed IDs for type-safe entity references.
//!
//! Artifacts are keyed by UUID v7 so storage keys sort by creation time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(
    ArtifactId,
    "Unique identifier for a stored artifact (recording or debug screenshot)."
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_artifact_id_is_v7() {
        assert_eq!(ArtifactId::new().into_inner().get_version_num(), 7);
    }

    #[test]
    fn test_artifact_id_round_trips_through_str() {
        let uuid = Uuid::new_v4();
        let id = ArtifactId::from_uuid(uuid);
        assert_eq!(ArtifactId::from_str(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_artifact_id_from_str_error() {
        assert!(ArtifactId::from_str("not-a-uuid").is_err());
    }
}
