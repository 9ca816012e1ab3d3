//! Typed identifiers for the core entities.
//!
//! Every id is a `nanoid`-backed newtype so the various ids can't be mixed
//! up at call sites (a `ChannelId` where a `PlaylistId` is expected is a
//! compile error, not a runtime bug).

use serde::{Deserialize, Serialize};

/// Generate a 12-character nanoid for entity ids.
pub fn generate_id() -> String {
    nanoid::nanoid!(12)
}

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(generate_id())
            }

            #[must_use]
            pub const fn from_string(id: String) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
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

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
                let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(Self(s))
            }
        }
    };
}

id_type!(ChannelId);
id_type!(PlaylistId);
id_type!(PlaylistItemId);
id_type!(MediaFileId);
id_type!(UdpStreamId);
id_type!(OverlayId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let a = ChannelId::new();
        let b = PlaylistId::new();
        assert_ne!(a.as_str(), "");
        assert_ne!(b.as_str(), "");
    }

    #[test]
    fn display_roundtrips_through_string() {
        let id = ChannelId::from_string("abc123".to_string());
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn new_ids_are_unique() {
        let a = PlaylistItemId::new();
        let b = PlaylistItemId::new();
        assert_ne!(a, b);
    }
}
