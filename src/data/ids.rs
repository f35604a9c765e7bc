//! Unsigned identifier newtypes for non-negative database fields.
//!
//! PostgreSQL has no unsigned integer types, so we store values as `INTEGER`/`BIGINT`
//! and convert at the Rust boundary. The `unsigned_newtype!` macro generates all
//! necessary trait impls (SQLx, serde, conversions) from a single invocation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Generate a newtype wrapper around an unsigned integer that maps to a signed
/// PostgreSQL column type. Produces:
///
/// - SQLx `Type`/`Encode`/`Decode` (maps `u32`<->`i32` or `u64`<->`i64`)
/// - `serde` transparent serialization
/// - `Display`, `FromStr`, `From<unsigned>`, `Into<unsigned>`
/// - `TryFrom<i32>`, `TryFrom<i64>`, `TryFrom<usize>` for fallible signed conversions
macro_rules! unsigned_newtype {
    ($name:ident, $unsigned:ty, $signed:ty) => {
        #[derive(
            Default,
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($unsigned);

        impl $name {
            pub const fn new(val: $unsigned) -> Self {
                Self(val)
            }

            pub const fn get(self) -> $unsigned {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<$unsigned>().map(Self)
            }
        }

        impl From<$unsigned> for $name {
            fn from(val: $unsigned) -> Self {
                Self(val)
            }
        }

        impl From<$name> for $unsigned {
            fn from(val: $name) -> Self {
                val.0
            }
        }

        impl TryFrom<i32> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(val: i32) -> Result<Self, Self::Error> {
                <$unsigned>::try_from(val).map(Self)
            }
        }

        impl TryFrom<i64> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(val: i64) -> Result<Self, Self::Error> {
                <$unsigned>::try_from(val).map(Self)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(val: usize) -> Result<Self, Self::Error> {
                <$unsigned>::try_from(val).map(Self)
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <$signed as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                let v = <$signed>::try_from(self.0).map_err(|_| {
                    format!(
                        "{} value {} overflows {}",
                        stringify!($name),
                        self.0,
                        stringify!($signed)
                    )
                })?;
                <$signed as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&v, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <$signed as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                <$unsigned>::try_from(raw).map(Self).map_err(|_| {
                    format!(
                        "negative {} {} cannot decode as {}",
                        stringify!($signed),
                        raw,
                        stringify!($name)
                    )
                    .into()
                })
            }
        }
    };
}

unsigned_newtype!(UserId, u64, i64);
unsigned_newtype!(RoomId, u64, i64);
unsigned_newtype!(InvitationId, u64, i64);
unsigned_newtype!(ApplicationId, u64, i64);
unsigned_newtype!(MessageId, u64, i64);
unsigned_newtype!(StickerSetId, u64, i64);
unsigned_newtype!(StickerId, u64, i64);
unsigned_newtype!(Price, u32, i32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_construction() {
        let id = UserId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(u64::from(id), 42);

        let id2: UserId = 10u64.into();
        assert_eq!(id2.get(), 10);
    }

    #[test]
    fn user_id_try_from_signed() {
        assert_eq!(UserId::try_from(0i64).unwrap().get(), 0);
        assert_eq!(UserId::try_from(100i64).unwrap().get(), 100);
        assert!(UserId::try_from(-1i64).is_err());
        assert!(UserId::try_from(-1i32).is_err());
    }

    #[test]
    fn user_id_display_and_parse() {
        assert_eq!(format!("{}", UserId::new(42)), "42");
        assert_eq!("42".parse::<StickerSetId>().unwrap().get(), 42);
        assert!("-1".parse::<StickerSetId>().is_err());
        assert!("abc".parse::<StickerId>().is_err());
    }

    #[test]
    fn user_id_serde_transparent() {
        let id = UserId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");

        let deserialized: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(deserialized.get(), 42);
    }

    #[test]
    fn price_try_from_overflow() {
        assert!(Price::try_from(i64::from(u32::MAX) + 1).is_err());
        assert_eq!(Price::try_from(100i64).unwrap().get(), 100);
    }

    #[test]
    fn user_id_encode_overflow() {
        // u64::MAX exceeds i64::MAX
        let id = UserId::new(u64::MAX);
        let mut buf = sqlx::postgres::PgArgumentBuffer::default();
        let result = sqlx::Encode::<sqlx::Postgres>::encode_by_ref(&id, &mut buf);
        assert!(result.is_err());
    }

    #[test]
    fn id_ordering() {
        assert!(MessageId::new(1) < MessageId::new(2));
        assert_eq!(RoomId::new(7), RoomId::new(7));
    }
}
