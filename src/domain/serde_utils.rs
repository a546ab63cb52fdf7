//! Serde helpers for Discord wire values.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;

/// Snowflake IDs travel as decimal strings but are occasionally sent as numbers.
pub mod snowflake {
    use super::{Deserializer, Serializer, Visitor, de, fmt};

    /// Serializes a snowflake as a decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if the serializer fails.
    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    /// Deserializes a snowflake from a string or an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is neither, or the string is not a number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SnowflakeVisitor;

        impl Visitor<'_> for SnowflakeVisitor {
            type Value = u64;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a snowflake as string or integer")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value)
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(value).map_err(|_| E::custom("negative snowflake"))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value.parse::<u64>().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

/// Optional snowflake fields; `null` and a missing field both mean `None`.
pub mod snowflake_option {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    struct Wrapper(#[serde(with = "super::snowflake")] u64);

    /// Serializes an optional snowflake as a decimal string or `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the serializer fails.
    pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional snowflake.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is present but not a snowflake.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

/// Null-tolerant integer flag fields (`flags: null` and a missing field both mean zero).
pub mod nullable_bits {
    use serde::{Deserialize, Deserializer};

    /// Deserializes an optional integer, defaulting to zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is present but not an unsigned integer.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::snowflake")]
        id: u64,
        #[serde(default, deserialize_with = "super::nullable_bits::deserialize")]
        flags: u64,
        #[serde(default, with = "super::snowflake_option")]
        target: Option<u64>,
    }

    #[test]
    fn test_snowflake_from_string() {
        let value: Wrapper = serde_json::from_str(r#"{"id":"80351110224678912"}"#).unwrap();
        assert_eq!(value.id, 80_351_110_224_678_912);
        assert_eq!(value.flags, 0);
        assert_eq!(value.target, None);
    }

    #[test]
    fn test_optional_snowflake() {
        let value: Wrapper = serde_json::from_str(r#"{"id":1,"target":"7"}"#).unwrap();
        assert_eq!(value.target, Some(7));
        let value: Wrapper = serde_json::from_str(r#"{"id":1,"target":null}"#).unwrap();
        assert_eq!(value.target, None);
    }

    #[test]
    fn test_snowflake_from_number() {
        let value: Wrapper = serde_json::from_str(r#"{"id":42,"flags":null}"#).unwrap();
        assert_eq!(value.id, 42);
        assert_eq!(value.flags, 0);
    }

    #[test]
    fn test_snowflake_rejects_garbage() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"id":"abc"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"id":-1}"#).is_err());
    }
}
