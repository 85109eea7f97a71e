use crate::error::{self, Result};
use crate::raw::RawValue;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::OptionExt;
use std::fmt::{self, Formatter};

/// A scalar that is exactly one of a whole number or a string, mirroring the int-or-string
/// union common in orchestration APIs (a port number vs. a percentage string). The variant
/// follows the kind of the token the user supplied, never its content: `8` decodes to `Int(8)`
/// and `"8"` decodes to `String("8")`, and each is re-emitted in its original representation.
///
/// `Int(8)` and `String("8")` are never equal. Collapsing them would lose the user's
/// representational intent and show up as drift on the next read.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum IntOrString {
    /// The field is absent or explicitly null.
    Null,
    /// The engine has not computed the value yet in the current planning cycle.
    Unknown,
    Int(i64),
    String(String),
}

impl Default for IntOrString {
    fn default() -> Self {
        Self::Null
    }
}

impl IntOrString {
    /// Decodes a raw configuration token. The token must be a number, a string, null, or the
    /// not-yet-known placeholder; any other shape is an `InvalidScalarShape` error. A number
    /// token must be a whole number, fractional values have no int-or-string representation.
    pub fn decode(raw: &RawValue) -> Result<Self> {
        match raw {
            RawValue::Null => Ok(Self::Null),
            RawValue::Unknown => Ok(Self::Unknown),
            RawValue::Number(number) => number
                .as_i64()
                .map(Self::Int)
                .context(error::InvalidScalarShapeSnafu { kind: raw.kind() }),
            RawValue::String(value) => Ok(Self::String(value.clone())),
            other => error::InvalidScalarShapeSnafu { kind: other.kind() }.fail(),
        }
    }

    /// Encodes the scalar back into the raw representation it was decoded from.
    pub fn encode(&self) -> RawValue {
        match self {
            Self::Null => RawValue::Null,
            Self::Unknown => RawValue::Unknown,
            Self::Int(value) => RawValue::Number(serde_json::Number::from(*value)),
            Self::String(value) => RawValue::String(value.clone()),
        }
    }

    /// True for `Null` and `Unknown`, the states that emit no scalar of their own. Usable with
    /// `#[serde(skip_serializing_if = "IntOrString::is_absent")]` on generated fields.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Null | Self::Unknown)
    }
}

impl Serialize for IntOrString {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Unknown => Err(serde::ser::Error::custom(
                "an unresolved int-or-string value cannot appear in a manifest",
            )),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::String(value) => serializer.serialize_str(value),
        }
    }
}

impl<'de> Deserialize<'de> for IntOrString {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IntOrStringVisitor;

        impl<'de> Visitor<'de> for IntOrStringVisitor {
            type Value = IntOrString;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("an integer, a string, or null")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<IntOrString, E> {
                Ok(IntOrString::Int(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<IntOrString, E> {
                i64::try_from(value).map(IntOrString::Int).map_err(|_| {
                    de::Error::invalid_value(de::Unexpected::Unsigned(value), &self)
                })
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<IntOrString, E> {
                Ok(IntOrString::String(value.to_string()))
            }

            fn visit_string<E: de::Error>(
                self,
                value: String,
            ) -> std::result::Result<IntOrString, E> {
                Ok(IntOrString::String(value))
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<IntOrString, E> {
                Ok(IntOrString::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<IntOrString, E> {
                Ok(IntOrString::Null)
            }

            fn visit_some<D2>(self, deserializer: D2) -> std::result::Result<IntOrString, D2::Error>
            where
                D2: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }
        }

        deserializer.deserialize_any(IntOrStringVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::raw::RawKind;

    #[test]
    fn decode_follows_token_kind() {
        assert_eq!(
            IntOrString::decode(&RawValue::from(8)).unwrap(),
            IntOrString::Int(8)
        );
        assert_eq!(
            IntOrString::decode(&RawValue::from("8")).unwrap(),
            IntOrString::String("8".to_string())
        );
        assert_eq!(
            IntOrString::decode(&RawValue::Null).unwrap(),
            IntOrString::Null
        );
        assert_eq!(
            IntOrString::decode(&RawValue::Unknown).unwrap(),
            IntOrString::Unknown
        );
    }

    #[test]
    fn int_and_string_of_same_digits_are_unequal() {
        let number = IntOrString::decode(&RawValue::from(5)).unwrap();
        let string = IntOrString::decode(&RawValue::from("5")).unwrap();
        assert_ne!(number, string);
        assert_eq!(number.encode(), RawValue::from(5));
        assert_eq!(string.encode(), RawValue::from("5"));
    }

    #[test]
    fn round_trip_is_identity() {
        for raw in [
            RawValue::Null,
            RawValue::Unknown,
            RawValue::from(50),
            RawValue::from("50%"),
        ] {
            let decoded = IntOrString::decode(&raw).unwrap();
            assert_eq!(decoded.encode(), raw);
        }
    }

    #[test]
    fn rejects_non_scalar_tokens() {
        for raw in [
            RawValue::from(true),
            RawValue::Sequence(vec![RawValue::from(1)]),
            RawValue::Mapping(vec![("port".to_string(), RawValue::from(1))]),
        ] {
            let kind = raw.kind();
            let error = IntOrString::decode(&raw).unwrap_err();
            assert!(matches!(
                error,
                crate::Error::InvalidScalarShape { kind: found } if found == kind
            ));
        }
    }

    #[test]
    fn rejects_fractional_numbers() {
        let number = serde_json::Number::from_f64(2.5).unwrap();
        let error = IntOrString::decode(&RawValue::Number(number)).unwrap_err();
        assert!(matches!(
            error,
            crate::Error::InvalidScalarShape {
                kind: RawKind::Number
            }
        ));
    }

    #[test]
    fn serde_preserves_representation() {
        let from_int: IntOrString = serde_yaml::from_str("8080").unwrap();
        let from_string: IntOrString = serde_yaml::from_str("\"8080\"").unwrap();
        assert_eq!(from_int, IntOrString::Int(8080));
        assert_eq!(from_string, IntOrString::String("8080".to_string()));

        let yaml = serde_yaml::to_string(&from_string).unwrap();
        let reparsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(reparsed, serde_yaml::Value::String("8080".to_string()));
    }

    #[test]
    fn unknown_does_not_serialize() {
        assert!(serde_yaml::to_string(&IntOrString::Unknown).is_err());
    }
}
