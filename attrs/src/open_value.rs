use crate::error::{self, Result};
use crate::raw::RawValue;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Formatter};

/// An arbitrarily shaped configuration value: scalars, sequences, and string-keyed mappings
/// nested to any depth. Generated schemas use this for free-form blocks that are not worth
/// modeling field-by-field.
///
/// Mapping entries keep the order the configuration source supplied them in, and that order is
/// carried through decode and emission. Order is presentational only: two mappings with the
/// same entries in different orders are equal, so an external system reordering keys does not
/// register as a change. Sequences are order-sensitive, reordering a list is a real change.
#[derive(Debug, Clone)]
pub enum OpenValue {
    Null,
    /// The engine has not computed this leaf yet in the current planning cycle. Unknown-ness
    /// is local to the leaf, an enclosing mapping or sequence stays concrete.
    Unknown,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Sequence(Vec<OpenValue>),
    /// Keys are unique, the engine does not supply duplicates.
    Mapping(Vec<(String, OpenValue)>),
}

impl Default for OpenValue {
    fn default() -> Self {
        Self::Null
    }
}

impl OpenValue {
    /// Recursively decodes a raw token tree. Every scalar maps to its matching leaf variant, a
    /// not-yet-known leaf becomes `Unknown` without affecting its parent, and an opaque token
    /// anywhere in the tree is an `UnsupportedNodeKind` error.
    pub fn decode(raw: &RawValue) -> Result<Self> {
        match raw {
            RawValue::Null => Ok(Self::Null),
            RawValue::Unknown => Ok(Self::Unknown),
            RawValue::Bool(value) => Ok(Self::Bool(*value)),
            RawValue::Number(value) => Ok(Self::Number(value.clone())),
            RawValue::String(value) => Ok(Self::String(value.clone())),
            RawValue::Sequence(items) => items
                .iter()
                .map(Self::decode)
                .collect::<Result<Vec<_>>>()
                .map(Self::Sequence),
            RawValue::Mapping(entries) => entries
                .iter()
                .map(|(key, value)| Self::decode(value).map(|decoded| (key.clone(), decoded)))
                .collect::<Result<Vec<_>>>()
                .map(Self::Mapping),
            RawValue::Opaque(_) => error::UnsupportedNodeKindSnafu { kind: raw.kind() }.fail(),
        }
    }

    /// Encodes the value back into the raw representation, preserving entry order.
    pub fn encode(&self) -> RawValue {
        match self {
            Self::Null => RawValue::Null,
            Self::Unknown => RawValue::Unknown,
            Self::Bool(value) => RawValue::Bool(*value),
            Self::Number(value) => RawValue::Number(value.clone()),
            Self::String(value) => RawValue::String(value.clone()),
            Self::Sequence(items) => {
                RawValue::Sequence(items.iter().map(Self::encode).collect())
            }
            Self::Mapping(entries) => RawValue::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.encode()))
                    .collect(),
            ),
        }
    }

    /// Returns a copy with mapping entries whose value is null removed, recursively. Sequence
    /// elements are kept, a null inside a list is data. Used for fields declared omit-empty.
    pub fn prune_nulls(&self) -> Self {
        match self {
            Self::Mapping(entries) => Self::Mapping(
                entries
                    .iter()
                    .filter(|(_, value)| !value.is_null())
                    .map(|(key, value)| (key.clone(), value.prune_nulls()))
                    .collect(),
            ),
            Self::Sequence(items) => {
                Self::Sequence(items.iter().map(Self::prune_nulls).collect())
            }
            other => other.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True when there is nothing to emit: null, an empty sequence, or an empty mapping.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Sequence(items) => items.is_empty(),
            Self::Mapping(entries) => entries.is_empty(),
            _ => false,
        }
    }
}

/// Mapping equality ignores entry order, everything else is positional.
impl PartialEq for OpenValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) | (Self::Unknown, Self::Unknown) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Sequence(a), Self::Sequence(b)) => a == b,
            (Self::Mapping(a), Self::Mapping(b)) => mapping_eq(a, b),
            _ => false,
        }
    }
}

// Keys are unique, so equal length plus key-wise lookup is set equality.
fn mapping_eq(a: &[(String, OpenValue)], b: &[(String, OpenValue)]) -> bool {
    a.len() == b.len()
        && a.iter().all(|(key, value)| {
            b.iter()
                .find(|(other_key, _)| other_key == key)
                .map(|(_, other_value)| value == other_value)
                .unwrap_or(false)
        })
}

impl Serialize for OpenValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Unknown => Err(serde::ser::Error::custom(
                "an unresolved value cannot appear in a manifest",
            )),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Number(value) => value.serialize(serializer),
            Self::String(value) => serializer.serialize_str(value),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for OpenValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OpenValueVisitor;

        impl<'de> Visitor<'de> for OpenValueVisitor {
            type Value = OpenValue;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("a null, boolean, number, string, sequence, or mapping")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<OpenValue, E> {
                Ok(OpenValue::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<OpenValue, E> {
                Ok(OpenValue::Number(serde_json::Number::from(value)))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<OpenValue, E> {
                Ok(OpenValue::Number(serde_json::Number::from(value)))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<OpenValue, E> {
                serde_json::Number::from_f64(value)
                    .map(OpenValue::Number)
                    .ok_or_else(|| {
                        de::Error::invalid_value(de::Unexpected::Float(value), &self)
                    })
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<OpenValue, E> {
                Ok(OpenValue::String(value.to_string()))
            }

            fn visit_string<E: de::Error>(
                self,
                value: String,
            ) -> std::result::Result<OpenValue, E> {
                Ok(OpenValue::String(value))
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<OpenValue, E> {
                Ok(OpenValue::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<OpenValue, E> {
                Ok(OpenValue::Null)
            }

            fn visit_some<D2>(self, deserializer: D2) -> std::result::Result<OpenValue, D2::Error>
            where
                D2: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<OpenValue, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(OpenValue::Sequence(items))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<OpenValue, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, OpenValue>()? {
                    entries.push((key, value));
                }
                Ok(OpenValue::Mapping(entries))
            }
        }

        deserializer.deserialize_any(OpenValueVisitor)
    }
}
