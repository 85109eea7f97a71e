use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use snafu::OptionExt;

/// The low-level value representation the schema engine's generic plan/diff machinery operates
/// on. Every configured attribute arrives as a `RawValue` before it is matched against the
/// field's declared kind, and every decoded value can be turned back into one for diffing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    /// A value the engine has not computed yet in the current planning cycle.
    Unknown,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Sequence(Vec<RawValue>),
    /// Key order is the order the configuration source supplied and is preserved end-to-end.
    Mapping(Vec<(String, RawValue)>),
    /// A token that cannot be flattened to data, such as a live reference or function. The
    /// payload names the token's type for diagnostics.
    Opaque(String),
}

impl RawValue {
    pub fn kind(&self) -> RawKind {
        match self {
            RawValue::Null => RawKind::Null,
            RawValue::Unknown => RawKind::Unknown,
            RawValue::Bool(_) => RawKind::Bool,
            RawValue::Number(_) => RawKind::Number,
            RawValue::String(_) => RawKind::String,
            RawValue::Sequence(_) => RawKind::Sequence,
            RawValue::Mapping(_) => RawKind::Mapping,
            RawValue::Opaque(_) => RawKind::Opaque,
        }
    }

    /// Converts a parsed YAML node into a `RawValue` so that an emitted document can be fed
    /// back through the same decode path when checking for drift.
    pub fn from_yaml(node: &serde_yaml::Value) -> Result<Self> {
        match node {
            serde_yaml::Value::Null => Ok(RawValue::Null),
            serde_yaml::Value::Bool(value) => Ok(RawValue::Bool(*value)),
            serde_yaml::Value::Number(number) => Ok(RawValue::Number(number_from_yaml(number)?)),
            serde_yaml::Value::String(value) => Ok(RawValue::String(value.clone())),
            serde_yaml::Value::Sequence(items) => items
                .iter()
                .map(Self::from_yaml)
                .collect::<Result<Vec<_>>>()
                .map(RawValue::Sequence),
            serde_yaml::Value::Mapping(mapping) => {
                let mut entries = Vec::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let key = match key {
                        serde_yaml::Value::String(key) => key.clone(),
                        other => {
                            return error::NonStringMappingKeySnafu {
                                kind: yaml_kind(other),
                            }
                            .fail()
                        }
                    };
                    entries.push((key, Self::from_yaml(value)?));
                }
                Ok(RawValue::Mapping(entries))
            }
        }
    }
}

fn yaml_kind(node: &serde_yaml::Value) -> RawKind {
    match node {
        serde_yaml::Value::Null => RawKind::Null,
        serde_yaml::Value::Bool(_) => RawKind::Bool,
        serde_yaml::Value::Number(_) => RawKind::Number,
        serde_yaml::Value::String(_) => RawKind::String,
        serde_yaml::Value::Sequence(_) => RawKind::Sequence,
        serde_yaml::Value::Mapping(_) => RawKind::Mapping,
    }
}

fn number_from_yaml(number: &serde_yaml::Number) -> Result<serde_json::Number> {
    if let Some(value) = number.as_i64() {
        return Ok(serde_json::Number::from(value));
    }
    if let Some(value) = number.as_u64() {
        return Ok(serde_json::Number::from(value));
    }
    let value = number.as_f64().unwrap_or(f64::NAN);
    serde_json::Number::from_f64(value).context(error::NonFiniteNumberSnafu { value })
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(serde_json::Number::from(value))
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

/// The kind of a raw configuration token, used when reporting shape mismatches.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum RawKind {
    Null,
    Unknown,
    Bool,
    Number,
    String,
    Sequence,
    Mapping,
    Opaque,
}

serde_plain::derive_display_from_serialize!(RawKind);
serde_plain::derive_fromstr_from_deserialize!(RawKind);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn yaml_conversion_preserves_kinds() {
        let yaml: serde_yaml::Value = serde_yaml::from_str(
            r#"
            name: web
            replicas: 3
            ratio: 0.5
            enabled: true
            ports:
              - 80
              - 443
            "#,
        )
        .unwrap();
        let raw = RawValue::from_yaml(&yaml).unwrap();
        let entries = match raw {
            RawValue::Mapping(entries) => entries,
            other => panic!("expected a mapping, got {:?}", other),
        };
        assert_eq!(entries[0], ("name".to_string(), RawValue::from("web")));
        assert_eq!(entries[1], ("replicas".to_string(), RawValue::from(3)));
        assert!(matches!(entries[2].1, RawValue::Number(_)));
        assert_eq!(entries[3], ("enabled".to_string(), RawValue::from(true)));
        assert_eq!(
            entries[4].1,
            RawValue::Sequence(vec![RawValue::from(80), RawValue::from(443)])
        );
    }

    #[test]
    fn yaml_conversion_rejects_non_string_keys() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: one").unwrap();
        let error = RawValue::from_yaml(&yaml).unwrap_err();
        assert!(matches!(
            error,
            crate::Error::NonStringMappingKey {
                kind: RawKind::Number
            }
        ));
    }

    #[test]
    fn kind_names_round_trip() {
        assert_eq!(RawKind::Sequence.to_string(), "sequence");
        assert_eq!("mapping".parse::<RawKind>().unwrap(), RawKind::Mapping);
    }
}
