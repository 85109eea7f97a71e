use crate::diagnostics::{Diagnostics, FieldPath};
use crate::error::{self, Result};
use crate::int_or_string::IntOrString;
use crate::open_value::OpenValue;
use crate::raw::RawValue;
use log::{debug, trace};
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject, SingleOrVec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fmt::Debug;

/// The contract surface the schema engine expects of every attribute kind: a canonical kind
/// descriptor, a zero value, equality, and conversion to and from the engine's raw
/// representation. The two custom kinds implement it so the engine's generic plan/diff
/// machinery can treat them like any native kind.
pub trait Attribute: Clone + Debug + PartialEq + Serialize + Sized {
    /// The declared kind this type decodes.
    const KIND: AttrKind;

    /// The canonical descriptor the engine checks configured shapes against.
    fn schema(gen: &mut SchemaGenerator) -> Schema;

    /// The value of an unconfigured field.
    fn empty() -> Self;

    fn decode(raw: &RawValue) -> Result<Self>;

    fn encode(&self) -> RawValue;

    /// Deep equality as the engine's diff sees it.
    fn equals(&self, other: &Self) -> bool {
        self == other
    }
}

impl Attribute for IntOrString {
    const KIND: AttrKind = AttrKind::IntOrString;

    fn schema(gen: &mut SchemaGenerator) -> Schema {
        int_or_string_schema(gen)
    }

    fn empty() -> Self {
        Self::Null
    }

    fn decode(raw: &RawValue) -> Result<Self> {
        IntOrString::decode(raw)
    }

    fn encode(&self) -> RawValue {
        IntOrString::encode(self)
    }
}

impl Attribute for OpenValue {
    const KIND: AttrKind = AttrKind::Open;

    fn schema(gen: &mut SchemaGenerator) -> Schema {
        open_value_schema(gen)
    }

    fn empty() -> Self {
        Self::Null
    }

    fn decode(raw: &RawValue) -> Result<Self> {
        OpenValue::decode(raw)
    }

    fn encode(&self) -> RawValue {
        OpenValue::encode(self)
    }
}

/// The descriptor for int-or-string fields, carrying the upstream API convention marker so the
/// generated schema round-trips through schema tooling unchanged.
pub fn int_or_string_schema(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject::default();
    schema.instance_type = Some(SingleOrVec::Vec(vec![
        InstanceType::Integer,
        InstanceType::String,
    ]));
    schema.extensions.insert(
        "x-kubernetes-int-or-string".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}

/// The descriptor for open-structure fields: an open object in the upstream API's
/// `additionalProperties: true, nullable: true` convention, with the marker that tells the
/// upstream API to keep fields the schema does not name.
pub fn open_value_schema(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject::default();
    schema.instance_type = Some(SingleOrVec::Single(Box::new(InstanceType::Object)));
    schema.object().additional_properties = Some(Box::new(Schema::Bool(true)));
    schema
        .extensions
        .insert("nullable".to_string(), serde_json::Value::Bool(true));
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}

impl JsonSchema for IntOrString {
    fn schema_name() -> String {
        "IntOrString".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        int_or_string_schema(gen)
    }

    fn is_referenceable() -> bool {
        false
    }
}

impl JsonSchema for OpenValue {
    fn schema_name() -> String {
        "OpenValue".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        open_value_schema(gen)
    }

    fn is_referenceable() -> bool {
        false
    }
}

/// Identifies which of the two custom kinds a generated field declared, for call sites that
/// process fields generically rather than through the [`Attribute`] trait.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum AttrKind {
    IntOrString,
    Open,
}

serde_plain::derive_display_from_serialize!(AttrKind);
serde_plain::derive_fromstr_from_deserialize!(AttrKind);

impl AttrKind {
    pub fn schema(self, gen: &mut SchemaGenerator) -> Schema {
        match self {
            AttrKind::IntOrString => int_or_string_schema(gen),
            AttrKind::Open => open_value_schema(gen),
        }
    }

    pub fn empty(self) -> AttrValue {
        match self {
            AttrKind::IntOrString => AttrValue::IntOrString(IntOrString::Null),
            AttrKind::Open => AttrValue::Open(OpenValue::Null),
        }
    }

    pub fn decode(self, raw: &RawValue) -> Result<AttrValue> {
        match self {
            AttrKind::IntOrString => IntOrString::decode(raw).map(AttrValue::IntOrString),
            AttrKind::Open => OpenValue::decode(raw).map(AttrValue::Open),
        }
    }
}

/// A decoded value of either custom kind. Serializes as the underlying value, so it can sit in
/// a document tree next to ordinary fields.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AttrValue {
    IntOrString(IntOrString),
    Open(OpenValue),
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::IntOrString(_) => AttrKind::IntOrString,
            AttrValue::Open(_) => AttrKind::Open,
        }
    }

    pub fn encode(&self) -> RawValue {
        match self {
            AttrValue::IntOrString(value) => value.encode(),
            AttrValue::Open(value) => value.encode(),
        }
    }
}

/// What a generated schema declares about one bridged field. The declaration is trusted as
/// given, nothing here re-validates it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub path: FieldPath,
    pub kind: AttrKind,
    /// Whether an absent or null value is omitted from the emitted document instead of being
    /// written as an explicit null.
    pub omit_empty: bool,
}

impl FieldDecl {
    pub fn new(path: FieldPath, kind: AttrKind, omit_empty: bool) -> Self {
        Self {
            path,
            kind,
            omit_empty,
        }
    }
}

/// Where one field is in its resolution, for one planning cycle. Decoded and failed states are
/// terminal, the next cycle starts from a fresh `Unconfigured` field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldState {
    Unconfigured,
    Decoding,
    Decoded(AttrValue),
    Failed,
}

impl Default for FieldState {
    fn default() -> Self {
        Self::Unconfigured
    }
}

/// One bridged field of one resource during one planning cycle.
#[derive(Debug, Clone)]
pub struct Field {
    decl: FieldDecl,
    state: FieldState,
}

impl Field {
    pub fn new(decl: FieldDecl) -> Self {
        Self {
            decl,
            state: FieldState::Unconfigured,
        }
    }

    pub fn decl(&self) -> &FieldDecl {
        &self.decl
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    /// The decoded value, if resolution succeeded.
    pub fn value(&self) -> Option<&AttrValue> {
        match &self.state {
            FieldState::Decoded(value) => Some(value),
            _ => None,
        }
    }

    /// Decodes the configured raw value. On failure the field is marked failed and the error
    /// is recorded against the field's path; siblings are unaffected. Returns whether the
    /// field resolved.
    pub fn resolve(&mut self, raw: &RawValue, diagnostics: &Diagnostics) -> bool {
        self.state = FieldState::Decoding;
        trace!("decoding field '{}' as {}", self.decl.path, self.decl.kind);
        match self.decl.kind.decode(raw) {
            Ok(value) => {
                self.state = FieldState::Decoded(value);
                true
            }
            Err(error) => {
                debug!("field '{}' did not decode: {}", self.decl.path, error);
                diagnostics.record(self.decl.path.clone(), error);
                self.state = FieldState::Failed;
                false
            }
        }
    }

    /// The document node for this field, honoring the declaration's emission policy. `None`
    /// means the field is omitted from the document: unconfigured and failed fields always
    /// are, and so are absent values on fields declared omit-empty.
    pub fn document_node(&self) -> Result<Option<serde_yaml::Value>> {
        let value = match &self.state {
            FieldState::Decoded(value) => value,
            _ => return Ok(None),
        };
        match value {
            AttrValue::IntOrString(scalar) => {
                if scalar.is_absent() {
                    if self.decl.omit_empty {
                        return Ok(None);
                    }
                    return Ok(Some(serde_yaml::Value::Null));
                }
                serde_yaml::to_value(scalar)
                    .context(error::SerializeSnafu)
                    .map(Some)
            }
            AttrValue::Open(open) => {
                if self.decl.omit_empty {
                    let pruned = open.prune_nulls();
                    if pruned.is_empty() || matches!(pruned, OpenValue::Unknown) {
                        return Ok(None);
                    }
                    return serde_yaml::to_value(&pruned)
                        .context(error::SerializeSnafu)
                        .map(Some);
                }
                if open.is_null() || matches!(open, OpenValue::Unknown) {
                    return Ok(Some(serde_yaml::Value::Null));
                }
                serde_yaml::to_value(open)
                    .context(error::SerializeSnafu)
                    .map(Some)
            }
        }
    }
}

/// Resolves every declared bridged field of one resource against the configured values,
/// continuing past per-field failures so one bad field costs only itself. Fields with no
/// configured value are left unconfigured.
pub fn resolve_resource(
    decls: &[FieldDecl],
    values: &[(FieldPath, RawValue)],
    diagnostics: &Diagnostics,
) -> Vec<Field> {
    decls
        .iter()
        .map(|decl| {
            let mut field = Field::new(decl.clone());
            if let Some((_, raw)) = values.iter().find(|(path, _)| path == &decl.path) {
                field.resolve(raw, diagnostics);
            }
            field
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn schema_extensions(schema: &Schema) -> &schemars::Map<String, serde_json::Value> {
        match schema {
            Schema::Object(object) => &object.extensions,
            Schema::Bool(_) => panic!("expected an object schema"),
        }
    }

    #[test]
    fn descriptors_carry_the_upstream_markers() {
        let mut gen = SchemaGenerator::default();

        let scalar = AttrKind::IntOrString.schema(&mut gen);
        assert_eq!(
            schema_extensions(&scalar).get("x-kubernetes-int-or-string"),
            Some(&serde_json::Value::Bool(true))
        );

        let open = AttrKind::Open.schema(&mut gen);
        assert_eq!(
            schema_extensions(&open).get("x-kubernetes-preserve-unknown-fields"),
            Some(&serde_json::Value::Bool(true))
        );
    }

    #[test]
    fn kind_names_round_trip() {
        assert_eq!(AttrKind::IntOrString.to_string(), "intOrString");
        assert_eq!("open".parse::<AttrKind>().unwrap(), AttrKind::Open);
    }

    #[test]
    fn empty_values_match_their_kind() {
        assert_eq!(
            AttrKind::IntOrString.empty(),
            AttrValue::IntOrString(IntOrString::Null)
        );
        assert_eq!(AttrKind::Open.empty(), AttrValue::Open(OpenValue::Null));
        assert_eq!(AttrKind::IntOrString.empty().kind(), AttrKind::IntOrString);
    }

    #[test]
    fn resolution_walks_the_state_machine() {
        let diagnostics = Diagnostics::new();
        let decl = FieldDecl::new(FieldPath::field("port"), AttrKind::IntOrString, false);
        let mut field = Field::new(decl);
        assert_eq!(field.state(), &FieldState::Unconfigured);
        assert!(field.value().is_none());

        assert!(field.resolve(&RawValue::from(8080), &diagnostics));
        assert_eq!(
            field.value(),
            Some(&AttrValue::IntOrString(IntOrString::Int(8080)))
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn a_failed_field_is_recorded_and_isolated() {
        let diagnostics = Diagnostics::new();
        let mut decls = vec![FieldDecl::new(
            FieldPath::field("spec").key("broken"),
            AttrKind::IntOrString,
            false,
        )];
        let mut values = vec![(FieldPath::field("spec").key("broken"), RawValue::from(true))];
        for index in 0..9 {
            let path = FieldPath::field("spec").key(format!("field{}", index));
            decls.push(FieldDecl::new(path.clone(), AttrKind::IntOrString, false));
            values.push((path, RawValue::from(index)));
        }

        let fields = resolve_resource(&decls, &values, &diagnostics);

        assert_eq!(fields.len(), 10);
        assert_eq!(fields[0].state(), &FieldState::Failed);
        assert!(fields[1..]
            .iter()
            .all(|field| matches!(field.state(), FieldState::Decoded(_))));

        let entries = diagnostics.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path.to_string(), "spec.broken");
    }

    #[test]
    fn unconfigured_fields_stay_unconfigured() {
        let diagnostics = Diagnostics::new();
        let decls = vec![FieldDecl::new(
            FieldPath::field("overrides"),
            AttrKind::Open,
            true,
        )];
        let fields = resolve_resource(&decls, &[], &diagnostics);
        assert_eq!(fields[0].state(), &FieldState::Unconfigured);
        assert!(fields[0].document_node().unwrap().is_none());
    }

    #[test]
    fn document_node_honors_omit_empty() {
        let diagnostics = Diagnostics::new();

        let mut omitted = Field::new(FieldDecl::new(
            FieldPath::field("port"),
            AttrKind::IntOrString,
            true,
        ));
        omitted.resolve(&RawValue::Null, &diagnostics);
        assert_eq!(omitted.document_node().unwrap(), None);

        let mut explicit = Field::new(FieldDecl::new(
            FieldPath::field("port"),
            AttrKind::IntOrString,
            false,
        ));
        explicit.resolve(&RawValue::Null, &diagnostics);
        assert_eq!(
            explicit.document_node().unwrap(),
            Some(serde_yaml::Value::Null)
        );

        let mut pruned = Field::new(FieldDecl::new(
            FieldPath::field("overrides"),
            AttrKind::Open,
            true,
        ));
        pruned.resolve(
            &RawValue::Mapping(vec![("stale".to_string(), RawValue::Null)]),
            &diagnostics,
        );
        assert_eq!(pruned.document_node().unwrap(), None);

        let mut kept = Field::new(FieldDecl::new(
            FieldPath::field("overrides"),
            AttrKind::Open,
            false,
        ));
        kept.resolve(
            &RawValue::Mapping(vec![("stale".to_string(), RawValue::Null)]),
            &diagnostics,
        );
        let node = kept.document_node().unwrap();
        let mut expected = serde_yaml::Mapping::new();
        expected.insert(
            serde_yaml::Value::String("stale".to_string()),
            serde_yaml::Value::Null,
        );
        assert_eq!(node, Some(serde_yaml::Value::Mapping(expected)));
    }

    #[test]
    fn trait_and_kind_dispatch_agree() {
        let raw = RawValue::from("50%");
        let typed = <IntOrString as Attribute>::decode(&raw).unwrap();
        let erased = <IntOrString as Attribute>::KIND.decode(&raw).unwrap();
        assert_eq!(AttrValue::IntOrString(typed.clone()), erased);
        assert_eq!(typed.encode(), erased.encode());
        assert!(typed.equals(&IntOrString::String("50%".to_string())));
    }
}
