use crate::error::{self, Result};
use crate::kind::{AttrKind, AttrValue};
use crate::raw::RawValue;
use serde::Serialize;
use snafu::{ensure, ResultExt};

/// Serializes a fully resolved resource to its YAML manifest. Output is deterministic for a
/// given input tree: struct fields emit in declaration order, open mappings emit in their
/// stored order, and ambiguous strings are quoted so they re-parse as strings.
pub fn manifest_yaml<T>(resource: &T) -> Result<String>
where
    T: Serialize,
{
    serde_yaml::to_string(resource).context(error::SerializeSnafu)
}

/// Writes the YAML manifest for a fully resolved resource, for callers streaming multiple
/// documents into one file.
pub fn write_manifest<T, W>(writer: W, resource: &T) -> Result<()>
where
    T: Serialize,
    W: std::io::Write,
{
    serde_yaml::to_writer(writer, resource).context(error::SerializeSnafu)
}

/// Re-enters the decode path from a node of an emitted document, as drift detection does when
/// comparing externally observed state against the value produced last cycle.
pub fn redecode_field(node: &serde_yaml::Value, kind: AttrKind) -> Result<AttrValue> {
    let raw = RawValue::from_yaml(node)?;
    kind.decode(&raw)
}

/// Decodes a raw token and checks that encoding the result reproduces it. A mismatch is never
/// a user error; it means the codec itself is defective, and the error carries both sides so
/// the defect can be reproduced.
pub fn verify_round_trip(kind: AttrKind, raw: &RawValue) -> Result<AttrValue> {
    let decoded = kind.decode(raw)?;
    let encoded = decoded.encode();
    let round_tripped = match kind.decode(&encoded) {
        Ok(value) => value,
        Err(_) => {
            return error::InconsistentRoundTripSnafu {
                input: format!("{:?}", raw),
                output: format!("{:?}", encoded),
            }
            .fail()
        }
    };
    ensure!(
        round_tripped == decoded,
        error::InconsistentRoundTripSnafu {
            input: format!("{:?}", raw),
            output: format!("{:?}", encoded),
        }
    );
    Ok(decoded)
}
