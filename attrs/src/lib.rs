/*!

This library provides the shared attribute machinery that the generated resource schemas lean
on whenever a field cannot be expressed as one of the configuration framework's native kinds.
Two such kinds recur across the catalog: [`IntOrString`], a scalar that keeps whatever
representation the user supplied, and [`OpenValue`], a deliberately unconstrained tree of
scalars, sequences, and mappings. Both decode from the engine's raw tokens, diff with the
equality the engine expects, and serialize into the emitted YAML manifest.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use diagnostics::{Diagnostic, Diagnostics, FieldPath, PathSegment};
pub use emit::{manifest_yaml, redecode_field, verify_round_trip, write_manifest};
pub use error::{Error, Result};
pub use int_or_string::IntOrString;
pub use kind::{
    int_or_string_schema, open_value_schema, resolve_resource, AttrKind, AttrValue, Attribute,
    Field, FieldDecl, FieldState,
};
pub use open_value::OpenValue;
pub use raw::{RawKind, RawValue};

mod diagnostics;
mod emit;
mod error;
mod int_or_string;
mod kind;
mod open_value;
mod raw;
