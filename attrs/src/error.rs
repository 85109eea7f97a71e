use crate::raw::RawKind;
use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for attribute decoding and manifest emission.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Cannot decode a {} token as an int-or-string value", kind))]
    InvalidScalarShape { kind: RawKind },

    #[snafu(display("A {} token has no configuration data representation", kind))]
    UnsupportedNodeKind { kind: RawKind },

    #[snafu(display("Mapping keys must be strings, found a {} key", kind))]
    NonStringMappingKey { kind: RawKind },

    #[snafu(display("The number '{}' cannot be represented in configuration data", value))]
    NonFiniteNumber { value: f64 },

    #[snafu(display(
        "Decode/encode round trip changed the value, input '{}', output '{}'",
        input,
        output
    ))]
    InconsistentRoundTrip { input: String, output: String },

    #[snafu(display("Unable to serialize manifest: {}", source))]
    Serialize { source: serde_yaml::Error },
}
