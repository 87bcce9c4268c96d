//! Content codecs: decode properties out of a stored payload, encode them back.
//!
//! # Responsibility
//! - Define the codec contract access points call on read and write.
//! - Resolve codec names used in site configuration.
//!
//! # Invariants
//! - `decode(encode(p, body))` returns `p` and `body` for every encodable input.
//! - Decode failures are per-record; callers decide whether to skip or fail.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod headers;
pub mod json;

pub use headers::HeaderCodec;
pub use json::JsonCodec;

pub type CodecResult<T> = Result<T, CodecError>;

/// Textual properties carried inside a payload.
pub type TextProperties = BTreeMap<String, String>;

/// Result of decoding one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedContent {
    pub properties: TextProperties,
    /// Payload bytes left once embedded properties are stripped.
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    Decode { codec: &'static str, message: String },
    Encode { codec: &'static str, message: String },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode { codec, message } => write!(f, "{codec} decode failed: {message}"),
            Self::Encode { codec, message } => write!(f, "{codec} encode failed: {message}"),
        }
    }
}

impl Error for CodecError {}

/// Payload parser/serializer plugged into an access point.
pub trait ContentCodec: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, raw: &[u8]) -> CodecResult<DecodedContent>;

    fn encode(&self, properties: &TextProperties, body: &[u8]) -> CodecResult<Vec<u8>>;
}

/// Codec names accepted in configuration.
pub fn supported_codecs() -> &'static [&'static str] {
    &[HeaderCodec::NAME, JsonCodec::NAME]
}

/// Resolves a configured codec name.
pub fn codec_for_name(name: &str) -> Option<Box<dyn ContentCodec>> {
    match name.trim() {
        HeaderCodec::NAME => Some(Box::new(HeaderCodec)),
        JsonCodec::NAME => Some(Box::new(JsonCodec)),
        _ => None,
    }
}
