//! JSON document codec: `{"properties": {...}, "body": "..."}`.

use super::{CodecError, CodecResult, ContentCodec, DecodedContent, TextProperties};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub const NAME: &'static str = "json";
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    #[serde(default)]
    properties: TextProperties,
    #[serde(default)]
    body: String,
}

impl ContentCodec for JsonCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn decode(&self, raw: &[u8]) -> CodecResult<DecodedContent> {
        let document: JsonDocument =
            serde_json::from_slice(raw).map_err(|err| CodecError::Decode {
                codec: Self::NAME,
                message: err.to_string(),
            })?;

        Ok(DecodedContent {
            properties: document.properties,
            body: document.body.into_bytes(),
        })
    }

    fn encode(&self, properties: &TextProperties, body: &[u8]) -> CodecResult<Vec<u8>> {
        let body = std::str::from_utf8(body).map_err(|err| CodecError::Encode {
            codec: Self::NAME,
            message: format!("body must be UTF-8 text: {err}"),
        })?;
        let document = JsonDocument {
            properties: properties.clone(),
            body: body.to_string(),
        };

        serde_json::to_vec(&document).map_err(|err| CodecError::Encode {
            codec: Self::NAME,
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::JsonCodec;
    use crate::codec::{CodecError, ContentCodec, TextProperties};

    #[test]
    fn wire_shape_is_stable() {
        let properties = TextProperties::from([("genre".to_string(), "jazz".to_string())]);
        let raw = JsonCodec.encode(&properties, b"lyrics").unwrap();

        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["properties"]["genre"], "jazz");
        assert_eq!(value["body"], "lyrics");

        let decoded = JsonCodec.decode(&raw).unwrap();
        assert_eq!(decoded.properties, properties);
        assert_eq!(decoded.body, b"lyrics".to_vec());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let decoded = JsonCodec.decode(b"{}").unwrap();
        assert!(decoded.properties.is_empty());
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn rejects_invalid_documents_and_binary_bodies() {
        let err = JsonCodec.decode(b"{\"properties\": 3}").unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));

        let err = JsonCodec
            .encode(&TextProperties::new(), &[0xff, 0xfe])
            .unwrap_err();
        assert!(matches!(err, CodecError::Encode { .. }));
    }
}
