//! `key: value` header block followed by a blank line and the body.

use super::{CodecError, CodecResult, ContentCodec, DecodedContent, TextProperties};

const SEPARATOR: &[u8] = b"\n\n";

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderCodec;

impl HeaderCodec {
    pub const NAME: &'static str = "headers";
}

impl ContentCodec for HeaderCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn decode(&self, raw: &[u8]) -> CodecResult<DecodedContent> {
        let (head, body) = if raw.starts_with(b"\n") {
            (&raw[..0], &raw[1..])
        } else {
            let split = raw
                .windows(SEPARATOR.len())
                .position(|window| window == SEPARATOR)
                .ok_or_else(|| decode_error("missing blank line after headers"))?;
            (&raw[..split], &raw[split + SEPARATOR.len()..])
        };

        let head = std::str::from_utf8(head)
            .map_err(|err| decode_error(format!("headers are not UTF-8: {err}")))?;

        let mut properties = TextProperties::new();
        for (index, line) in head.lines().enumerate() {
            let Some((key, value)) = line.split_once(':') else {
                return Err(decode_error(format!("header line {} has no `:`", index + 1)));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(decode_error(format!("header line {} has no name", index + 1)));
            }
            let value = value.strip_prefix(' ').unwrap_or(value);
            properties.insert(key.to_string(), value.to_string());
        }

        Ok(DecodedContent {
            properties,
            body: body.to_vec(),
        })
    }

    fn encode(&self, properties: &TextProperties, body: &[u8]) -> CodecResult<Vec<u8>> {
        let mut out = Vec::with_capacity(body.len() + 64);
        for (key, value) in properties {
            if key.is_empty() || key.contains([':', '\n', '\r']) {
                return Err(encode_error(format!("header name `{key}` is not encodable")));
            }
            if value.contains(['\n', '\r']) {
                return Err(encode_error(format!("value of `{key}` spans several lines")));
            }
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(body);
        Ok(out)
    }
}

fn decode_error(message: impl Into<String>) -> CodecError {
    CodecError::Decode {
        codec: HeaderCodec::NAME,
        message: message.into(),
    }
}

fn encode_error(message: impl Into<String>) -> CodecError {
    CodecError::Encode {
        codec: HeaderCodec::NAME,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::HeaderCodec;
    use crate::codec::{CodecError, ContentCodec, TextProperties};

    #[test]
    fn decodes_what_it_encodes() {
        let properties = TextProperties::from([
            ("artiste".to_string(), "Jesus'harlem".to_string()),
            ("titre".to_string(), "time: 3'12".to_string()),
        ]);
        let body = b"\x00\x01binary\n\nstill body";

        let raw = HeaderCodec.encode(&properties, body).unwrap();
        let decoded = HeaderCodec.decode(&raw).unwrap();
        assert_eq!(decoded.properties, properties);
        assert_eq!(decoded.body, body.to_vec());
    }

    #[test]
    fn empty_header_block_is_valid() {
        let raw = HeaderCodec.encode(&TextProperties::new(), b"body").unwrap();
        assert_eq!(raw, b"\nbody".to_vec());
        let decoded = HeaderCodec.decode(&raw).unwrap();
        assert!(decoded.properties.is_empty());
        assert_eq!(decoded.body, b"body".to_vec());
    }

    #[test]
    fn rejects_garbage() {
        let err = HeaderCodec.decode(b"no separator here").unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));

        let err = HeaderCodec.decode(b"just a line\n\nbody").unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));

        let err = HeaderCodec.decode(b"genre: \xff\xfe\n\nbody").unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    #[test]
    fn refuses_multiline_values() {
        let properties = TextProperties::from([("titre".to_string(), "a\nb".to_string())]);
        let err = HeaderCodec.encode(&properties, b"").unwrap_err();
        assert!(matches!(err, CodecError::Encode { .. }));
    }
}
