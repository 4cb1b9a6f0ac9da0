//! Compact storable encoding for JSON payloads
//!
//! Values are written as compact JSON, compressed with zlib-wrapped deflate
//! and base64 encoded so they can live in a plain string store.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Deflate level used for cache payloads (matches zlib's default)
const COMPRESSION_LEVEL: u8 = 6;

/// Upper bound on inflated payload size
const MAX_INFLATED_BYTES: usize = 64 * 1024 * 1024;

/// Errors produced while decoding a stored payload
#[derive(Debug, Error)]
pub enum CodecError {
    /// Text is not valid base64
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Bytes are not a valid zlib stream
    #[error("invalid deflate stream: {0}")]
    Inflate(String),
    /// Inflated text is not valid JSON (or not the expected shape)
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a JSON value into a compressed, ASCII-safe string
pub fn encode(value: &Value) -> String {
    let text = value.to_string();
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(text.as_bytes(), COMPRESSION_LEVEL);
    STANDARD.encode(compressed)
}

/// Decode a string produced by [`encode`] back into a JSON value
pub fn decode(text: &str) -> Result<Value, CodecError> {
    let bytes = inflate(text)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Encode any serializable value
pub fn encode_typed<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    let value = serde_json::to_value(value)?;
    Ok(encode(&value))
}

/// Decode straight into a typed value
pub fn decode_typed<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    let bytes = inflate(text)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn inflate(text: &str) -> Result<Vec<u8>, CodecError> {
    let compressed = STANDARD.decode(text.trim())?;
    miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(&compressed, MAX_INFLATED_BYTES)
        .map_err(|e| CodecError::Inflate(format!("{:?}", e.status)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_encode_is_ascii() {
        let encoded = encode(&json!({"bitcoin": "67000.12", "list": [1, 2, 3]}));
        assert!(encoded.is_ascii());
        assert!(!encoded.contains(char::is_whitespace));
    }

    #[test]
    fn test_round_trip_market_payload() {
        let payload = json!([
            {
                "id": "bitcoin",
                "symbol": "btc",
                "name": "Bitcoin",
                "current_price": 67012.5,
                "price_change_percentage_24h": -1.25,
                "sparkline_in_7d": {"price": [66000.1, 66500.2, 67012.5]}
            },
            {
                "id": "ethereum",
                "symbol": "eth",
                "name": "Ethereum",
                "current_price": 3500,
                "price_change_percentage_24h": null
            }
        ]);

        let decoded = decode(&encode(&payload)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_compresses_repetitive_payload() {
        let payload = Value::Array(vec![json!({"symbol": "btc", "price": 1}); 200]);
        let raw_len = payload.to_string().len();
        assert!(encode(&payload).len() < raw_len / 4);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode("not base64 at all!").unwrap_err();
        assert!(matches!(err, CodecError::Base64(_)));
    }

    #[test]
    fn test_decode_rejects_bad_deflate() {
        let text = STANDARD.encode(b"plain bytes, not zlib");
        let err = decode(&text).unwrap_err();
        assert!(matches!(err, CodecError::Inflate(_)));
    }

    #[test]
    fn test_decode_rejects_bad_json() {
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(b"{not json", 6);
        let err = decode(&STANDARD.encode(compressed)).unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn test_typed_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Entry {
            symbol: String,
            prices: Vec<u32>,
        }

        let entry = Entry {
            symbol: "sol".to_string(),
            prices: vec![140, 142, 139],
        };
        let text = encode_typed(&entry).unwrap();
        let back: Entry = decode_typed(&text).unwrap();
        assert_eq!(back, entry);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z0-9 ]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..8)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(value in arb_json()) {
            prop_assert_eq!(decode(&encode(&value)).unwrap(), value);
        }
    }
}
