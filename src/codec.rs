//! Body encoders (request side) and response decoders.

use crate::error::{Error, ErrorContext};
use crate::negotiation::{essence, JSON_MEDIA_TYPE};
use crate::transport::RawResponse;
use crate::Result;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
pub const TEXT_PLAIN: &str = "text/plain";

/// Encodes a structured body for one media type.
pub trait BodyEncoder: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Bytes>;
}

pub struct JsonEncoder;

impl BodyEncoder for JsonEncoder {
    fn encode(&self, value: &Value) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }
}

/// `application/x-www-form-urlencoded`; the body must be a JSON object.
/// Array fields are joined with commas, nulls are dropped.
pub struct FormUrlEncoder;

impl BodyEncoder for FormUrlEncoder {
    fn encode(&self, value: &Value) -> Result<Bytes> {
        let object = value.as_object().ok_or_else(|| {
            Error::validation_with_context(
                "form body must be a JSON object",
                ErrorContext::new()
                    .with_field_path("body")
                    .with_source("codec"),
            )
        })?;

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in object {
            match v {
                Value::Null => {}
                Value::Array(items) => {
                    let joined: Vec<String> = items.iter().map(scalar_to_string).collect();
                    serializer.append_pair(k, &joined.join(","));
                }
                other => {
                    serializer.append_pair(k, &scalar_to_string(other));
                }
            }
        }
        Ok(Bytes::from(serializer.finish()))
    }
}

/// `text/plain`: strings are sent verbatim, anything else as JSON text.
pub struct TextEncoder;

impl BodyEncoder for TextEncoder {
    fn encode(&self, value: &Value) -> Result<Bytes> {
        match value {
            Value::String(s) => Ok(Bytes::from(s.clone())),
            other => Ok(Bytes::from(other.to_string())),
        }
    }
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Media type -> encoder table. Lookups ignore parameters and case; anything
/// unknown falls back to JSON.
#[derive(Clone)]
pub struct EncoderRegistry {
    encoders: HashMap<String, Arc<dyn BodyEncoder>>,
    fallback: Arc<dyn BodyEncoder>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        let json: Arc<dyn BodyEncoder> = Arc::new(JsonEncoder);
        let mut encoders: HashMap<String, Arc<dyn BodyEncoder>> = HashMap::new();
        encoders.insert(JSON_MEDIA_TYPE.to_string(), json.clone());
        encoders.insert(FORM_URLENCODED.to_string(), Arc::new(FormUrlEncoder));
        encoders.insert(TEXT_PLAIN.to_string(), Arc::new(TextEncoder));
        Self {
            encoders,
            fallback: json,
        }
    }

    pub fn register(&mut self, media_type: &str, encoder: Arc<dyn BodyEncoder>) {
        self.encoders.insert(essence(media_type), encoder);
    }

    pub fn resolve(&self, content_type: &str) -> Arc<dyn BodyEncoder> {
        let key = essence(content_type);
        self.encoders
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn encode(&self, content_type: &str, value: &Value) -> Result<Bytes> {
        self.resolve(content_type).encode(value)
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a successful raw response into the caller's expected shape.
pub trait ResponseDecoder<T>: Send + Sync {
    fn decode(&self, response: &RawResponse) -> Result<T>;
}

/// JSON decoder for any `DeserializeOwned` type. An empty body decodes as `null`,
/// so `()`, `Option<_>` and `serde_json::Value` accept `204 No Content`.
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> ResponseDecoder<T> for JsonDecoder<T> {
    fn decode(&self, response: &RawResponse) -> Result<T> {
        let body = &response.body;
        let parsed = if body.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_slice(body)
        };
        parsed.map_err(|e| Error::decoding(e.to_string(), body.clone()))
    }
}

pub struct TextDecoder;

impl ResponseDecoder<String> for TextDecoder {
    fn decode(&self, response: &RawResponse) -> Result<String> {
        String::from_utf8(response.body.to_vec())
            .map_err(|e| Error::decoding(e.to_string(), response.body.clone()))
    }
}

pub struct BytesDecoder;

impl ResponseDecoder<Bytes> for BytesDecoder {
    fn decode(&self, response: &RawResponse) -> Result<Bytes> {
        Ok(response.body.clone())
    }
}
