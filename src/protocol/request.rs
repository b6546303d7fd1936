//! Captured request types.
//!
//! [`CapturedRequest`] is both the cache entry held by the background
//! context and the payload handed to the frame context for replay, so its
//! serialized form is the `request` field of the `getRequestForReplay`
//! reply:
//!
//! ```json
//! {
//!   "url": "https://api.example.com/submit",
//!   "method": "POST",
//!   "body": null,
//!   "formData": { "a": ["1"] },
//!   "headers": { "Content-Type": "application/x-www-form-urlencoded" }
//! }
//! ```
//!
//! [`RequestBodyDescriptor`] is the fragmented body the browser reports at
//! request initiation.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::form_urlencoded;

use crate::error::{Error, Result};

// ============================================================================
// CapturedRequest
// ============================================================================

/// Everything needed to re-issue one observed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedRequest {
    /// Final request URL.
    pub url: String,

    /// HTTP method.
    pub method: String,

    /// Raw body chunks, concatenated and base64 encoded.
    #[serde(default)]
    pub body: Option<String>,

    /// Decoded form fields, when the browser parsed the body.
    #[serde(rename = "formData", default)]
    pub form_data: Option<FormData>,

    /// Request headers as finalized by the browser, case preserved.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl CapturedRequest {
    /// Creates an entry with no body and no headers yet.
    #[must_use]
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            body: None,
            form_data: None,
            headers: BTreeMap::new(),
        }
    }

    /// Returns the header value for an exact (case-sensitive) name.
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Returns `true` if every header in `subset` is present with an equal value.
    #[must_use]
    pub fn has_headers(&self, subset: &BTreeMap<String, String>) -> bool {
        subset
            .iter()
            .all(|(name, value)| self.header(name) == Some(value.as_str()))
    }

    /// Decodes the stored base64 body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyDecode`] if the payload is not valid base64.
    pub fn decoded_body(&self) -> Result<Option<Vec<u8>>> {
        self.body
            .as_deref()
            .map(|encoded| {
                Base64Standard
                    .decode(encoded)
                    .map_err(|e| Error::body_decode(e.to_string()))
            })
            .transpose()
    }
}

// ============================================================================
// FormData
// ============================================================================

/// Form fields in the order the browser reported them.
///
/// Serialized as a JSON object of `name -> [values]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData(Vec<(String, Vec<String>)>);

impl FormData {
    /// Creates an empty field set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to a field, creating the field if needed.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(field, _)| *field == name) {
            Some((_, values)) => values.push(value),
            None => self.0.push((name, vec![value])),
        }
    }

    /// Sets the complete value list of a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        let name = name.into();
        match self.0.iter_mut().find(|(field, _)| *field == name) {
            Some((_, existing)) => *existing = values,
            None => self.0.push((name, values)),
        }
        self
    }

    /// Returns the values of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Iterates `(name, value)` pairs, repeating the name for each value.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| (name.as_str(), value.as_str()))
        })
    }

    /// Returns `true` if there are no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes the fields as `application/x-www-form-urlencoded`, byte for
    /// byte what a browser form serializer produces.
    #[must_use]
    pub fn to_urlencoded(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }
}

impl Serialize for FormData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, values) in &self.0 {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FormData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FormDataVisitor;

        impl<'de> Visitor<'de> for FormDataVisitor {
            type Value = FormData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of field name to string array")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<FormData, A::Error> {
                let mut fields = Vec::with_capacity(access.size_hint().unwrap_or_default());
                while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
                    fields.push((name, values));
                }
                Ok(FormData(fields))
            }
        }

        deserializer.deserialize_map(FormDataVisitor)
    }
}

// ============================================================================
// RequestBodyDescriptor
// ============================================================================

/// Request body as reported by the browser's network observation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RequestBodyDescriptor {
    /// Parsed form fields (multipart or url-encoded bodies).
    #[serde(rename = "formData", default)]
    pub form_data: Option<FormData>,

    /// Raw body fragments in delivery order.
    #[serde(default)]
    pub raw: Option<Vec<RawChunk>>,

    /// Browser-side error reading the body.
    #[serde(default)]
    pub error: Option<String>,
}

/// One raw body fragment.
///
/// Fragments backed by a file carry no bytes and contribute nothing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawChunk {
    /// Fragment bytes.
    #[serde(default)]
    pub bytes: Option<ChunkBytes>,

    /// Path of a file-backed fragment.
    #[serde(default)]
    pub file: Option<String>,
}

/// Fragment bytes, either base64 text or a plain octet array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChunkBytes {
    /// Base64 text.
    Encoded(String),
    /// Octet array.
    Octets(Vec<u8>),
}

impl RawChunk {
    /// Creates a fragment from raw bytes.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(ChunkBytes::Octets(bytes.into())),
            file: None,
        }
    }

    /// Appends the fragment's bytes to `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyDecode`] for malformed base64 text.
    pub fn append_to(&self, buffer: &mut Vec<u8>) -> Result<()> {
        match &self.bytes {
            Some(ChunkBytes::Octets(octets)) => buffer.extend_from_slice(octets),
            Some(ChunkBytes::Encoded(encoded)) => {
                let decoded = Base64Standard
                    .decode(encoded)
                    .map_err(|e| Error::body_decode(e.to_string()))?;
                buffer.extend(decoded);
            }
            None => {}
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
