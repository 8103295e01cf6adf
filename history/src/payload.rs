//! Content payloads returned by the content endpoints.
//!
//! Spreadsheet and document versions are frequently shipped as base64 text,
//! sometimes as a `data:` URL, sometimes line-wrapped or in the URL-safe
//! alphabet. [`sanitize_base64`] reduces all of these to canonical padded
//! base64 before decoding.

use base64::prelude::*;
use thiserror::Error;

/// Errors that can occur when interpreting a payload.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The payload is not valid UTF-8 text.
    #[error("payload is not UTF-8 text: {0}")]
    NotText(#[from] std::str::Utf8Error),

    /// The payload is not decodable base64.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Raw content of one version plus the MIME type the backend reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPayload {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

impl ContentPayload {
    /// Creates a payload from raw bytes.
    ///
    /// Blank content types are discarded.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type
                .map(|ct| ct.trim().to_string())
                .filter(|ct| !ct.is_empty()),
        }
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type hint, when the backend supplied one.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the payload has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the payload as text.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::NotText`] if the bytes are not UTF-8.
    pub fn as_text(&self) -> Result<&str, PayloadError> {
        Ok(std::str::from_utf8(&self.bytes)?)
    }

    /// Decodes a base64 payload after sanitizing it.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::NotText`] if the payload is not text, or
    /// [`PayloadError::InvalidBase64`] if it does not decode.
    pub fn decode_base64(&self) -> Result<Vec<u8>, PayloadError> {
        let sanitized = sanitize_base64(self.as_text()?);
        Ok(BASE64_STANDARD.decode(sanitized)?)
    }

    /// Consumes the payload, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reduces base64 text to canonical, padded standard-alphabet form.
///
/// - strips surrounding quotes and a `data:<mime>;base64,` prefix
/// - removes all whitespace
/// - maps the URL-safe alphabet (`-`, `_`) to the standard one
/// - restores `=` padding
///
/// # Example
///
/// ```
/// use campus_history::sanitize_base64;
///
/// assert_eq!(sanitize_base64("data:text/plain;base64,aGk"), "aGk=");
/// ```
#[must_use]
pub fn sanitize_base64(input: &str) -> String {
    let mut text = input.trim().trim_matches('"');

    if text.starts_with("data:") {
        if let Some((_, rest)) = text.split_once(',') {
            text = rest;
        }
    }

    let mut sanitized: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let remainder = sanitized.len() % 4;
    if remainder != 0 {
        sanitized.push_str(&"=".repeat(4 - remainder));
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_type_is_dropped() {
        let payload = ContentPayload::new(b"x".to_vec(), Some("  ".to_string()));
        assert!(payload.content_type().is_none());

        let payload = ContentPayload::new(b"x".to_vec(), Some(" text/plain ".to_string()));
        assert_eq!(payload.content_type(), Some("text/plain"));
    }

    #[test]
    fn text_access() {
        let payload = ContentPayload::new("hola".as_bytes().to_vec(), None);
        assert_eq!(payload.as_text().unwrap(), "hola");
        assert_eq!(payload.len(), 4);

        let binary = ContentPayload::new(vec![0xff, 0xfe], None);
        assert!(matches!(binary.as_text(), Err(PayloadError::NotText(_))));
    }

    #[test]
    fn sanitize_strips_data_url_and_whitespace() {
        assert_eq!(
            sanitize_base64("data:application/vnd.ms-excel;base64,UEsD\nBBQA\r\n"),
            "UEsDBBQA"
        );
        assert_eq!(sanitize_base64("\"aGVsbG8=\""), "aGVsbG8=");
    }

    #[test]
    fn sanitize_restores_padding_and_alphabet() {
        assert_eq!(sanitize_base64("aGk"), "aGk=");
        assert_eq!(sanitize_base64("YQ"), "YQ==");
        assert_eq!(sanitize_base64("-_-_"), "+/+/");
    }

    #[test]
    fn decode_wrapped_workbook_payload() {
        let encoded = BASE64_STANDARD.encode(b"PK\x03\x04 workbook bytes");
        let wrapped = format!(
            "data:application/vnd.openxmlformats-officedocument.spreadsheetml.sheet;base64,{}\n{}",
            &encoded[..10],
            &encoded[10..]
        );

        let payload = ContentPayload::new(wrapped.into_bytes(), None);
        assert_eq!(payload.decode_base64().unwrap(), b"PK\x03\x04 workbook bytes");
    }

    #[test]
    fn decode_rejects_garbage() {
        let payload = ContentPayload::new("not*base64".as_bytes().to_vec(), None);
        assert!(matches!(
            payload.decode_base64(),
            Err(PayloadError::InvalidBase64(_))
        ));
    }
}
