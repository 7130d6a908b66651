//! Downloaded image bytes and their base64 form.

use mime::Mime;
use url::Url;

use crate::models::Blob;

/// Raw image bytes together with the MIME type they will be submitted as.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResource {
    bytes: Vec<u8>,
    mime_type: Mime,
    source: Option<Url>,
}

impl ImageResource {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: Mime) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type,
            source: None,
        }
    }

    /// Remember where the bytes came from, for diagnostics.
    pub fn with_source(mut self, source: Url) -> Self {
        self.source = Some(source);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &Mime {
        &self.mime_type
    }

    pub fn source(&self) -> Option<&Url> {
        self.source.as_ref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Standard base64 encoding of the bytes, ready to be sent as inline data.
    ///
    /// Consumes the resource: the raw bytes are not needed once encoded.
    pub fn encode(self) -> Blob {
        Blob::from_bytes(self.mime_type.essence_str(), &self.bytes)
    }
}
