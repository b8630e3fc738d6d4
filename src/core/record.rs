//! Page records as stored in the manual's vector collection.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize, Serializer};

/// First page of the manual.
pub const FIRST_PAGE: i64 = 1;
/// Last page of the manual.
pub const LAST_PAGE: i64 = 150;

/// Decoded PNG image bytes.
///
/// The store keeps visuals base64-encoded; they are decoded once when a
/// record is read and re-encoded only at the transport edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngImage(Vec<u8>);

impl PngImage {
    /// Wraps raw PNG bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decodes a standard base64 payload. ASCII whitespace anywhere in the
    /// payload (MIME-style line wrapping) is ignored.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when `encoded` is not valid base64.
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        if encoded.bytes().any(|b| b.is_ascii_whitespace()) {
            let compact: Vec<u8> = encoded
                .bytes()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            return STANDARD.decode(compact).map(Self);
        }
        STANDARD.decode(encoded).map(Self)
    }

    /// Raw image bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Standard base64 encoding of the bytes.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Inline `data:` URL accepted by vision models.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.to_base64())
    }
}

impl Serialize for PngImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

/// Record properties exactly as the store returns them.
///
/// Every property is optional on the wire; [`PageRecord::from_raw`]
/// normalizes the shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPageRecord {
    /// Manual text for this chunk.
    #[serde(default)]
    pub content: Option<String>,
    /// Section label.
    #[serde(default)]
    pub section: Option<String>,
    /// 1-based page number.
    #[serde(default)]
    pub page: Option<i64>,
    /// Content classification tag.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Whether an image must accompany this chunk.
    #[serde(default)]
    pub has_critical_visual: Option<bool>,
    /// Base64 PNG, present for critical visuals.
    #[serde(default)]
    pub visual_content: Option<String>,
}

/// One indexed chunk of the manual.
///
/// The visual is present exactly when the chunk is flagged as carrying a
/// critical visual; [`PageRecord::has_critical_visual`] is derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// Manual text for this chunk.
    pub content: String,
    /// Human-readable section label.
    pub section: String,
    /// 1-based page number.
    pub page: i64,
    /// Classification tag (text, table, chart, ...).
    pub content_type: String,
    /// Image that must accompany this chunk.
    pub visual: Option<PngImage>,
}

impl PageRecord {
    /// Creates a text-only record.
    #[must_use]
    pub fn text(section: impl Into<String>, page: i64, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            section: section.into(),
            page,
            content_type: "text".to_string(),
            visual: None,
        }
    }

    /// Attaches a critical visual.
    #[must_use]
    pub fn with_visual(mut self, image: PngImage) -> Self {
        self.visual = Some(image);
        self
    }

    /// True if an image must accompany this chunk.
    #[must_use]
    pub const fn has_critical_visual(&self) -> bool {
        self.visual.is_some()
    }

    /// Builds a record from the store's wire shape.
    ///
    /// A visual is kept only when the record is flagged critical and the
    /// payload decodes. Unflagged payloads are ignored; flagged records
    /// with a missing or undecodable payload lose the flag.
    #[must_use]
    pub fn from_raw(raw: RawPageRecord) -> Self {
        let page = raw.page.unwrap_or_default();
        let section = raw.section.unwrap_or_default();

        let visual = if raw.has_critical_visual.unwrap_or(false) {
            match raw.visual_content.as_deref().map(PngImage::from_base64) {
                Some(Ok(image)) if !image.as_bytes().is_empty() => Some(image),
                Some(Ok(_)) | None => {
                    tracing::warn!(page, section = %section, "critical visual flagged but no image stored");
                    None
                }
                Some(Err(e)) => {
                    tracing::warn!(page, section = %section, error = %e, "critical visual is not valid base64");
                    None
                }
            }
        } else {
            None
        };

        Self {
            content: raw.content.unwrap_or_default(),
            section,
            page,
            content_type: raw.content_type.unwrap_or_else(|| "text".to_string()),
            visual,
        }
    }
}
