//! Tool results: ordered text and image blocks.

use serde::Serialize;

use super::record::PngImage;

/// MIME type of every image block.
pub const PNG_MIME_TYPE: &str = "image/png";

/// One block of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An inline PNG image.
    Image {
        /// Image bytes, serialized as base64.
        data: PngImage,
        /// Always [`PNG_MIME_TYPE`].
        #[serde(rename = "mimeType")]
        mime_type: &'static str,
    },
}

impl ContentBlock {
    /// Creates a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a PNG image block.
    #[must_use]
    pub const fn image(data: PngImage) -> Self {
        Self::Image {
            data,
            mime_type: PNG_MIME_TYPE,
        }
    }
}

/// Ordered content returned by a tool. Text precedes images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ToolOutput {
    blocks: Vec<ContentBlock>,
}

impl ToolOutput {
    /// A result holding a single text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            blocks: vec![ContentBlock::text(text)],
        }
    }

    /// A text block followed by one image block per image, in order.
    #[must_use]
    pub fn with_images(text: impl Into<String>, images: impl IntoIterator<Item = PngImage>) -> Self {
        let mut blocks = vec![ContentBlock::text(text)];
        blocks.extend(images.into_iter().map(ContentBlock::image));
        Self { blocks }
    }

    /// All blocks in order.
    #[must_use]
    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    /// Consumes the output, returning its blocks.
    #[must_use]
    pub fn into_blocks(self) -> Vec<ContentBlock> {
        self.blocks
    }

    /// Concatenation of all text blocks.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Image blocks in order.
    pub fn images(&self) -> impl Iterator<Item = &PngImage> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::Image { data, .. } => Some(data),
            ContentBlock::Text { .. } => None,
        })
    }
}
