//! Output formatting for one-shot commands.

use std::fmt::Write;

use crate::core::{ContentBlock, ToolOutput};

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Content blocks as JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, falling back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Renders a tool result. Text mode prints the text followed by one
/// placeholder line per image.
#[must_use]
pub fn format_tool_output(output: &ToolOutput, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut text = String::new();
            let mut image_index = 0usize;
            for block in output.blocks() {
                match block {
                    ContentBlock::Text { text: t } => text.push_str(t),
                    ContentBlock::Image { data, mime_type } => {
                        image_index += 1;
                        let _ = write!(
                            text,
                            "\n[image {image_index}: {} bytes, {mime_type}]",
                            data.as_bytes().len()
                        );
                    }
                }
            }
            text
        }
        OutputFormat::Json => serde_json::to_string_pretty(output).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PngImage;
    use test_case::test_case;

    #[test_case("json", OutputFormat::Json)]
    #[test_case("JSON", OutputFormat::Json)]
    #[test_case("text", OutputFormat::Text)]
    #[test_case("yaml", OutputFormat::Text)]
    fn test_parse(input: &str, expected: OutputFormat) {
        assert_eq!(OutputFormat::parse(input), expected);
    }

    #[test]
    fn test_text_lists_images() {
        let output = ToolOutput::with_images("Answer.", vec![PngImage::new(vec![0; 3])]);
        assert_eq!(
            format_tool_output(&output, OutputFormat::Text),
            "Answer.\n[image 1: 3 bytes, image/png]"
        );
    }

    #[test]
    fn test_json_is_block_array() {
        let output = ToolOutput::with_images("A", vec![PngImage::new(vec![1, 2, 3])]);
        let json: serde_json::Value =
            serde_json::from_str(&format_tool_output(&output, OutputFormat::Json))
                .unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!([
                {"type": "text", "text": "A"},
                {"type": "image", "data": "AQID", "mimeType": "image/png"}
            ])
        );
    }
}
