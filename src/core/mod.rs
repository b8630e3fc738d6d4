//! Core data types shared by the store, the answer pipeline, and the
//! transports.

pub mod output;
pub mod record;

pub use output::{ContentBlock, PNG_MIME_TYPE, ToolOutput};
pub use record::{PageRecord, PngImage, RawPageRecord};
