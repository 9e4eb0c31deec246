pub mod codes;
pub mod document;
pub mod lookup;
pub mod text;

// Re-export key extraction types for convenience
pub use codes::{recognize_codes, ExtractionMetadata};
pub use document::DocumentProcessor;
pub use text::BlankTextPolicy;
