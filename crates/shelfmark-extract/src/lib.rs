//! Shelfmark Extract — PDF collaborator, date derivation, token utilities.

pub mod chunk;
pub mod date;
pub mod fields;
pub mod pdf;
pub mod stopwords;
pub mod text;

pub use date::derive_date;
pub use fields::{extract_structured_fields, StructuredFields};
pub use pdf::{pdf_metadata, pdf_to_text, pdf_to_text_with_ocr, PdfMetadata};
pub use stopwords::{Stopwords, StopwordsCache};
pub use text::{clean_token, convert_case, normalize_keywords, split_to_tokens, subtract_tokens};
