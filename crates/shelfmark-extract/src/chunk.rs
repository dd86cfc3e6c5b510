//! Forward-window text chunking for long-document summarization.

use shelfmark_core::{Error, Result};

/// Split text into overlapping forward windows.
///
/// `chunk_size` must be positive and `overlap` must satisfy
/// `0 <= overlap < chunk_size`; violations are configuration errors.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(Error::Config("chunk_size must be > 0".to_string()));
    }
    if overlap >= chunk_size {
        return Err(Error::Config("overlap must be < chunk_size".to_string()));
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }
    Ok(chunks)
}
