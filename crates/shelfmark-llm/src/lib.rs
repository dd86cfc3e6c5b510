//! Shelfmark LLM — completion client and prompt ladders.
//!
//! The LLM is used purely as a zero-shot oracle behind a retry/parsing shim:
//! `client` wraps a local completions endpoint with temperature-escalating
//! retries, `json` recovers JSON objects from messy free-form responses,
//! `prompts` holds the bilingual prompt sequences for summary / keywords /
//! category / filename tokens.

pub mod client;
pub mod json;
pub mod prompts;

pub use client::LlmClient;
pub use json::{extract_json_object, parse_field, FieldParseError, FieldValue};
