//! Bilingual prompt ladders for summary, keywords, category, and filename
//! tokens.
//!
//! Each ladder is an escalating sequence of prompts for the same field; the
//! first response with a parseable value wins. German prompts carry more
//! fallback variants because small local models drift back into prose more
//! readily in German.

use tracing::info;

use shelfmark_core::Language;
use shelfmark_extract::chunk::chunk_text;

use crate::client::LlmClient;
use crate::json::{parse_field, FieldValue};

/// Documents below this length get a single-pass summary.
const MAX_SINGLE_PASS_CHARS: usize = 15_000;
/// Chunk geometry for long-document summarization.
const SUMMARY_CHUNK_SIZE: usize = 8_000;
const SUMMARY_CHUNK_OVERLAP: usize = 1_000;
/// Inputs shorter than this are not worth a summary call.
const MIN_SUMMARY_INPUT_CHARS: usize = 50;

const JSON_RETRIES: usize = 3;

/// Try a prompt ladder until one response yields a parseable value for `key`.
async fn try_prompts_for_key(
    client: &LlmClient,
    prompts: &[String],
    key: &str,
    temperature: f64,
    lenient: bool,
) -> Option<FieldValue> {
    for (i, prompt) in prompts.iter().enumerate() {
        let response = client
            .complete_json_with_retry(prompt, temperature + i as f64 * 0.2, JSON_RETRIES)
            .await;
        if let Ok(value) = parse_field(&response, key, lenient) {
            return Some(value);
        }
    }
    None
}

fn summary_prompts(text: &str, language: Language, suggested_doc_type: Option<&str>) -> Vec<String> {
    let hint = match (language, suggested_doc_type) {
        (Language::De, Some(t)) => format!("Es handelt sich vermutlich um: {}.\n", t),
        (Language::En, Some(t)) => format!("The document is likely a: {}.\n", t),
        (_, None) => String::new(),
    };
    match language {
        Language::De => vec![
            format!(
                "Fasse den folgenden Text in 1–2 präzisen Sätzen zusammen. {}\
                 Nur reines JSON: {{\"summary\":\"...\"}}\n\n{}",
                hint, text
            ),
            format!(
                "Erstelle bitte eine 1–2 Sätze Zusammenfassung als JSON \
                 {{\"summary\":\"...\"}}, ohne weitere Erklärungen.\n\n{}",
                text
            ),
            format!(
                "Text:\n{}\n\nGib jetzt nur {{\"summary\":\"...\"}} zurück. \
                 Keine Entschuldigungen, keine Erklärungen!",
                text
            ),
            format!(
                "Achtung! Ich brauche reines JSON in der Form {{\"summary\":\"...\"}}. \
                 Hier der Text:\n\n{}",
                text
            ),
        ],
        Language::En => vec![format!(
            "Summarize the following text in 1–2 concise sentences. {}\
             Return ONLY JSON: {{\"summary\":\"...\"}}\n\n{}",
            hint, text
        )],
    }
}

/// Summarize a document. Long documents are chunked, summarized piecewise,
/// and merged by a final prompt. Returns "na" when the LLM never produces a
/// usable summary.
pub async fn document_summary(
    client: &LlmClient,
    content: &str,
    language: Language,
    suggested_doc_type: Option<&str>,
    lenient: bool,
) -> String {
    let text = content.trim();
    if text.len() < MIN_SUMMARY_INPUT_CHARS {
        return "na".to_string();
    }

    if text.len() < MAX_SINGLE_PASS_CHARS {
        let prompts = summary_prompts(text, language, suggested_doc_type);
        return match try_prompts_for_key(client, &prompts, "summary", 0.0, lenient).await {
            Some(FieldValue::Text(s)) => s,
            _ => "na".to_string(),
        };
    }

    // Long document: summarize chunks, then merge.
    let chunks = match chunk_text(text, SUMMARY_CHUNK_SIZE, SUMMARY_CHUNK_OVERLAP) {
        Ok(chunks) => chunks,
        Err(_) => return "na".to_string(),
    };
    info!("Long document ({} chars): summarizing {} chunks", text.len(), chunks.len());
    let mut partial: Vec<String> = Vec::new();
    for chunk in &chunks {
        let prompt = match language {
            Language::De => format!(
                "Fasse den folgenden Text in 1–2 kurzen Sätzen zusammen. \
                 NUR reines JSON {{\"summary\":\"...\"}}, keine Erklärungen.\n\n{}",
                chunk
            ),
            Language::En => format!(
                "Summarize the following text in 1–2 short sentences. \
                 Return ONLY {{\"summary\":\"...\"}} in JSON, no explanations.\n\n{}",
                chunk
            ),
        };
        let response = client.complete_json_with_retry(&prompt, 0.0, JSON_RETRIES).await;
        if let Ok(FieldValue::Text(s)) = parse_field(&response, "summary", lenient) {
            partial.push(s);
        }
    }

    let combined = partial.join(" ");
    if combined.trim().is_empty() {
        return "na".to_string();
    }

    let final_prompt = match language {
        Language::De => format!(
            "Hier mehrere Teilzusammenfassungen eines langen Dokuments:\n{}\n\n\
             Fasse sie in 1–2 prägnanten Sätzen zusammen. \
             Nur reines JSON {{\"summary\":\"...\"}}.\n",
            combined
        ),
        Language::En => format!(
            "Here are multiple partial summaries of a large document:\n{}\n\n\
             Combine them into 1–2 concise sentences. \
             Return ONLY {{\"summary\":\"...\"}} in JSON.\n",
            combined
        ),
    };
    let response = client
        .complete_json_with_retry(&final_prompt, 0.2, JSON_RETRIES)
        .await;
    match parse_field(&response, "summary", lenient) {
        Ok(FieldValue::Text(s)) => s,
        _ => "na".to_string(),
    }
}

/// Extract 5–7 keywords from a summary. List values and comma-separated
/// strings are both tolerated.
pub async fn document_keywords(
    client: &LlmClient,
    summary: &str,
    language: Language,
    suggested_category: Option<&str>,
    lenient: bool,
) -> Option<Vec<String>> {
    let hint = match (language, suggested_category) {
        (Language::De, Some(c)) => format!("Vermutete Kategorie: {}.\n", c),
        (Language::En, Some(c)) => format!("Likely category: {}.\n", c),
        (_, None) => String::new(),
    };
    let prompts = match language {
        Language::De => vec![
            format!(
                "Extrahiere bitte 5–7 Schlüsselwörter aus dieser Zusammenfassung.\n{}\
                 Gib ausschließlich eine Ausgabe in der Form:\n\
                 {{\"keywords\":[\"KW1\",\"KW2\",\"KW3\"]}}\n\n\
                 Jetzt bitte NUR reines JSON, sonst nichts.\n\
                 Zusammenfassung:\n{}",
                hint, summary
            ),
            format!(
                "Bitte NUR reines JSON in der Form:\n\
                 {{\"keywords\":[\"KW1\",\"KW2\"]}}\n\n\
                 Hier die Zusammenfassung:\n{}",
                summary
            ),
        ],
        Language::En => vec![format!(
            "Extract 5–7 keywords from this summary. {}Return ONLY JSON:\n\
             {{\"keywords\":[\"KW1\",\"KW2\"]}}\n\nSummary:\n{}",
            hint, summary
        )],
    };
    match try_prompts_for_key(client, &prompts, "keywords", 0.0, lenient).await? {
        FieldValue::List(items) => Some(items),
        FieldValue::Text(s) => {
            let items: Vec<String> = s
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(items)
            }
        }
    }
}

/// Classify the document from its summary and keywords. The prompt carries
/// the heuristic's top-N suggestions, or a constrained list of allowed
/// categories. Returns "na" when the LLM never answers.
pub async fn document_category(
    client: &LlmClient,
    summary: &str,
    keywords: &[String],
    language: Language,
    suggested_categories: &[String],
    allowed_categories: Option<&[String]>,
    lenient: bool,
) -> String {
    let keywords_joined = keywords.join(", ");
    let guidance = if let Some(allowed) = allowed_categories {
        match language {
            Language::De => format!(
                "Wähle GENAU EINE Kategorie aus dieser Liste: {}.\n",
                allowed.join(", ")
            ),
            Language::En => format!(
                "Choose EXACTLY ONE category from this list: {}.\n",
                allowed.join(", ")
            ),
        }
    } else if !suggested_categories.is_empty() {
        match language {
            Language::De => format!(
                "Mögliche Kategorien (Vorschläge): {}.\n",
                suggested_categories.join(", ")
            ),
            Language::En => format!(
                "Candidate categories (suggestions): {}.\n",
                suggested_categories.join(", ")
            ),
        }
    } else {
        String::new()
    };

    let prompts = match language {
        Language::De => {
            let base_text = format!("Zusammenfassung:\n{}\nKeywords:{}", summary, keywords_joined);
            vec![
                format!(
                    "Bestimme eine sinnvolle Kategorie als reines JSON.\n{}\
                     Gib nur: {{\"category\":\"...\"}}\n\n\
                     Keine weiteren Erklärungen, nur JSON. Text:\n{}",
                    guidance, base_text
                ),
                format!("Bitte nur {{\"category\":\"...\"}} - ohne Zusätze:\n{}", base_text),
            ]
        }
        Language::En => {
            let base_text = format!("Summary:\n{}\nKeywords:{}", summary, keywords_joined);
            vec![format!(
                "Determine a suitable category. {}Return ONLY JSON: \
                 {{\"category\":\"...\"}}\n\nText:\n{}",
                guidance, base_text
            )]
        }
    };

    match try_prompts_for_key(client, &prompts, "category", 0.0, lenient).await {
        Some(FieldValue::Text(s)) => s,
        _ => "na".to_string(),
    }
}

/// Condense summary + keywords + category into up to 5 short filename
/// tokens. Comma-separated string values are expected and split.
pub async fn final_summary_tokens(
    client: &LlmClient,
    summary: &str,
    keywords: &[String],
    category: &str,
    language: Language,
    lenient: bool,
) -> Option<Vec<String>> {
    let kw_str = keywords.join(", ");
    let base_text = match language {
        Language::De => format!(
            "Zusammenfassung: {}\nSchlagworte: {}\nKategorie: {}",
            summary, kw_str, category
        ),
        Language::En => format!(
            "Summary: {}\nKeywords: {}\nCategory: {}",
            summary, kw_str, category
        ),
    };
    let prompts = match language {
        Language::De => vec![
            format!(
                "Erstelle bitte bis zu 5 Stichworte (kurz! 1–2 Wörter pro Stichwort) \
                 als reines JSON.\n\
                 {{\"final_summary\":\"stichwort1,stichwort2\"}}\n\n\
                 WICHTIG: Keine Sätze, nur Stichworte. Nur JSON.\n\n{}",
                base_text
            ),
            format!(
                "Bitte nur reines JSON {{\"final_summary\":\"stichwort1,stichwort2\"}}. \
                 Max. 5 Stichworte, keine Sätze!\n\n{}",
                base_text
            ),
        ],
        Language::En => vec![format!(
            "Return up to 5 short keywords (1–2 words each) as JSON:\n\
             {{\"final_summary\":\"kw1,kw2\"}}\n\nOnly JSON.\n\n{}",
            base_text
        )],
    };

    let value = try_prompts_for_key(client, &prompts, "final_summary", 0.0, lenient).await?;
    let tokens: Vec<String> = match value {
        FieldValue::Text(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        FieldValue::List(items) => items,
    };
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.into_iter().take(5).collect())
    }
}
