//! The per-document processing pipeline.
//!
//! Extraction and analysis run concurrently with bounded workers; the rename
//! phase is sequential so interactive confirmation and collision handling
//! stay deterministic. A failing document never aborts the batch — it
//! degrades to an "unknown" category and a date-only fallback name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use futures::StreamExt;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use shelfmark_classify::alias::is_placeholder;
use shelfmark_classify::{
    display_category, resolve_category, AliasTable, ResolveOptions, ScoreOptions, Scorer,
    ScorerCache, UNKNOWN_CATEGORY,
};
use shelfmark_core::{data_path, resolve_data_dir, Error, RenamerConfig, Result};
use shelfmark_embed::{create_similarity, SimilarityBackend};
use shelfmark_extract::text::split_to_tokens;
use shelfmark_extract::{
    derive_date, extract_structured_fields, normalize_keywords, pdf_metadata, pdf_to_text,
    pdf_to_text_with_ocr, subtract_tokens, Stopwords, StopwordsCache, StructuredFields,
};
use shelfmark_llm::prompts::{
    document_category, document_keywords, document_summary, final_summary_tokens,
};
use shelfmark_llm::LlmClient;
use shelfmark_rename::{
    apply_rename, build_filename, is_already_named, write_plan_file, FilenameParts, PlanEntry,
    RenameOptions, RenameOutcome,
};

use crate::export;
use crate::interactive::{self, Decision};

const RULES_FILE: &str = "heuristic_scores.json";
const ALIASES_FILE: &str = "category_aliases.json";
const STOPWORDS_FILE: &str = "meta_stopwords.json";

/// Which classifier decided the final category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Only the heuristic had an opinion (or the LLM was disabled).
    Heuristic,
    /// Only the LLM had an opinion.
    Llm,
    /// Both had opinions; the resolver arbitrated.
    Combined,
    /// High-confidence heuristic shortcut; the LLM was never asked.
    Override,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Heuristic => "heuristic",
            Provenance::Llm => "llm",
            Provenance::Combined => "combined",
            Provenance::Override => "override",
        }
    }
}

/// Per-document export record.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub source: PathBuf,
    pub target: PathBuf,
    pub applied: bool,
    pub date: String,
    pub category: String,
    pub provenance: Provenance,
    pub heuristic_score: f64,
    pub summary: String,
    pub keywords: Vec<String>,
}

/// Analysis result for one document, before any filesystem change.
struct Analysis {
    source: PathBuf,
    target_name: String,
    date: String,
    category: String,
    provenance: Provenance,
    heuristic_score: f64,
    summary: String,
    keywords: Vec<String>,
}

pub struct Pipeline {
    config: RenamerConfig,
    rules_path: PathBuf,
    stopwords_path: PathBuf,
    scorers: ScorerCache,
    stopword_cache: StopwordsCache,
    aliases: AliasTable,
    similarity: Arc<dyn SimilarityBackend>,
    llm: Option<LlmClient>,
}

impl Pipeline {
    pub fn new(config: RenamerConfig) -> Result<Self> {
        let aliases = AliasTable::load(&data_path(ALIASES_FILE))?;
        let similarity = create_similarity(&resolve_data_dir().join("models"));
        let llm = if config.use_llm {
            Some(LlmClient::new(&config.llm_settings()))
        } else {
            None
        };
        Ok(Self {
            config,
            rules_path: data_path(RULES_FILE),
            stopwords_path: data_path(STOPWORDS_FILE),
            scorers: ScorerCache::new(),
            stopword_cache: StopwordsCache::new(),
            aliases,
            similarity,
            llm,
        })
    }

    pub fn config(&self) -> &RenamerConfig {
        &self.config
    }

    fn build_glob_set(patterns: &[String]) -> Result<Option<GlobSet>> {
        if patterns.is_empty() {
            return Ok(None);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Config(format!("invalid glob pattern {pattern:?}: {e}")))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid glob patterns: {e}")))?;
        Ok(Some(set))
    }

    /// Collect candidate PDFs under `root`, newest mtime first.
    pub fn collect_pdfs(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "{} is neither a file nor a directory",
                root.display()
            )));
        }
        let include = Self::build_glob_set(&self.config.include_patterns)?;
        let exclude = Self::build_glob_set(&self.config.exclude_patterns)?;

        let mut walker = WalkDir::new(root);
        if !self.config.recursive {
            walker = walker.max_depth(1);
        } else if self.config.max_depth > 0 {
            walker = walker.max_depth(self.config.max_depth);
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_pdf = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
            if !is_pdf {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(include) = &include {
                if !include.is_match(name) {
                    continue;
                }
            }
            if let Some(exclude) = &exclude {
                if exclude.is_match(name) {
                    debug!("Excluded by pattern: {}", path.display());
                    continue;
                }
            }
            if self.config.skip_if_already_named && is_already_named(name) {
                debug!("Already named, skipping: {}", path.display());
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort_by_cached_key(|p| {
            std::cmp::Reverse(
                std::fs::metadata(p)
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::UNIX_EPOCH),
            )
        });
        Ok(files)
    }

    /// Process every PDF under `root`.
    pub async fn run(&self, root: &Path) -> Result<Vec<DocumentRecord>> {
        let files = self.collect_pdfs(root)?;
        info!("Found {} PDF(s) to process", files.len());
        self.run_files(files).await
    }

    /// Process a known file list: concurrent analysis, sequential renames.
    pub async fn run_files(&self, files: Vec<PathBuf>) -> Result<Vec<DocumentRecord>> {
        // Data-file problems are configuration errors; surface them before any work
        let scorer = self
            .scorers
            .get_or_load(&self.rules_path, self.config.language)?;
        let stopwords = self.stopword_cache.get_or_load(&self.stopwords_path)?;

        let workers = self.config.workers.max(1);
        let analyses: Vec<Analysis> = futures::stream::iter(files.into_iter())
            .map(|path| {
                let scorer = Arc::clone(&scorer);
                let stopwords = Arc::clone(&stopwords);
                async move { self.analyze(&scorer, &stopwords, &path).await }
            })
            .buffered(workers)
            .collect()
            .await;

        let rename_opts = RenameOptions {
            dry_run: self.config.dry_run,
            backup_dir: self.config.backup_dir.as_deref(),
            undo_log: self.config.rename_log_path.as_deref(),
            write_pdf_title: self.config.write_pdf_metadata,
        };

        let mut records: Vec<DocumentRecord> = Vec::new();
        let mut plan: Vec<PlanEntry> = Vec::new();
        for analysis in analyses {
            let mut target_name = analysis.target_name.clone();
            if self.config.interactive {
                match interactive::confirm(&analysis.source, &target_name)? {
                    Decision::Yes => {}
                    Decision::No => {
                        info!("Skipped by user: {}", analysis.source.display());
                        records.push(analysis.to_record(analysis.source.clone(), false));
                        continue;
                    }
                    Decision::Edit(name) => target_name = name,
                }
            }
            info!(
                "{}: category={} ({}), score={:.2}",
                analysis.source.display(),
                analysis.category,
                analysis.provenance.as_str(),
                analysis.heuristic_score
            );
            let (target, applied) = match apply_rename(&analysis.source, &target_name, &rename_opts)
            {
                Ok(RenameOutcome::Renamed(target)) => (target, true),
                Ok(RenameOutcome::Planned(target)) => (target, false),
                Ok(RenameOutcome::Unchanged) => (analysis.source.clone(), false),
                Err(e) => {
                    error!("Rename failed for {}: {}", analysis.source.display(), e);
                    (analysis.source.clone(), false)
                }
            };
            plan.push(PlanEntry {
                source: analysis.source.clone(),
                target: target.clone(),
                applied,
            });
            records.push(analysis.to_record(target, applied));
        }

        if let Some(plan_path) = &self.config.plan_file_path {
            write_plan_file(plan_path, &plan)?;
            info!("Wrote rename plan to {}", plan_path.display());
        }
        if let Some(export_path) = &self.config.export_metadata_path {
            export::write_records(export_path, &records)?;
            info!("Exported metadata to {}", export_path.display());
        }
        Ok(records)
    }

    /// Analyze one document. Infallible: extraction failures degrade to an
    /// empty text, which flows through as "unknown"/"na" everywhere.
    async fn analyze(&self, scorer: &Scorer, stopwords: &Stopwords, path: &Path) -> Analysis {
        let config = &self.config;
        // PDF parsing and the OCR subprocess are synchronous; run them on
        // the blocking pool so the worker stream keeps polling
        let blocking_path = path.to_path_buf();
        let use_ocr = config.use_ocr;
        let max_chars = config.max_extract_chars;
        let ocr_min_chars = config.ocr_min_chars;
        let want_metadata = config.use_pdf_metadata_for_date;
        let (text, metadata, mtime) = tokio::task::spawn_blocking(move || {
            let text = if use_ocr {
                pdf_to_text_with_ocr(&blocking_path, max_chars, ocr_min_chars)
            } else {
                pdf_to_text(&blocking_path, max_chars)
            };
            let text = match text {
                Ok(text) => text,
                Err(e) => {
                    warn!("Extraction failed for {}: {}", blocking_path.display(), e);
                    String::new()
                }
            };
            let metadata = want_metadata.then(|| pdf_metadata(&blocking_path));
            let mtime: Option<DateTime<Local>> = std::fs::metadata(&blocking_path)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::from);
            (text, metadata, mtime)
        })
        .await
        .unwrap_or_else(|e| {
            warn!("Extraction task failed for {}: {}", path.display(), e);
            (String::new(), None, None)
        });

        let date = derive_date(
            &text,
            config.date_locale,
            config.date_prefer_leading_chars,
            metadata.as_ref(),
            config.use_pdf_metadata_for_date,
            mtime,
        );

        let slice = config.heuristic_slice(&text);
        let score_opts = ScoreOptions {
            language: Some(config.language),
            title_weight_region: config.title_weight_region,
            title_weight_factor: config.title_weight_factor,
            max_score_per_category: config.max_score_per_category,
        };
        let classification =
            scorer.best_category_with_confidence(slice, &score_opts, config.min_heuristic_score_gap);

        let skip_llm = match (
            config.skip_llm_category_if_heuristic_score_ge,
            config.skip_llm_category_if_heuristic_gap_ge,
        ) {
            (Some(min_score), Some(min_gap)) => {
                !classification.is_unknown()
                    && classification.score >= min_score
                    && classification.gap() >= min_gap
            }
            _ => false,
        };

        let mut summary = "na".to_string();
        let mut keywords: Vec<String> = Vec::new();
        let mut summary_tokens: Vec<String> = Vec::new();
        let final_category;
        let provenance;

        if skip_llm {
            debug!(
                "Heuristic confident enough (score {:.2}, gap {:.2}); skipping LLM",
                classification.score,
                classification.gap()
            );
            final_category = classification.category.clone();
            provenance = Provenance::Override;
        } else if let Some(client) = &self.llm {
            let lenient = config.lenient_llm_json;
            let hint = (!classification.is_unknown()).then_some(classification.category.as_str());
            summary = document_summary(client, &text, config.language, hint, lenient).await;
            if let Some(raw) =
                document_keywords(client, &summary, config.language, hint, lenient).await
            {
                keywords = normalize_keywords(&raw);
            }

            let suggested =
                scorer.top_n_categories(slice, config.heuristic_suggestions_top_n, &score_opts);
            let allowed: Option<Vec<String>> = if config.use_constrained_llm_category {
                Some(scorer.rules().all_categories().into_iter().collect())
            } else {
                None
            };
            let mut llm_raw = document_category(
                client,
                &summary,
                &keywords,
                config.language,
                &suggested,
                allowed.as_deref(),
                lenient,
            )
            .await;
            if let Some(allowed) = &allowed {
                let normalized = self.aliases.normalize(&llm_raw);
                if !is_placeholder(&normalized) && !allowed.contains(&normalized) {
                    debug!(
                        "LLM category {:?} outside the allowed set; treating as unknown",
                        llm_raw
                    );
                    llm_raw = UNKNOWN_CATEGORY.to_string();
                }
            }

            let context = format!("{} {}", summary, keywords.join(" "));
            let resolve_opts = ResolveOptions {
                prefer_llm_on_conflict: config.prefer_llm_category,
                heuristic_score: (!classification.is_unknown()).then_some(classification.score),
                heuristic_gap: (!classification.is_unknown()).then(|| classification.gap()),
                min_heuristic_score: config.min_heuristic_score,
                override_min_score: config.heuristic_override_min_score,
                override_min_gap: config.heuristic_override_min_gap,
                score_weight: config.heuristic_score_weight,
                overlap_context: Some(context.as_str()),
                use_keyword_overlap: config.use_keyword_overlap_for_category,
                use_embedding_similarity: config.use_embeddings_for_conflict,
                parent_map: scorer.rules().parent_map(),
                aliases: &self.aliases,
                similarity: config
                    .use_embeddings_for_conflict
                    .then_some(self.similarity.as_ref()),
            };
            final_category = resolve_category(&llm_raw, &classification.category, &resolve_opts);
            let llm_normalized = self.aliases.normalize(&llm_raw);
            provenance = if is_placeholder(&llm_normalized) {
                Provenance::Heuristic
            } else if classification.is_unknown() {
                Provenance::Llm
            } else {
                Provenance::Combined
            };

            if summary != "na" {
                if let Some(tokens) = final_summary_tokens(
                    client,
                    &summary,
                    &keywords,
                    &final_category,
                    config.language,
                    lenient,
                )
                .await
                {
                    summary_tokens = tokens;
                }
            }
        } else {
            final_category = classification.category.clone();
            provenance = Provenance::Heuristic;
        }

        let display = display_category(&final_category, config.category_display, scorer.rules());

        // Keep filename tokens from repeating the category or keywords
        summary_tokens = stopwords.filter_tokens(&summary_tokens);
        summary_tokens = subtract_tokens(&summary_tokens, &keywords);
        summary_tokens = subtract_tokens(&summary_tokens, &split_to_tokens(&display));

        let fields: Option<StructuredFields> = if config.use_structured_fields {
            Some(extract_structured_fields(&text))
        } else {
            None
        };

        let parts = FilenameParts {
            date: &date,
            project: &config.project,
            category: &display,
            keywords: &keywords,
            summary_tokens: &summary_tokens,
            version: &config.version,
            fields: fields.as_ref(),
        };
        let target_name = build_filename(
            &parts,
            config.desired_case,
            config.filename_template.as_deref(),
            config.max_filename_chars,
        );

        Analysis {
            source: path.to_path_buf(),
            target_name,
            date,
            category: display,
            provenance,
            heuristic_score: classification.score,
            summary,
            keywords,
        }
    }
}

impl Analysis {
    fn to_record(&self, target: PathBuf, applied: bool) -> DocumentRecord {
        DocumentRecord {
            source: self.source.clone(),
            target,
            applied,
            date: self.date.clone(),
            category: self.category.clone(),
            provenance: self.provenance,
            heuristic_score: self.heuristic_score,
            summary: self.summary.clone(),
            keywords: self.keywords.clone(),
        }
    }
}
