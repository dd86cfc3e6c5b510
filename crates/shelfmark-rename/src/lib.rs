//! Shelfmark Rename — filename assembly and safe rename mechanics.

pub mod filename;
pub mod ops;

pub use filename::{build_filename, is_already_named, sanitize_filename_base, FilenameParts};
pub use ops::{
    apply_rename, append_undo_log, write_pdf_title, write_plan_file, PlanEntry, RenameOptions,
    RenameOutcome,
};
