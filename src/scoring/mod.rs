//! Score extraction and batch summaries.

pub mod extractor;
pub mod report;

pub use extractor::{extract_score, score_record, ExtractedScore};
pub use report::{export, score_file, score_sheet, summarize_folder, FolderSummary, ScoredSheet, SummaryRow};
