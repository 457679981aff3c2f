//! CSV export of paper records.

use crate::error::{ResearchError, Result};
use crate::finder::PaperRecord;
use std::path::Path;
use tracing::info;

/// CSV column order for exported papers
pub const PAPER_COLUMNS: &[&str] = &["title", "abstract", "url", "tag", "publication_year"];

/// Write papers to `path`, header first. Nothing is written for an empty list.
pub fn save_papers_csv(path: &Path, papers: &[PaperRecord]) -> Result<()> {
    if papers.is_empty() {
        info!("No papers to save to {:?}", path);
        return Ok(());
    }

    let csv_err = |e: csv::Error| ResearchError::Io(std::io::Error::other(e));

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;

    for paper in papers {
        wtr.serialize(paper).map_err(csv_err)?;
    }

    wtr.flush()?;
    info!(count = papers.len(), "Saved papers to {:?}", path);
    Ok(())
}
