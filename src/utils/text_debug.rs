// src/utils/text_debug.rs
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extractors::codes::find_all_matches;

/// Saves the extracted text of a document for inspection.
pub fn save_debug_text(text: &str, dir: &Path, stem: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.txt", stem));
    fs::write(&path, text)?;
    tracing::info!("Saved extracted text to {}", path.display());
    Ok(path)
}

/// Renders every pattern hit (duplicates included) with its offsets and
/// surrounding context, one block per match.
pub fn render_match_report(text: &str) -> String {
    let matches = find_all_matches(text);
    let mut report = String::new();
    let _ = writeln!(report, "{} raw matches", matches.len());

    for m in &matches {
        let context = m.context(text).replace(['\n', '\r'], " ");
        let _ = writeln!(
            report,
            "\n[{}] {} @ {}..{}\n    {}",
            m.code_type,
            m.code,
            m.start,
            m.end,
            context.trim()
        );
    }
    report
}

/// Writes [`render_match_report`] next to the saved text.
pub fn save_match_report(text: &str, dir: &Path, stem: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_matches.txt", stem));
    fs::write(&path, render_match_report(text))?;
    tracing::info!("Saved match report to {}", path.display());
    Ok(path)
}
