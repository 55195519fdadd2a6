//! Markdown summary of a run.
//!
//! A pure function of the outcomes, the stats and the published document.
//! It is the only artifact that contains the access token, since the token
//! is required to edit the page later.

use crate::output::{PublishedDocument, RunStats, UploadOutcome};
use std::fmt::Write;

/// Render the human-readable summary document.
pub fn render_summary(
    title: &str,
    outcomes: &[UploadOutcome],
    stats: &RunStats,
    document: Option<&PublishedDocument>,
) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# {}\n", escape_inline(title));

    match document {
        Some(doc) => {
            let _ = writeln!(md, "- **Page:** <{}>", doc.url);
            let _ = writeln!(md, "- **Path:** `{}`", doc.path);
            let _ = writeln!(md, "- **Access token:** `{}`", doc.access_token);
        }
        None => {
            let _ = writeln!(md, "- **Page:** not created (no image uploaded successfully)");
        }
    }
    let _ = writeln!(
        md,
        "- **Uploaded:** {}/{}{}",
        stats.succeeded,
        stats.total,
        if stats.resumed { " (from checkpoint)" } else { "" }
    );
    md.push('\n');

    let succeeded: Vec<&UploadOutcome> = outcomes.iter().filter(|o| o.is_success()).collect();
    if !succeeded.is_empty() {
        md.push_str("## Images\n\n");
        md.push_str("| # | File | URL | Retries |\n");
        md.push_str("|---|------|-----|---------|\n");
        for (i, o) in succeeded.iter().enumerate() {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} |",
                i + 1,
                escape_cell(&o.filename),
                o.url.as_deref().unwrap_or(""),
                o.retries
            );
        }
        md.push('\n');
    }

    let failed: Vec<&UploadOutcome> = outcomes.iter().filter(|o| !o.is_success()).collect();
    if !failed.is_empty() {
        md.push_str("## Failed\n\n");
        for o in failed {
            let _ = writeln!(
                md,
                "- `{}`: {}",
                o.filename,
                o.error.as_deref().unwrap_or("unknown error")
            );
        }
        md.push('\n');
    }

    while md.ends_with("\n\n") {
        md.pop();
    }
    md
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

fn escape_inline(s: &str) -> String {
    s.replace('\n', " ")
}
