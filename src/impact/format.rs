//! Text and JSON rendering of impact reports

use std::path::Path;

use crate::signature::{class_name_from_path, relative_path};

use super::types::ImpactReport;

/// Numbered listing, one item per line: `1) item`.
pub fn numbered_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        out.push_str(&format!("{}) {}\n", i + 1, item.as_ref()));
    }
    out
}

/// Changed method signatures as a numbered listing.
pub fn changed_listing(report: &ImpactReport) -> String {
    numbered_list(report.changed.iter().map(|c| c.signature.as_str()))
}

/// Affected test methods as a numbered listing of `Class.method`. Methods
/// without a declaring class are listed under their file's name.
pub fn tests_listing(report: &ImpactReport) -> String {
    numbered_list(report.tests.iter().map(|t| {
        match t.class_name.as_deref().or_else(|| class_name_from_path(&t.file)) {
            Some(class) => format!("{}.{}", class, t.method_name),
            None => t.method_name.clone(),
        }
    }))
}

/// Serialize a report with file paths relative to `root`.
pub fn report_to_json(report: &ImpactReport, root: &Path) -> serde_json::Value {
    let tests: Vec<_> = report
        .tests
        .iter()
        .map(|t| {
            serde_json::json!({
                "signature": t.signature,
                "class": t.class_name,
                "method": t.method_name,
                "file": relative_path(&t.file, root),
                "line": t.line,
                "depth": t.depth,
            })
        })
        .collect();

    serde_json::json!({
        "baseline": report.baseline,
        "changed": report.changed,
        "tests": tests,
        "changed_count": report.changed.len(),
        "test_count": report.tests.len(),
        "files_scanned": report.files_scanned,
    })
}
