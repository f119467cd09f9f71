// Run summary rendering

use crate::export::ExportSummary;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Plain-text summary of an export run.
pub fn generate_export_report(summary: &ExportSummary) -> String {
    let mut report = String::new();
    report.push_str(DIVIDER);
    report.push_str("\n\n");

    report.push_str("# Sitemaps:\n");
    report.push_str(&format!("  Root: {}\n", summary.sitemap_url));
    report.push_str(&format!("  Sitemaps fetched: {}\n", summary.sitemaps_fetched));
    if summary.sitemaps_failed > 0 {
        report.push_str(&format!("  Sitemaps skipped (errors): {}\n", summary.sitemaps_failed));
    }
    if summary.sitemaps_skipped > 0 {
        report.push_str(&format!("  Sitemaps skipped (cap): {}\n", summary.sitemaps_skipped));
    }
    report.push_str(&format!("  Leaf URLs: {}\n", summary.leaf_urls));
    report.push('\n');

    report.push_str("# Pages:\n");
    report.push_str(&format!("  Candidates: {}\n", summary.candidates));
    report.push_str(&format!("  Fetched: {}\n", summary.pages_fetched));
    report.push_str(&format!("  Errors: {}\n", summary.page_errors));
    report.push_str(&format!("  Records extracted: {}\n", summary.records_extracted));
    report.push('\n');

    report.push_str("# Catalog:\n");
    report.push_str(&format!("  Out of stock dropped: {}\n", summary.dropped_out_of_stock));
    report.push_str(&format!("  Duplicates dropped: {}\n", summary.dropped_duplicates));
    report.push_str(&format!("  Rows written: {}\n", summary.rows_written));
    match summary.output {
        Some(ref path) => report.push_str(&format!("  Output: {}\n", path.display())),
        None => report.push_str("  Output: none\n"),
    }
    report.push_str(&format!("  Elapsed: {:.1}s\n", summary.elapsed.as_secs_f64()));

    report.push('\n');
    report.push_str(DIVIDER);
    report.push('\n');
    report
}
