use colored::Colorize;

pub mod catalog;
pub mod error;
pub mod export;
pub mod report;
pub mod sink;

pub use catalog::{Catalog, CatalogAggregator, aggregate};
pub use error::{CoreError, ExportError, Result};
pub use export::{
    ExportOptions, ExportProgressCallback, ExportSummary, catalog_file_name, collect_catalog,
    execute_export,
};
pub use report::generate_export_report;
pub use sink::{CatalogSink, ExportFormat};

pub fn print_banner() {
    let banner = r#"
     _ _                  _
 ___(_) |_ ___  ___ __ _| |_
/ __| | __/ _ \/ __/ _` | __|
\__ \ | ||  __/ (_| (_| | |_
|___/_|\__\___|\___\__,_|\__|
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "sitemap product catalog exporter".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
