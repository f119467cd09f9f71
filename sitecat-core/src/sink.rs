// Catalog output sinks

use crate::catalog::Catalog;
use crate::error::ExportError;
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub const COLUMNS: [&str; 5] = ["Title", "Price", "Currency", "In Stock", "URL"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn sink(&self) -> Box<dyn CatalogSink> {
        match self {
            ExportFormat::Xlsx => Box::new(XlsxSink),
            ExportFormat::Csv => Box::new(CsvSink),
            ExportFormat::Json => Box::new(JsonSink),
        }
    }
}

/// Writes a finished catalog to a file. Rows are written as given.
pub trait CatalogSink {
    fn write(&self, catalog: &Catalog, path: &Path) -> Result<(), ExportError>;
}

/// `yes` / `no` / empty for unknown.
pub fn render_in_stock(in_stock: Option<bool>) -> &'static str {
    match in_stock {
        Some(true) => "yes",
        Some(false) => "no",
        None => "",
    }
}

pub struct XlsxSink;

impl CatalogSink for XlsxSink {
    fn write(&self, catalog: &Catalog, path: &Path) -> Result<(), ExportError> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("catalog")?;

        for (col, name) in COLUMNS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *name, &header)?;
        }

        for (idx, record) in catalog.records().iter().enumerate() {
            let row = idx as u32 + 1;
            if let Some(ref title) = record.title {
                worksheet.write_string(row, 0, title)?;
            }
            if let Some(price) = record.price {
                worksheet.write_number(row, 1, price)?;
            }
            if let Some(ref currency) = record.currency {
                worksheet.write_string(row, 2, currency)?;
            }
            let stock = render_in_stock(record.in_stock);
            if !stock.is_empty() {
                worksheet.write_string(row, 3, stock)?;
            }
            worksheet.write_string(row, 4, &record.url)?;
        }

        worksheet.set_column_width(0, 60)?;
        worksheet.set_column_width(4, 80)?;
        workbook.save(path)?;
        Ok(())
    }
}

pub struct CsvSink;

impl CatalogSink for CsvSink {
    fn write(&self, catalog: &Catalog, path: &Path) -> Result<(), ExportError> {
        let mut writer = csv::WriterBuilder::new().from_path(path)?;
        writer.write_record(COLUMNS)?;

        for record in catalog.records() {
            let price = record.price.map(|p| p.to_string()).unwrap_or_default();
            writer.write_record([
                record.title.as_deref().unwrap_or(""),
                price.as_str(),
                record.currency.as_deref().unwrap_or(""),
                render_in_stock(record.in_stock),
                record.url.as_str(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

pub struct JsonSink;

#[derive(Serialize)]
struct JsonCatalog<'a> {
    exported_at: String,
    count: usize,
    records: &'a [sitecat_scanner::ProductRecord],
}

impl CatalogSink for JsonSink {
    fn write(&self, catalog: &Catalog, path: &Path) -> Result<(), ExportError> {
        let document = JsonCatalog {
            exported_at: chrono::Utc::now().to_rfc3339(),
            count: catalog.len(),
            records: catalog.records(),
        };
        let out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(out, &document)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_in_stock() {
        assert_eq!(render_in_stock(Some(true)), "yes");
        assert_eq!(render_in_stock(Some(false)), "no");
        assert_eq!(render_in_stock(None), "");
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(ExportFormat::default().extension(), "xlsx");
        assert_eq!(ExportFormat::from_str("CSV"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_str("pdf"), None);
    }
}
