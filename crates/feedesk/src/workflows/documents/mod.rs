//! Receipts and table exports (CSV, XLSX, PDF).

mod exports;
mod pdf;
mod receipt;
mod text;

pub use exports::{
    export_records_csv, export_records_pdf, export_records_xlsx, export_roster_csv,
    export_roster_xlsx, ExportError, PDF_ROW_LIMIT,
};
pub use receipt::{FeeReceipt, ReceiptError};
pub use text::pdf_safe;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("pdf rendering failed: {0}")]
    Pdf(String),
}
