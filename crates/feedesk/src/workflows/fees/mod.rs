//! Fee records: sheet ingestion, the in-memory record store, filtering and dashboard figures.

pub mod domain;
pub mod filter;
pub mod ingest;
pub mod payment;
pub mod store;
pub mod summary;

pub use domain::{
    format_amount, Column, ColumnLayout, ColumnRole, FeeRecord, NewRecord, RecordEdit, RecordId,
};
pub use filter::{compare_classes, due_records, DuesRange, FeeFilter, FilterOptions};
pub use ingest::{FeeImporter, IngestionError};
pub use payment::{PaymentLinker, PaymentQr, QrError};
pub use store::{EditError, RecordStore};
pub use summary::{CityDues, ClassDues, FeeSummary, MissingValues};
