//! School fee desk: fee-sheet ingestion, filtering and dashboard figures, defaulter risk
//! scoring, reminder dispatch, receipts and the admissions approval desk.

pub mod config;
pub mod error;
pub mod session;
pub mod telemetry;
pub mod workflows;
