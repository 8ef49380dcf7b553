pub mod admissions;
pub mod documents;
pub mod fees;
pub mod notifications;
pub mod risk;
