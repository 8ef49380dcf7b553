use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::payment::PaymentQr;

/// Stable key of a fee record inside one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One student row of the uploaded fee sheet after typing and link generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
    pub id: RecordId,
    pub student_id: Option<String>,
    pub name: String,
    pub class: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub dues: Decimal,
    pub past_delay_count: Option<u32>,
    pub city: Option<String>,
    pub defaulter: Option<bool>,
    pub payment_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_qr: Option<PaymentQr>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl FeeRecord {
    /// A due record is one with an outstanding (strictly positive) balance.
    pub fn is_due(&self) -> bool {
        self.dues > Decimal::ZERO
    }

    pub fn class_label(&self) -> &str {
        self.class.as_deref().unwrap_or("")
    }

    pub fn dues_display(&self) -> String {
        format_amount(self.dues)
    }

    /// Cell text for a column of the sheet, used by exports and receipts.
    pub fn value_for(&self, column: &Column) -> String {
        match column.role {
            ColumnRole::StudentId => self.student_id.clone().unwrap_or_default(),
            ColumnRole::StudentName => self.name.clone(),
            ColumnRole::Class => self.class.clone().unwrap_or_default(),
            ColumnRole::Email => self.email.clone(),
            ColumnRole::Phone => self.phone.clone().unwrap_or_default(),
            ColumnRole::Location => self.city.clone().unwrap_or_default(),
            ColumnRole::Dues => self.dues_display(),
            ColumnRole::PastDelayCount => self
                .past_delay_count
                .map(|count| count.to_string())
                .unwrap_or_default(),
            ColumnRole::Defaulter => match self.defaulter {
                Some(true) => "1".to_string(),
                Some(false) => "0".to_string(),
                None => String::new(),
            },
            ColumnRole::Extra => self.extra.get(&column.header).cloned().unwrap_or_default(),
        }
    }
}

/// Render an amount without trailing zeros (`500.00` → `500`).
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Typed meaning of a sheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    StudentId,
    StudentName,
    Class,
    Email,
    Phone,
    Location,
    Dues,
    PastDelayCount,
    Defaulter,
    Extra,
}

impl ColumnRole {
    /// Header used when a column is introduced by an edit rather than by the upload.
    pub const fn default_header(self) -> &'static str {
        match self {
            Self::StudentId => "Student ID",
            Self::StudentName => "Student Name",
            Self::Class => "Class",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Location => "City",
            Self::Dues => "Total Payment Dues",
            Self::PastDelayCount => "Past Delay Count",
            Self::Defaulter => "Defaulter",
            Self::Extra => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub header: String,
    pub role: ColumnRole,
}

/// Ordered columns of the uploaded sheet with their recognized roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    columns: Vec<Column>,
}

impl ColumnLayout {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has(&self, role: ColumnRole) -> bool {
        role != ColumnRole::Extra && self.columns.iter().any(|column| column.role == role)
    }

    pub fn header_for(&self, role: ColumnRole) -> Option<&str> {
        self.columns
            .iter()
            .find(|column| column.role == role)
            .map(|column| column.header.as_str())
    }

    pub(crate) fn position(&self, role: ColumnRole) -> Option<usize> {
        self.columns.iter().position(|column| column.role == role)
    }

    pub fn extra_headers(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|column| column.role == ColumnRole::Extra)
            .map(|column| column.header.as_str())
    }

    pub(crate) fn ensure(&mut self, role: ColumnRole) {
        if role != ColumnRole::Extra && !self.has(role) {
            self.columns.push(Column {
                header: role.default_header().to_string(),
                role,
            });
        }
    }

    pub(crate) fn ensure_extra(&mut self, header: &str) {
        if !self.columns.iter().any(|column| column.header == header) {
            self.columns.push(Column {
                header: header.to_string(),
                role: ColumnRole::Extra,
            });
        }
    }
}

/// Field values of a row before it receives an id and payment link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub dues: Decimal,
    #[serde(default)]
    pub past_delay_count: Option<u32>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub defaulter: Option<bool>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// Partial update applied by the in-app editor. Empty strings clear optional fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordEdit {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub dues: Option<Decimal>,
    #[serde(default)]
    pub past_delay_count: Option<u32>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub defaulter: Option<bool>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
