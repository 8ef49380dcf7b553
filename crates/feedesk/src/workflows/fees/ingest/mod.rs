mod columns;
mod parser;

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::domain::{non_blank, ColumnLayout, ColumnRole, NewRecord};
use super::payment::PaymentLinker;
use super::store::{EditError, RecordStore};
use parser::{RawRow, RawTable};

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("required column '{column}' is missing from the uploaded sheet")]
    MissingColumn { column: &'static str },
    #[error("the sheet needs a 'Student ID' or 'Student Name' column")]
    MissingIdentityColumn,
    #[error("row {row} has neither a student id nor a student name")]
    MissingIdentity { row: usize },
    #[error("unsupported file '{file_name}': upload a .csv or .xlsx sheet")]
    UnsupportedFormat { file_name: String },
    #[error("row {row}: '{value}' is not a valid value for '{column}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("row {row}: dues cannot be negative (found {value})")]
    NegativeDues { row: usize, value: String },
    #[error("the workbook has no worksheet with a header row")]
    EmptyWorkbook,
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns an uploaded fee sheet into a [`RecordStore`].
pub struct FeeImporter;

impl FeeImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        linker: &PaymentLinker,
    ) -> Result<RecordStore, IngestionError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&file_name, bytes, linker)
    }

    /// Format is picked from the file extension, the way the upload widget does it.
    pub fn from_bytes(
        file_name: &str,
        bytes: Vec<u8>,
        linker: &PaymentLinker,
    ) -> Result<RecordStore, IngestionError> {
        let extension = Path::new(file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

        let table = match extension.as_deref() {
            Some("csv") => parser::read_csv(bytes.as_slice())?,
            Some("xlsx") => parser::read_xlsx(bytes)?,
            _ => {
                return Err(IngestionError::UnsupportedFormat {
                    file_name: file_name.to_string(),
                })
            }
        };

        let store = build_store(table, linker)?;
        info!(
            file = file_name,
            records = store.len(),
            due = store.records().iter().filter(|record| record.is_due()).count(),
            "fee sheet imported"
        );
        Ok(store)
    }

    pub fn from_csv_reader<R: Read>(
        reader: R,
        linker: &PaymentLinker,
    ) -> Result<RecordStore, IngestionError> {
        build_store(parser::read_csv(reader)?, linker)
    }
}

fn build_store(table: RawTable, linker: &PaymentLinker) -> Result<RecordStore, IngestionError> {
    let layout = columns::resolve_layout(&table.headers)?;

    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (index, header) in table.headers.iter().enumerate() {
        positions.entry(header.as_str()).or_insert(index);
    }

    let mut store = RecordStore::new(layout.clone(), linker.clone());
    for row in &table.rows {
        let new_record = RowReader {
            layout: &layout,
            positions: &positions,
            row,
        }
        .read()?;

        store.insert(new_record).map_err(|err| match err {
            EditError::NegativeDues { value } => IngestionError::NegativeDues {
                row: row.number,
                value,
            },
            _ => IngestionError::MissingIdentity { row: row.number },
        })?;
    }

    Ok(store)
}

struct RowReader<'a> {
    layout: &'a ColumnLayout,
    positions: &'a HashMap<&'a str, usize>,
    row: &'a RawRow,
}

impl RowReader<'_> {
    fn read(&self) -> Result<NewRecord, IngestionError> {
        let student_id = self.text(ColumnRole::StudentId);
        let name = self.text(ColumnRole::StudentName);
        if student_id.is_none() && name.is_none() {
            return Err(IngestionError::MissingIdentity {
                row: self.row.number,
            });
        }

        let mut extra = BTreeMap::new();
        for header in self.layout.extra_headers() {
            if let Some(value) = self.cell(header).and_then(non_blank) {
                extra.insert(header.to_string(), value);
            }
        }

        Ok(NewRecord {
            name: name.or_else(|| student_id.clone()).unwrap_or_default(),
            student_id,
            class: self.text(ColumnRole::Class),
            email: self.text(ColumnRole::Email).unwrap_or_default(),
            phone: self.text(ColumnRole::Phone),
            dues: self.dues()?,
            past_delay_count: self.past_delay_count()?,
            city: self.text(ColumnRole::Location),
            defaulter: self.defaulter()?,
            extra,
        })
    }

    fn cell(&self, header: &str) -> Option<&str> {
        self.positions
            .get(header)
            .map(|index| self.row.cell(*index))
    }

    fn raw(&self, role: ColumnRole) -> Option<(&str, &str)> {
        let header = self.layout.header_for(role)?;
        self.cell(header).map(|value| (header, value))
    }

    fn text(&self, role: ColumnRole) -> Option<String> {
        self.raw(role).and_then(|(_, value)| non_blank(value))
    }

    fn invalid(&self, column: &str, value: &str) -> IngestionError {
        IngestionError::InvalidValue {
            row: self.row.number,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    fn dues(&self) -> Result<Decimal, IngestionError> {
        let (header, value) = self.raw(ColumnRole::Dues).unwrap_or(("Total Payment Dues", ""));
        if value.trim().is_empty() {
            warn!(row = self.row.number, column = header, "blank dues cell read as zero");
            return Ok(Decimal::ZERO);
        }
        let amount = parse_amount(value).ok_or_else(|| self.invalid(header, value))?;
        if amount < Decimal::ZERO {
            return Err(IngestionError::NegativeDues {
                row: self.row.number,
                value: value.to_string(),
            });
        }
        Ok(amount)
    }

    fn past_delay_count(&self) -> Result<Option<u32>, IngestionError> {
        let Some((header, value)) = self.raw(ColumnRole::PastDelayCount) else {
            return Ok(None);
        };
        if value.trim().is_empty() {
            return Ok(None);
        }
        parse_count(value)
            .map(Some)
            .ok_or_else(|| self.invalid(header, value))
    }

    fn defaulter(&self) -> Result<Option<bool>, IngestionError> {
        let Some((header, value)) = self.raw(ColumnRole::Defaulter) else {
            return Ok(None);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "1" | "true" | "yes" | "y" => Ok(Some(true)),
            "0" | "false" | "no" | "n" => Ok(Some(false)),
            _ => Err(self.invalid(header, value)),
        }
    }
}

/// Accepts `₹1,200.50`, `1200` and `1 200`.
pub(crate) fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '₹' && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

fn parse_count(raw: &str) -> Option<u32> {
    let value = Decimal::from_str(raw.trim()).ok()?;
    if !value.fract().is_zero() {
        return None;
    }
    value.normalize().to_u32()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://pay.example/pay?student_id=";

    fn import(csv: &str) -> Result<RecordStore, IngestionError> {
        FeeImporter::from_csv_reader(csv.as_bytes(), &PaymentLinker::new(BASE))
    }

    #[test]
    fn imports_typed_records_with_links() {
        let store = import(
            "Student ID,Student Name,Class,Email,Parent Phone,Total Payment Dues (₹),Past Delay Count,City,Defaulter,Hostel\n\
             S1,Asha Verma,2,asha@x.com,+91 98765 43210,\"₹1,200\",2,Pune,yes,Block A\n\
             ,Ravi Kumar,10.0,ravi@x.com,,0,0.0,Nagpur,0,\n",
        )
        .expect("sheet imports");

        let records = store.records();
        assert_eq!(records.len(), 2);

        let asha = &records[0];
        assert_eq!(asha.id.0, "S1");
        assert_eq!(asha.dues, Decimal::new(1200, 0));
        assert_eq!(asha.past_delay_count, Some(2));
        assert_eq!(asha.defaulter, Some(true));
        assert_eq!(asha.phone.as_deref(), Some("+91 98765 43210"));
        assert_eq!(asha.payment_link, format!("{BASE}S1"));
        assert!(asha.payment_qr.is_some());
        assert_eq!(asha.extra.get("Hostel").map(String::as_str), Some("Block A"));

        let ravi = &records[1];
        assert_eq!(ravi.id.0, "ravikumar");
        assert_eq!(ravi.class.as_deref(), Some("10"));
        assert_eq!(ravi.past_delay_count, Some(0));
        assert_eq!(ravi.payment_link, format!("{BASE}ravikumar"));
        assert!(ravi.extra.is_empty());
    }

    #[test]
    fn duplicate_identities_get_suffixes() {
        let store = import(
            "Student Name,Email,Total Payment Dues\nAsha,a@x.com,1\nAsha,b@x.com,2\nAsha,c@x.com,3\n",
        )
        .expect("sheet imports");
        let ids = store
            .records()
            .iter()
            .map(|record| record.id.0.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["asha", "asha-2", "asha-3"]);
        assert!(store
            .records()
            .iter()
            .all(|record| record.payment_link == format!("{BASE}asha")));
    }

    #[test]
    fn negative_dues_name_the_row() {
        match import("Student Name,Email,Total Payment Dues\nAsha,a@x.com,10\nRavi,r@x.com,-5\n") {
            Err(IngestionError::NegativeDues { row, value }) => {
                assert_eq!(row, 3);
                assert_eq!(value, "-5");
            }
            other => panic!("expected negative dues, got {other:?}"),
        }
    }

    #[test]
    fn blank_dues_cell_reads_as_zero() {
        let store = import("Student Name,Email,Total Payment Dues\nAsha,a@x.com,500\nRavi,r@x.com,\n")
            .expect("sheet imports");
        let records = store.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].dues, Decimal::ZERO);
        assert!(!records[1].is_due());
    }

    #[test]
    fn unparseable_values_are_rejected() {
        assert!(matches!(
            import("Student Name,Email,Total Payment Dues\nAsha,a@x.com,lots\n"),
            Err(IngestionError::InvalidValue { row: 2, .. })
        ));
        assert!(matches!(
            import("Student Name,Email,Total Payment Dues,Past Delay Count\nAsha,a@x.com,1,1.5\n"),
            Err(IngestionError::InvalidValue { row: 2, .. })
        ));
        assert!(matches!(
            import("Student Name,Email,Total Payment Dues,Defaulter\nAsha,a@x.com,1,maybe\n"),
            Err(IngestionError::InvalidValue { row: 2, .. })
        ));
    }

    #[test]
    fn rows_without_identity_are_rejected() {
        assert!(matches!(
            import("Student Name,Email,Total Payment Dues\n,a@x.com,1\n"),
            Err(IngestionError::MissingIdentity { row: 2 })
        ));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let result = FeeImporter::from_bytes(
            "fees.ods",
            Vec::new(),
            &PaymentLinker::new(BASE),
        );
        assert!(matches!(
            result,
            Err(IngestionError::UnsupportedFormat { file_name }) if file_name == "fees.ods"
        ));
    }

    #[test]
    fn amounts_and_counts_parse_leniently() {
        assert_eq!(parse_amount("₹ 1,200.50"), Some(Decimal::new(120050, 2)));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count("3.00"), Some(3));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("2.5"), None);
    }
}
