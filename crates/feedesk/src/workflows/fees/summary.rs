use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{ColumnLayout, ColumnRole, FeeRecord};
use super::filter::compare_classes;

/// Pending dues of one class in the current view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDues {
    pub class: String,
    pub dues: Decimal,
    pub due_records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityDues {
    pub city: String,
    pub dues: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingValues {
    pub column: String,
    pub missing: usize,
}

/// Dashboard figures for a filtered view of the fee sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeSummary {
    pub total_students: usize,
    pub total_pending_dues: Decimal,
    /// Records with a positive balance.
    pub defaulters: usize,
    pub by_class: Vec<ClassDues>,
    pub by_city: Vec<CityDues>,
    pub worst_class: Option<ClassDues>,
    pub missing_values: Vec<MissingValues>,
}

impl FeeSummary {
    pub fn from_records<'a, I>(records: I, layout: &ColumnLayout) -> Self
    where
        I: IntoIterator<Item = &'a FeeRecord>,
    {
        let records = records.into_iter().collect::<Vec<_>>();

        let mut by_class: BTreeMap<String, ClassDues> = BTreeMap::new();
        let mut by_city: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut total_pending_dues = Decimal::ZERO;
        let mut defaulters = 0;

        for record in &records {
            total_pending_dues += record.dues;
            if record.is_due() {
                defaulters += 1;
            }

            if let Some(class) = &record.class {
                let entry = by_class.entry(class.clone()).or_insert_with(|| ClassDues {
                    class: class.clone(),
                    dues: Decimal::ZERO,
                    due_records: 0,
                });
                entry.dues += record.dues;
                if record.is_due() {
                    entry.due_records += 1;
                }
            }

            if layout.has(ColumnRole::Location) {
                if let Some(city) = &record.city {
                    *by_city.entry(city.clone()).or_insert(Decimal::ZERO) += record.dues;
                }
            }
        }

        let mut by_class = by_class.into_values().collect::<Vec<_>>();
        by_class.sort_by(|a, b| compare_classes(&a.class, &b.class));

        let worst_class = by_class
            .iter()
            .fold(None::<&ClassDues>, |worst, candidate| match worst {
                Some(current) if current.dues >= candidate.dues => Some(current),
                _ => Some(candidate),
            })
            .cloned();

        Self {
            total_students: records.len(),
            total_pending_dues,
            defaulters,
            by_class,
            by_city: by_city
                .into_iter()
                .map(|(city, dues)| CityDues { city, dues })
                .collect(),
            worst_class,
            missing_values: missing_values(&records, layout),
        }
    }
}

fn missing_values(records: &[&FeeRecord], layout: &ColumnLayout) -> Vec<MissingValues> {
    layout
        .columns()
        .iter()
        .map(|column| {
            let missing = records
                .iter()
                .filter(|record| match column.role {
                    ColumnRole::Dues | ColumnRole::StudentName => false,
                    ColumnRole::Email => record.email.is_empty(),
                    _ => record.value_for(column).is_empty(),
                })
                .count();
            MissingValues {
                column: column.header.clone(),
                missing,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::fees::ingest::FeeImporter;
    use crate::workflows::fees::payment::PaymentLinker;
    use crate::workflows::fees::store::RecordStore;

    fn store() -> RecordStore {
        FeeImporter::from_csv_reader(
            "Student Name,Class,Email,Total Payment Dues,City,Phone\n\
             Asha,2,a@x.com,500,Pune,9876543210\n\
             Ravi,10,r@x.com,0,Nagpur,\n\
             Meera,2,m@x.com,1500,Pune,\n\
             Kabir,10,k@x.com,250,,\n"
                .as_bytes(),
            &PaymentLinker::new("https://pay/"),
        )
        .expect("sheet imports")
    }

    #[test]
    fn totals_and_breakdowns() {
        let store = store();
        let summary = FeeSummary::from_records(store.records(), store.layout());

        assert_eq!(summary.total_students, 4);
        assert_eq!(summary.total_pending_dues, Decimal::new(2250, 0));
        assert_eq!(summary.defaulters, 3);
        assert_eq!(
            summary.by_class,
            vec![
                ClassDues {
                    class: "2".to_string(),
                    dues: Decimal::new(2000, 0),
                    due_records: 2,
                },
                ClassDues {
                    class: "10".to_string(),
                    dues: Decimal::new(250, 0),
                    due_records: 1,
                },
            ]
        );
        assert_eq!(
            summary.worst_class.map(|worst| worst.class),
            Some("2".to_string())
        );
        assert_eq!(
            summary.by_city,
            vec![
                CityDues {
                    city: "Nagpur".to_string(),
                    dues: Decimal::ZERO,
                },
                CityDues {
                    city: "Pune".to_string(),
                    dues: Decimal::new(2000, 0),
                },
            ]
        );
    }

    #[test]
    fn missing_values_are_counted_per_column() {
        let store = store();
        let summary = FeeSummary::from_records(store.records(), store.layout());
        let missing = |header: &str| {
            summary
                .missing_values
                .iter()
                .find(|entry| entry.column == header)
                .map(|entry| entry.missing)
        };
        assert_eq!(missing("Phone"), Some(3));
        assert_eq!(missing("City"), Some(1));
        assert_eq!(missing("Email"), Some(0));
    }

    #[test]
    fn empty_view_has_no_worst_class() {
        let store = store();
        let summary = FeeSummary::from_records(std::iter::empty(), store.layout());
        assert_eq!(summary.total_students, 0);
        assert!(summary.worst_class.is_none());
        assert_eq!(summary.total_pending_dues, Decimal::ZERO);
    }
}
