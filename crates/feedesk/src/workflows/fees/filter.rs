use std::cmp::Ordering;
use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::FeeRecord;
use super::store::RecordStore;

/// Closed interval over dues, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuesRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl DuesRange {
    pub fn contains(&self, amount: Decimal) -> bool {
        self.min <= amount && amount <= self.max
    }
}

/// Operator-selected predicates. Unset predicates match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeFilter {
    /// An empty set selects nothing, like clearing every box in the class picker.
    #[serde(default)]
    pub classes: Option<BTreeSet<String>>,
    #[serde(default)]
    pub dues: Option<DuesRange>,
    #[serde(default)]
    pub location: Option<String>,
}

impl FeeFilter {
    pub fn apply<'a>(&self, store: &'a RecordStore) -> Vec<&'a FeeRecord> {
        let location = if store.has_location_column() {
            self.location
                .as_deref()
                .map(str::trim)
                .filter(|needle| !needle.is_empty())
                .map(str::to_lowercase)
        } else {
            None
        };

        store
            .records()
            .iter()
            .filter(|record| self.matches_class(record))
            .filter(|record| self.dues.map_or(true, |range| range.contains(record.dues)))
            .filter(|record| match &location {
                Some(needle) => record
                    .city
                    .as_deref()
                    .is_some_and(|city| city.to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .collect()
    }

    fn matches_class(&self, record: &FeeRecord) -> bool {
        match &self.classes {
            Some(classes) => record
                .class
                .as_ref()
                .is_some_and(|class| classes.contains(class)),
            None => true,
        }
    }
}

/// Records with an outstanding balance, in the order given.
pub fn due_records<'a, I>(records: I) -> Vec<&'a FeeRecord>
where
    I: IntoIterator<Item = &'a FeeRecord>,
{
    records.into_iter().filter(|record| record.is_due()).collect()
}

/// Choices the dashboard offers for the class picker and the dues slider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub classes: Vec<String>,
    pub min_dues: Decimal,
    pub max_dues: Decimal,
    pub location_available: bool,
}

impl FilterOptions {
    pub fn from_store(store: &RecordStore) -> Self {
        let mut classes = store
            .records()
            .iter()
            .filter_map(|record| record.class.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        classes.sort_by(|a, b| compare_classes(a, b));

        let amounts = store.records().iter().map(|record| record.dues);
        let min_dues = amounts.clone().min().unwrap_or(Decimal::ZERO);
        let max_dues = amounts.max().unwrap_or(Decimal::ZERO);

        Self {
            classes,
            min_dues,
            max_dues,
            location_available: store.has_location_column(),
        }
    }
}

const PRE_PRIMARY: [&str; 3] = ["nursery", "kg", "prep"];

/// Nursery, KG and Prep come first, then numbered classes in numeric order, then the rest.
pub fn compare_classes(a: &str, b: &str) -> Ordering {
    class_rank(a).cmp(&class_rank(b)).then_with(|| a.cmp(b))
}

fn class_rank(class: &str) -> (u8, u64) {
    let lowered = class.trim().to_ascii_lowercase();
    if let Some(position) = PRE_PRIMARY.iter().position(|name| *name == lowered) {
        return (0, position as u64);
    }
    match lowered.parse::<u64>() {
        Ok(number) => (1, number),
        Err(_) => (2, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::fees::ingest::FeeImporter;
    use crate::workflows::fees::payment::PaymentLinker;

    fn store(with_city: bool) -> RecordStore {
        let csv = if with_city {
            "Student Name,Class,Email,Total Payment Dues,City\n\
             Asha,2,a@x.com,500,Pune\n\
             Ravi,10,r@x.com,0,NAGPUR\n\
             Meera,2,m@x.com,1500,\n\
             Kabir,KG,k@x.com,250,Pune East\n"
        } else {
            "Student Name,Class,Email,Total Payment Dues\n\
             Asha,2,a@x.com,500\n\
             Ravi,10,r@x.com,0\n"
        };
        FeeImporter::from_csv_reader(csv.as_bytes(), &PaymentLinker::new("https://pay/"))
            .expect("sheet imports")
    }

    fn names<'a>(records: &[&'a FeeRecord]) -> Vec<&'a str> {
        records.iter().map(|record| record.name.as_str()).collect()
    }

    #[test]
    fn no_predicates_is_identity() {
        let store = store(true);
        assert_eq!(FeeFilter::default().apply(&store).len(), store.len());
    }

    #[test]
    fn predicates_combine_with_and() {
        let store = store(true);
        let filter = FeeFilter {
            classes: Some(["2".to_string()].into_iter().collect()),
            dues: Some(DuesRange {
                min: Decimal::new(100, 0),
                max: Decimal::new(1000, 0),
            }),
            location: Some("pune".to_string()),
        };
        assert_eq!(names(&filter.apply(&store)), vec!["Asha"]);
    }

    #[test]
    fn dues_range_is_closed() {
        let store = store(true);
        let filter = FeeFilter {
            dues: Some(DuesRange {
                min: Decimal::ZERO,
                max: Decimal::new(500, 0),
            }),
            ..FeeFilter::default()
        };
        assert_eq!(names(&filter.apply(&store)), vec!["Asha", "Ravi", "Kabir"]);
    }

    #[test]
    fn location_search_is_case_insensitive_and_skips_blank_cities() {
        let store = store(true);
        let filter = FeeFilter {
            location: Some("  PUNE ".to_string()),
            ..FeeFilter::default()
        };
        assert_eq!(names(&filter.apply(&store)), vec!["Asha", "Kabir"]);

        let filter = FeeFilter {
            location: Some("nag".to_string()),
            ..FeeFilter::default()
        };
        assert_eq!(names(&filter.apply(&store)), vec!["Ravi"]);
    }

    #[test]
    fn location_is_ignored_without_a_location_column() {
        let store = store(false);
        let filter = FeeFilter {
            location: Some("pune".to_string()),
            ..FeeFilter::default()
        };
        assert_eq!(filter.apply(&store).len(), 2);
    }

    #[test]
    fn empty_class_selection_selects_nothing() {
        let store = store(true);
        let filter = FeeFilter {
            classes: Some(BTreeSet::new()),
            ..FeeFilter::default()
        };
        assert!(filter.apply(&store).is_empty());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let store = store(true);
        let filter = FeeFilter {
            classes: Some(["2".to_string(), "KG".to_string()].into_iter().collect()),
            ..FeeFilter::default()
        };
        let first = filter.apply(&store);
        let second = filter.apply(&store);
        assert_eq!(first, second);
    }

    #[test]
    fn due_records_exclude_zero_balances() {
        let store = store(true);
        assert_eq!(
            names(&due_records(store.records())),
            vec!["Asha", "Meera", "Kabir"]
        );
    }

    #[test]
    fn options_sort_classes_in_school_order() {
        let options = FilterOptions::from_store(&store(true));
        assert_eq!(options.classes, vec!["KG", "2", "10"]);
        assert_eq!(options.min_dues, Decimal::ZERO);
        assert_eq!(options.max_dues, Decimal::new(1500, 0));
        assert!(options.location_available);
    }
}
