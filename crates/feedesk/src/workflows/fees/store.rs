use rust_decimal::Decimal;
use tracing::{info, warn};

use super::domain::{non_blank, ColumnLayout, ColumnRole, FeeRecord, NewRecord, RecordEdit, RecordId};
use super::payment::{name_key, PaymentLinker, PaymentQr};

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("no fee record with id '{id}'")]
    UnknownRecord { id: RecordId },
    #[error("dues cannot be negative (found {value})")]
    NegativeDues { value: String },
    #[error("a record needs a student id or a student name")]
    MissingIdentity,
}

/// In-memory table of the session's fee records, in upload order.
#[derive(Debug, Clone)]
pub struct RecordStore {
    layout: ColumnLayout,
    records: Vec<FeeRecord>,
    linker: PaymentLinker,
}

impl RecordStore {
    pub fn new(layout: ColumnLayout, linker: PaymentLinker) -> Self {
        Self {
            layout,
            records: Vec::new(),
            linker,
        }
    }

    pub fn records(&self) -> &[FeeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn linker(&self) -> &PaymentLinker {
        &self.linker
    }

    pub fn get(&self, id: &RecordId) -> Option<&FeeRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    /// The location filter is only offered when the upload had a City or Address column.
    pub fn has_location_column(&self) -> bool {
        self.layout.has(ColumnRole::Location)
    }

    pub fn has_column(&self, role: ColumnRole) -> bool {
        self.layout.has(role)
    }

    /// Add a row through the editor. Columns the row fills that the upload lacked are added.
    pub fn append(&mut self, new_record: NewRecord) -> Result<RecordId, EditError> {
        self.widen_layout(&new_record);
        let id = self.insert(new_record)?;
        info!(record = %id, "fee record appended");
        Ok(id)
    }

    pub fn remove(&mut self, id: &RecordId) -> Result<FeeRecord, EditError> {
        let index = self.index_of(id)?;
        let removed = self.records.remove(index);
        info!(record = %id, "fee record removed");
        Ok(removed)
    }

    pub fn edit(&mut self, id: &RecordId, edit: RecordEdit) -> Result<&FeeRecord, EditError> {
        let index = self.index_of(id)?;
        if let Some(dues) = edit.dues {
            if dues < Decimal::ZERO {
                return Err(EditError::NegativeDues {
                    value: dues.to_string(),
                });
            }
        }
        if let Some(name) = &edit.name {
            if name.trim().is_empty() && self.records[index].student_id.is_none() {
                return Err(EditError::MissingIdentity);
            }
        }

        self.widen_layout_for_edit(&edit);

        let mut relink = false;
        let record = &mut self.records[index];
        if let Some(name) = edit.name {
            let name = non_blank(&name)
                .or_else(|| record.student_id.clone())
                .unwrap_or_default();
            relink = record.student_id.is_none() && name != record.name;
            record.name = name;
        }
        if let Some(class) = edit.class {
            record.class = non_blank(&class);
        }
        if let Some(email) = edit.email {
            record.email = email.trim().to_string();
        }
        if let Some(phone) = edit.phone {
            record.phone = non_blank(&phone);
        }
        if let Some(dues) = edit.dues {
            record.dues = dues;
        }
        if let Some(count) = edit.past_delay_count {
            record.past_delay_count = Some(count);
        }
        if let Some(city) = edit.city {
            record.city = non_blank(&city);
        }
        if let Some(defaulter) = edit.defaulter {
            record.defaulter = Some(defaulter);
        }
        for (header, value) in edit.extra {
            match non_blank(&value) {
                Some(value) => {
                    record.extra.insert(header, value);
                }
                None => {
                    record.extra.remove(&header);
                }
            }
        }

        if relink {
            let (link, qr) = payment_for(&self.linker, None, &self.records[index].name);
            let record = &mut self.records[index];
            record.payment_link = link;
            record.payment_qr = qr;
        }

        info!(record = %id, "fee record edited");
        Ok(&self.records[index])
    }

    /// Assign an id and payment details to a validated row and store it.
    pub(crate) fn insert(&mut self, new_record: NewRecord) -> Result<RecordId, EditError> {
        if new_record.dues < Decimal::ZERO {
            return Err(EditError::NegativeDues {
                value: new_record.dues.to_string(),
            });
        }

        let student_id = new_record.student_id.as_deref().and_then(non_blank);
        let name = non_blank(&new_record.name)
            .or_else(|| student_id.clone())
            .ok_or(EditError::MissingIdentity)?;

        let id = self.unique_id(student_id.clone().unwrap_or_else(|| name_key(&name)));
        let (payment_link, payment_qr) = payment_for(&self.linker, student_id.as_deref(), &name);

        self.records.push(FeeRecord {
            id: id.clone(),
            student_id,
            name,
            class: new_record.class.as_deref().and_then(non_blank),
            email: new_record.email.trim().to_string(),
            phone: new_record.phone.as_deref().and_then(non_blank),
            dues: new_record.dues,
            past_delay_count: new_record.past_delay_count,
            city: new_record.city.as_deref().and_then(non_blank),
            defaulter: new_record.defaulter,
            payment_link,
            payment_qr,
            extra: new_record.extra,
        });
        Ok(id)
    }

    fn unique_id(&self, base: String) -> RecordId {
        let taken = |candidate: &str| self.records.iter().any(|record| record.id.0 == candidate);
        if !taken(&base) {
            return RecordId(base);
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{base}-{suffix}");
            if !taken(&candidate) {
                return RecordId(candidate);
            }
            suffix += 1;
        }
    }

    fn index_of(&self, id: &RecordId) -> Result<usize, EditError> {
        self.records
            .iter()
            .position(|record| &record.id == id)
            .ok_or_else(|| EditError::UnknownRecord { id: id.clone() })
    }

    fn widen_layout(&mut self, new_record: &NewRecord) {
        let present = [
            (ColumnRole::StudentId, new_record.student_id.is_some()),
            (ColumnRole::StudentName, !new_record.name.trim().is_empty()),
            (ColumnRole::Class, new_record.class.is_some()),
            (ColumnRole::Phone, new_record.phone.is_some()),
            (ColumnRole::PastDelayCount, new_record.past_delay_count.is_some()),
            (ColumnRole::Location, new_record.city.is_some()),
            (ColumnRole::Defaulter, new_record.defaulter.is_some()),
        ];
        for (role, filled) in present {
            if filled {
                self.layout.ensure(role);
            }
        }
        for header in new_record.extra.keys() {
            self.layout.ensure_extra(header);
        }
    }

    fn widen_layout_for_edit(&mut self, edit: &RecordEdit) {
        let present = [
            (ColumnRole::StudentName, edit.name.is_some()),
            (ColumnRole::Class, edit.class.is_some()),
            (ColumnRole::Phone, edit.phone.is_some()),
            (ColumnRole::PastDelayCount, edit.past_delay_count.is_some()),
            (ColumnRole::Location, edit.city.is_some()),
            (ColumnRole::Defaulter, edit.defaulter.is_some()),
        ];
        for (role, filled) in present {
            if filled {
                self.layout.ensure(role);
            }
        }
        for (header, value) in &edit.extra {
            if !value.trim().is_empty() {
                self.layout.ensure_extra(header);
            }
        }
    }
}

/// A QR that fails to render leaves the record with its link only.
fn payment_for(
    linker: &PaymentLinker,
    student_id: Option<&str>,
    name: &str,
) -> (String, Option<PaymentQr>) {
    let link = linker.link_for(student_id, name);
    let qr = match linker.qr_for(&link) {
        Ok(qr) => Some(qr),
        Err(err) => {
            warn!(link = %link, error = %err, "payment QR could not be generated");
            None
        }
    };
    (link, qr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::fees::domain::Column;

    const BASE: &str = "https://pay.example/pay?student_id=";

    fn store() -> RecordStore {
        let layout = ColumnLayout::new(vec![
            Column {
                header: "Student Name".to_string(),
                role: ColumnRole::StudentName,
            },
            Column {
                header: "Email".to_string(),
                role: ColumnRole::Email,
            },
            Column {
                header: "Total Payment Dues".to_string(),
                role: ColumnRole::Dues,
            },
        ]);
        let mut store = RecordStore::new(layout, PaymentLinker::new(BASE));
        store
            .insert(NewRecord {
                name: "Asha Verma".to_string(),
                email: "asha@x.com".to_string(),
                dues: Decimal::new(500, 0),
                ..NewRecord::default()
            })
            .expect("insert");
        store
    }

    #[test]
    fn renaming_without_student_id_regenerates_link() {
        let mut store = store();
        let id = RecordId("ashaverma".to_string());
        let record = store
            .edit(
                &id,
                RecordEdit {
                    name: Some("Asha Sharma".to_string()),
                    ..RecordEdit::default()
                },
            )
            .expect("edit applies");

        assert_eq!(record.id, id);
        assert_eq!(record.payment_link, format!("{BASE}ashasharma"));
        assert!(record.payment_qr.is_some());
    }

    #[test]
    fn negative_dues_edit_is_rejected_and_nothing_changes() {
        let mut store = store();
        let id = RecordId("ashaverma".to_string());
        let err = store
            .edit(
                &id,
                RecordEdit {
                    dues: Some(Decimal::new(-1, 0)),
                    class: Some("4".to_string()),
                    ..RecordEdit::default()
                },
            )
            .expect_err("negative dues rejected");
        assert!(matches!(err, EditError::NegativeDues { .. }));
        assert_eq!(store.get(&id).and_then(|r| r.class.clone()), None);
    }

    #[test]
    fn edits_introduce_missing_columns() {
        let mut store = store();
        assert!(!store.has_location_column());
        let id = RecordId("ashaverma".to_string());
        store
            .edit(
                &id,
                RecordEdit {
                    city: Some("Pune".to_string()),
                    ..RecordEdit::default()
                },
            )
            .expect("edit applies");
        assert!(store.has_location_column());
    }

    #[test]
    fn append_and_remove_round_trip() {
        let mut store = store();
        let id = store
            .append(NewRecord {
                student_id: Some("S-9".to_string()),
                name: String::new(),
                email: "s9@x.com".to_string(),
                dues: Decimal::ZERO,
                class: Some("KG".to_string()),
                ..NewRecord::default()
            })
            .expect("append");
        assert_eq!(id.0, "S-9");
        assert_eq!(store.get(&id).map(|r| r.name.as_str()), Some("S-9"));
        assert!(store.has_column(ColumnRole::Class));

        store.remove(&id).expect("remove");
        assert!(store.get(&id).is_none());
        assert!(matches!(
            store.remove(&id),
            Err(EditError::UnknownRecord { .. })
        ));
    }

    #[test]
    fn append_requires_identity() {
        let mut store = store();
        assert!(matches!(
            store.append(NewRecord {
                email: "x@x.com".to_string(),
                ..NewRecord::default()
            }),
            Err(EditError::MissingIdentity)
        ));
    }
}
