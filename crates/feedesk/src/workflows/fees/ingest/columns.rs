use super::super::domain::{Column, ColumnLayout, ColumnRole};
use super::IngestionError;

pub(crate) const EMAIL_HEADER: &str = "Email";
pub(crate) const DUES_HEADERS: [&str; 2] = ["Total Payment Dues", "Total Payment Dues (₹)"];
const STUDENT_ID_HEADER: &str = "Student ID";
const STUDENT_NAME_HEADER: &str = "Student Name";
const CLASS_HEADER: &str = "Class";
const LOCATION_HEADERS: [&str; 2] = ["City", "Address"];
const PHONE_HEADERS: [&str; 4] = ["Phone", "Mobile", "Parent Phone", "Parent Mobile"];
const PAST_DELAY_HEADER: &str = "Past Delay Count";
const DEFAULTER_HEADER: &str = "Defaulter";

/// Columns the app generates itself; uploaded copies are ignored and rebuilt.
pub(crate) const GENERATED_HEADERS: [&str; 2] = ["Payment Link", "Payment QR"];

/// Assign a role to every header. Alias groups take the first spelling, in priority order,
/// that the sheet contains; remaining spellings are carried as extra columns.
pub(crate) fn resolve_layout(headers: &[String]) -> Result<ColumnLayout, IngestionError> {
    let mut roles: Vec<Option<ColumnRole>> = vec![None; headers.len()];

    let mut claim = |candidates: &[&str], role: ColumnRole| -> bool {
        for candidate in candidates {
            if let Some(index) = headers.iter().position(|header| header == candidate) {
                roles[index] = Some(role);
                return true;
            }
        }
        false
    };

    let has_email = claim(&[EMAIL_HEADER], ColumnRole::Email);
    let has_dues = claim(&DUES_HEADERS, ColumnRole::Dues);
    let has_id = claim(&[STUDENT_ID_HEADER], ColumnRole::StudentId);
    let has_name = claim(&[STUDENT_NAME_HEADER], ColumnRole::StudentName);
    claim(&[CLASS_HEADER], ColumnRole::Class);
    claim(&LOCATION_HEADERS, ColumnRole::Location);
    claim(&PHONE_HEADERS, ColumnRole::Phone);
    claim(&[PAST_DELAY_HEADER], ColumnRole::PastDelayCount);
    claim(&[DEFAULTER_HEADER], ColumnRole::Defaulter);

    if !has_email {
        return Err(IngestionError::MissingColumn {
            column: EMAIL_HEADER,
        });
    }
    if !has_dues {
        return Err(IngestionError::MissingColumn {
            column: DUES_HEADERS[0],
        });
    }
    if !has_id && !has_name {
        return Err(IngestionError::MissingIdentityColumn);
    }

    let columns = headers
        .iter()
        .zip(roles)
        .filter(|(header, _)| {
            !header.is_empty() && !GENERATED_HEADERS.contains(&header.as_str())
        })
        .map(|(header, role)| Column {
            header: header.clone(),
            role: role.unwrap_or(ColumnRole::Extra),
        })
        .collect();

    Ok(ColumnLayout::new(columns))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn recognizes_rupee_dues_header_and_aliases() {
        let layout = resolve_layout(&headers(&[
            "Student Name",
            "Email",
            "Total Payment Dues (₹)",
            "Address",
            "Parent Mobile",
            "Hostel",
        ]))
        .expect("layout resolves");

        assert_eq!(
            layout.header_for(ColumnRole::Dues),
            Some("Total Payment Dues (₹)")
        );
        assert_eq!(layout.header_for(ColumnRole::Location), Some("Address"));
        assert_eq!(layout.header_for(ColumnRole::Phone), Some("Parent Mobile"));
        assert_eq!(layout.extra_headers().collect::<Vec<_>>(), vec!["Hostel"]);
    }

    #[test]
    fn city_wins_over_address_and_address_becomes_extra() {
        let layout = resolve_layout(&headers(&[
            "Student Name",
            "Email",
            "Total Payment Dues",
            "Address",
            "City",
        ]))
        .expect("layout resolves");

        assert_eq!(layout.header_for(ColumnRole::Location), Some("City"));
        assert_eq!(layout.extra_headers().collect::<Vec<_>>(), vec!["Address"]);
    }

    #[test]
    fn missing_email_or_dues_is_reported() {
        match resolve_layout(&headers(&["Student Name", "Total Payment Dues"])) {
            Err(IngestionError::MissingColumn { column }) => assert_eq!(column, "Email"),
            other => panic!("expected missing email, got {other:?}"),
        }
        match resolve_layout(&headers(&["Student Name", "Email"])) {
            Err(IngestionError::MissingColumn { column }) => {
                assert_eq!(column, "Total Payment Dues")
            }
            other => panic!("expected missing dues, got {other:?}"),
        }
    }

    #[test]
    fn requires_an_identity_column() {
        assert!(matches!(
            resolve_layout(&headers(&["Email", "Total Payment Dues"])),
            Err(IngestionError::MissingIdentityColumn)
        ));
    }

    #[test]
    fn generated_columns_are_dropped() {
        let layout = resolve_layout(&headers(&[
            "Student ID",
            "Email",
            "Total Payment Dues",
            "Payment Link",
            "Payment QR",
        ]))
        .expect("layout resolves");
        assert_eq!(layout.columns().len(), 3);
    }
}
