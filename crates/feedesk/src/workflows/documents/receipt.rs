use crate::workflows::fees::{ColumnLayout, FeeRecord};

use super::pdf::{PdfCanvas, MARGIN, PAGE_HEIGHT};
use super::DocumentError;

const TITLE_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 12.0;
const LINE_HEIGHT: f32 = 28.0;
const CLOSING_LINE: &str = "Thank you for your payment!";

#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("record {id} has no payment link")]
    MissingPaymentLink { id: String },
    #[error("record {id} has no e-mail address")]
    MissingEmail { id: String },
    #[error(transparent)]
    Render(#[from] DocumentError),
}

/// Fee receipt listing every sheet field of one record as `key: value` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeReceipt {
    title: String,
    student_name: String,
    lines: Vec<(String, String)>,
}

impl FeeReceipt {
    pub fn for_record(
        record: &FeeRecord,
        layout: &ColumnLayout,
        school_name: &str,
    ) -> Result<Self, ReceiptError> {
        if record.payment_link.trim().is_empty() {
            return Err(ReceiptError::MissingPaymentLink {
                id: record.id.to_string(),
            });
        }
        if record.email.trim().is_empty() {
            return Err(ReceiptError::MissingEmail {
                id: record.id.to_string(),
            });
        }

        let mut lines: Vec<(String, String)> = layout
            .columns()
            .iter()
            .map(|column| (column.header.clone(), record.value_for(column)))
            .collect();
        lines.push(("Payment Link".to_string(), record.payment_link.clone()));

        Ok(Self {
            title: format!("{school_name} - Fee Receipt"),
            student_name: record.name.clone(),
            lines,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn lines(&self) -> &[(String, String)] {
        &self.lines
    }

    /// `fee_receipt_<Student_Name>.pdf`
    pub fn file_name(&self) -> String {
        format!("fee_receipt_{}.pdf", self.student_name.replace(' ', "_"))
    }

    pub fn render_pdf(&self) -> Result<Vec<u8>, ReceiptError> {
        let mut canvas = PdfCanvas::new();
        let mut y = PAGE_HEIGHT - MARGIN - TITLE_SIZE;
        canvas.centered_text(y, TITLE_SIZE, &self.title);
        y -= LINE_HEIGHT * 1.5;

        let closing = (String::new(), CLOSING_LINE.to_string());
        for (index, (key, value)) in self.lines.iter().chain([&closing]).enumerate() {
            if index == self.lines.len() {
                y -= LINE_HEIGHT / 2.0;
            }
            if y < MARGIN {
                canvas.new_page();
                y = PAGE_HEIGHT - MARGIN - BODY_SIZE;
            }
            let line = if key.is_empty() {
                value.clone()
            } else {
                format!("{key}: {value}")
            };
            canvas.text(MARGIN, y, BODY_SIZE, &line);
            y -= LINE_HEIGHT;
        }

        Ok(canvas.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::fees::{Column, ColumnRole, RecordId};
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;

    fn layout() -> ColumnLayout {
        ColumnLayout::new(vec![
            Column {
                header: "Student Name".to_string(),
                role: ColumnRole::StudentName,
            },
            Column {
                header: "Email".to_string(),
                role: ColumnRole::Email,
            },
            Column {
                header: "Total Payment Dues (₹)".to_string(),
                role: ColumnRole::Dues,
            },
            Column {
                header: "Transport".to_string(),
                role: ColumnRole::Extra,
            },
        ])
    }

    fn record() -> FeeRecord {
        let mut extra = BTreeMap::new();
        extra.insert("Transport".to_string(), "Bus 4".to_string());
        FeeRecord {
            id: RecordId("asha".to_string()),
            student_id: None,
            name: "Asha Rani".to_string(),
            class: Some("2".to_string()),
            email: "asha@x.com".to_string(),
            phone: None,
            dues: Decimal::new(50000, 2),
            past_delay_count: None,
            city: None,
            defaulter: None,
            payment_link: "https://pay.example/?student_id=asharani".to_string(),
            payment_qr: None,
            extra,
        }
    }

    #[test]
    fn lines_follow_sheet_columns() {
        let receipt = FeeReceipt::for_record(&record(), &layout(), "Ambition Public School")
            .expect("receipt");
        assert_eq!(receipt.title(), "Ambition Public School - Fee Receipt");
        let keys: Vec<&str> = receipt.lines().iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "Student Name",
                "Email",
                "Total Payment Dues (₹)",
                "Transport",
                "Payment Link"
            ]
        );
        assert_eq!(receipt.lines()[2].1, "500");
        assert_eq!(receipt.file_name(), "fee_receipt_Asha_Rani.pdf");
    }

    #[test]
    fn rendering_is_byte_identical() {
        let receipt = FeeReceipt::for_record(&record(), &layout(), "Ambition Public School")
            .expect("receipt");
        let first = receipt.render_pdf().expect("pdf");
        let again = FeeReceipt::for_record(&record(), &layout(), "Ambition Public School")
            .expect("receipt")
            .render_pdf()
            .expect("pdf");
        assert_eq!(first, again);
    }

    #[test]
    fn receipt_needs_link_and_email() {
        let mut missing_email = record();
        missing_email.email = " ".to_string();
        assert!(matches!(
            FeeReceipt::for_record(&missing_email, &layout(), "School"),
            Err(ReceiptError::MissingEmail { .. })
        ));

        let mut missing_link = record();
        missing_link.payment_link.clear();
        assert!(matches!(
            FeeReceipt::for_record(&missing_link, &layout(), "School"),
            Err(ReceiptError::MissingPaymentLink { .. })
        ));
    }
}
