//! End-to-end reminder runs over an uploaded fee sheet, driven through the public session
//! facade with recording transports in place of SMTP and the SMS gateway.

mod common {
    use std::sync::{Arc, Mutex};

    use feedesk::session::FeeSession;
    use feedesk::workflows::fees::{FeeImporter, PaymentLinker};
    use feedesk::workflows::notifications::{
        MailTransport, OutgoingMail, SmsGateway, TransportError,
    };

    pub(super) const BASE_URL: &str = "https://pay.ambitionschool.com/pay?student_id=";

    #[derive(Default)]
    pub(super) struct RecordingMail {
        pub(super) sent: Mutex<Vec<OutgoingMail>>,
    }

    impl MailTransport for RecordingMail {
        fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
            self.sent.lock().expect("mail mutex").push(mail.clone());
            Ok(())
        }
    }

    impl RecordingMail {
        pub(super) fn sent(&self) -> Vec<OutgoingMail> {
            self.sent.lock().expect("mail mutex").clone()
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingSms {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl SmsGateway for RecordingSms {
        fn send(&self, phone: &str, message: &str) -> Result<(), TransportError> {
            self.sent
                .lock()
                .expect("sms mutex")
                .push((phone.to_string(), message.to_string()));
            Ok(())
        }
    }

    impl RecordingSms {
        pub(super) fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().expect("sms mutex").clone()
        }
    }

    pub(super) fn session_from(sheet: &str) -> FeeSession {
        let linker = PaymentLinker::new(BASE_URL);
        let store = FeeImporter::from_bytes("fees.csv", sheet.as_bytes().to_vec(), &linker)
            .expect("sheet imports");
        FeeSession::new(store, "Ambition Public School")
    }

    pub(super) fn recorders() -> (Arc<RecordingMail>, Arc<RecordingSms>) {
        (
            Arc::new(RecordingMail::default()),
            Arc::new(RecordingSms::default()),
        )
    }
}

use common::*;

use feedesk::workflows::fees::{DuesRange, FeeFilter, RecordId};
use feedesk::workflows::notifications::{
    normalize_phone, DispatchSettings, EmailStatus, NotificationDispatcher, SmsStatus,
    TemplateKind, QR_ATTACHMENT_NAME,
};
use rust_decimal::Decimal;

#[test]
fn only_the_due_junior_record_is_reminded() {
    let mut session = session_from(
        "Student Name,Class,Email,Total Payment Dues\nA,2,a@x.com,500\nB,10,b@x.com,0\n",
    );
    let (mail, sms) = recorders();
    let dispatcher = NotificationDispatcher::new(DispatchSettings {
        operator_template: TemplateKind::SeniorStrict,
        ..DispatchSettings::default()
    })
    .with_mail(mail.clone())
    .with_sms(sms.clone());

    let report = session
        .dispatch(&dispatcher, &FeeFilter::default())
        .expect("dispatch runs");

    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.record_id, RecordId("a".to_string()));
    assert_eq!(outcome.template, TemplateKind::JuniorFriendly);
    assert_eq!(outcome.email_status, EmailStatus::Success);
    assert_eq!(outcome.sms_status, SmsStatus::NotAttempted);

    let sent = mail.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@x.com");
    assert!(sent[0].body.contains("[Click here to pay now](https://pay.ambitionschool.com/pay?student_id=a)"));
    assert_eq!(
        sent[0].attachment.as_ref().map(|file| file.file_name.as_str()),
        Some(QR_ATTACHMENT_NAME)
    );
    assert!(sms.sent().is_empty());
    assert!(session
        .profile(&RecordId("b".to_string()))
        .expect("profile")
        .notifications
        .is_empty());
}

#[test]
fn blank_dues_row_loads_but_is_never_reminded() {
    let mut session = session_from(
        "Student Name,Email,Total Payment Dues\nAsha,a@x.com,500\nRavi,r@x.com,\n",
    );
    assert_eq!(session.store().len(), 2);
    let (mail, _) = recorders();
    let dispatcher =
        NotificationDispatcher::new(DispatchSettings::default()).with_mail(mail.clone());

    let report = session
        .dispatch(&dispatcher, &FeeFilter::default())
        .expect("dispatch runs");

    assert_eq!(report.skipped, 1);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].record_id, RecordId("asha".to_string()));
    let recipients = mail.sent().into_iter().map(|sent| sent.to).collect::<Vec<_>>();
    assert_eq!(recipients, vec!["a@x.com".to_string()]);
}

#[test]
fn sms_goes_to_normalized_numbers_and_bad_numbers_are_logged() {
    let mut session = session_from(
        "Student Name,Class,Email,Phone,Total Payment Dues\n\
         Asha,7,asha@x.com,+91 98765 43210,800\n\
         Ravi,7,ravi@x.com,1234,650\n",
    );
    let (mail, sms) = recorders();
    let dispatcher = NotificationDispatcher::new(DispatchSettings {
        send_sms: true,
        ..DispatchSettings::default()
    })
    .with_mail(mail.clone())
    .with_sms(sms.clone());

    let report = session
        .dispatch(&dispatcher, &FeeFilter::default())
        .expect("dispatch runs");

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].sms_status, SmsStatus::Success);
    assert_eq!(report.outcomes[1].sms_status, SmsStatus::NotAttempted);
    assert!(report.outcomes[1]
        .sms_error
        .as_deref()
        .is_some_and(|error| error.contains("1234")));
    assert_eq!(report.outcomes[1].email_status, EmailStatus::Success);

    let texts = sms.sent();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].0, "9876543210");
    assert!(texts[0].1.contains("Asha"));
    assert_eq!(mail.sent().len(), 2);
}

#[test]
fn phone_normalization_cases() {
    assert_eq!(normalize_phone("+91 98765 43210").as_deref(), Ok("9876543210"));
    assert_eq!(normalize_phone("919876543210").as_deref(), Ok("9876543210"));
    assert!(normalize_phone("1234").is_err());
}

#[test]
fn filtering_is_repeatable_on_an_unchanged_sheet() {
    let session = session_from(
        "Student Name,Class,City,Email,Total Payment Dues\n\
         Asha,2,Patna,asha@x.com,500\n\
         Bilal,5,Gaya,bilal@x.com,1500\n\
         Chitra,2,Patna,chitra@x.com,2500\n",
    );
    let filter = FeeFilter {
        classes: Some(["2".to_string()].into_iter().collect()),
        dues: Some(DuesRange {
            min: Decimal::new(100, 0),
            max: Decimal::new(3000, 0),
        }),
        location: Some("PAT".to_string()),
    };

    let first: Vec<_> = session.filter(&filter).iter().map(|r| r.id.clone()).collect();
    let second: Vec<_> = session.filter(&filter).iter().map(|r| r.id.clone()).collect();

    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![RecordId("asha".to_string()), RecordId("chitra".to_string())]
    );
}

#[test]
fn receipts_are_byte_identical_across_calls() {
    let session = session_from(
        "Student ID,Student Name,Class,Email,Total Payment Dues (₹)\nS-101,Asha Rani,2,asha@x.com,\"₹1,500\"\n",
    );
    let id = RecordId("S-101".to_string());

    let receipt = session.receipt(&id).expect("receipt");
    let first = receipt.render_pdf().expect("pdf");
    let second = session
        .receipt(&id)
        .expect("receipt")
        .render_pdf()
        .expect("pdf");

    assert_eq!(first, second);
    assert!(first.starts_with(b"%PDF"));
    assert_eq!(receipt.file_name(), "fee_receipt_Asha_Rani.pdf");
    assert!(receipt
        .lines()
        .iter()
        .any(|(key, value)| key == "Total Payment Dues (₹)" && value == "1500"));
}
