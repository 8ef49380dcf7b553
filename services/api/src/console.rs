use crate::infra::{dispatcher, mail_transport, preview_dispatcher, FilterQuery};
use clap::Args;
use feedesk::config::AppConfig;
use feedesk::error::AppError;
use feedesk::session::FeeSession;
use feedesk::workflows::documents::{
    export_records_csv, export_records_pdf, export_records_xlsx, ExportError,
};
use feedesk::workflows::fees::{format_amount, FeeFilter, PaymentLinker, RecordId};
use feedesk::workflows::notifications::{
    receipt_mail, DispatchSettings, EmailStatus, Language, MailTransport, SmsStatus,
    TemplateKind,
};
use feedesk::workflows::risk::{RiskScorer, RiskSort, DEFAULT_HISTOGRAM_BINS, DEFAULT_TOP};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Accepts `senior-strict` as well as `senior_strict`.
pub(crate) fn parse_choice<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| format!("unknown choice `{raw}`"))
}

#[derive(Args, Debug)]
pub(crate) struct SheetArgs {
    /// Fee sheet to load (.csv or .xlsx)
    #[arg(long)]
    pub(crate) sheet: PathBuf,
    /// Comma-separated classes to keep, e.g. `1,2,KG`
    #[arg(long)]
    pub(crate) classes: Option<String>,
    /// Lower bound on pending dues
    #[arg(long)]
    pub(crate) min_dues: Option<Decimal>,
    /// Upper bound on pending dues
    #[arg(long)]
    pub(crate) max_dues: Option<Decimal>,
    /// Case-insensitive city substring
    #[arg(long)]
    pub(crate) location: Option<String>,
}

impl SheetArgs {
    fn open(&self, config: &AppConfig) -> Result<(FeeSession, FeeFilter), AppError> {
        let linker = PaymentLinker::new(config.school.payment_base_url.clone());
        let session = FeeSession::load(&self.sheet, &linker, config.school.name.clone())?;
        let filter = FilterQuery {
            classes: self.classes.clone(),
            min_dues: self.min_dues,
            max_dues: self.max_dues,
            location: self.location.clone(),
        }
        .into_filter();
        Ok((session, filter))
    }
}

#[derive(Args, Debug)]
pub(crate) struct SummaryArgs {
    #[command(flatten)]
    pub(crate) sheet: SheetArgs,
}

#[derive(Args, Debug)]
pub(crate) struct RiskArgs {
    #[command(flatten)]
    pub(crate) sheet: SheetArgs,
    /// Lowest risk score to show
    #[arg(long, default_value_t = 0.0)]
    pub(crate) min_score: f64,
    /// Highest risk score to show
    #[arg(long, default_value_t = 1.0)]
    pub(crate) max_score: f64,
    /// Sort key: risk-score, dues or past-delay-count
    #[arg(long, value_parser = parse_choice::<RiskSort>, default_value = "risk-score")]
    pub(crate) sort: RiskSort,
    /// Number of students to list
    #[arg(long, default_value_t = DEFAULT_TOP)]
    pub(crate) top: usize,
    /// Print a score histogram with this many bins
    #[arg(long)]
    pub(crate) histogram: Option<Option<usize>>,
}

#[derive(Args, Debug)]
pub(crate) struct NotifyArgs {
    #[command(flatten)]
    pub(crate) sheet: SheetArgs,
    /// english, hindi, marathi or maithili
    #[arg(long, value_parser = parse_choice::<Language>, default_value = "english")]
    pub(crate) language: Language,
    /// standard-reminder, junior-friendly or senior-strict
    #[arg(long, value_parser = parse_choice::<TemplateKind>, default_value = "standard-reminder")]
    pub(crate) template: TemplateKind,
    /// Also send SMS through the configured gateway
    #[arg(long)]
    pub(crate) sms: bool,
    /// Print the message the first due student would get and stop
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Write the outcome log as CSV
    #[arg(long)]
    pub(crate) log_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ReceiptArgs {
    #[command(flatten)]
    pub(crate) sheet: SheetArgs,
    /// Record id as listed by the API, e.g. `ashaverma`
    #[arg(long)]
    pub(crate) id: String,
    /// Directory for the PDF (defaults to the working directory)
    #[arg(long)]
    pub(crate) out_dir: Option<PathBuf>,
    /// E-mail the receipt to the parent using the configured SMTP account
    #[arg(long)]
    pub(crate) email: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) sheet: SheetArgs,
    /// Output file; the extension picks the format (.csv, .xlsx or .pdf)
    #[arg(long)]
    pub(crate) out: PathBuf,
}

pub(crate) fn run_summary(config: &AppConfig, args: SummaryArgs) -> Result<(), AppError> {
    let (session, filter) = args.sheet.open(config)?;
    let summary = session.summary(&filter);

    println!("{} fee summary", session.school_name());
    println!("- Students: {}", summary.total_students);
    println!(
        "- Total pending dues: {}",
        format_amount(summary.total_pending_dues)
    );
    println!("- Defaulters: {}", summary.defaulters);
    if let Some(worst) = &summary.worst_class {
        println!(
            "- Highest dues: class {} ({})",
            worst.class,
            format_amount(worst.dues)
        );
    }

    if !summary.by_class.is_empty() {
        println!("Dues by class:");
        for class in &summary.by_class {
            println!(
                "  - {}: {} across {} students",
                class.class,
                format_amount(class.dues),
                class.due_records
            );
        }
    }
    if !summary.by_city.is_empty() {
        println!("Dues by city:");
        for city in &summary.by_city {
            println!("  - {}: {}", city.city, format_amount(city.dues));
        }
    }

    let missing: Vec<_> = summary
        .missing_values
        .iter()
        .filter(|column| column.missing > 0)
        .collect();
    if !missing.is_empty() {
        println!("Missing values:");
        for column in missing {
            println!("  - {}: {}", column.column, column.missing);
        }
    }
    Ok(())
}

pub(crate) fn run_risk(config: &AppConfig, args: RiskArgs) -> Result<(), AppError> {
    let (session, _) = args.sheet.open(config)?;
    let report = session.score_risk(&RiskScorer::default())?;

    println!(
        "Risk model trained on {} records ({} held out)",
        report.training_records, report.holdout_records
    );
    if let Some(accuracy) = report.holdout_accuracy {
        println!("- Holdout accuracy: {:.0}%", accuracy * 100.0);
    }
    println!("- Features: {}", report.features.join(", "));
    println!("- High-risk students: {}", report.high_risk_count());

    let view = report
        .within(args.min_score, args.max_score)
        .sorted_by(args.sort);
    println!("Top {} students:", args.top.min(view.scores.len()));
    for score in view.top(args.top) {
        println!(
            "  - {} (class {}): score {:.2} | dues {} | delays {}",
            score.name,
            score.class.as_deref().unwrap_or("-"),
            score.score,
            format_amount(score.dues),
            score
                .past_delay_count
                .map_or_else(|| "-".to_string(), |count| count.to_string())
        );
    }

    if let Some(bins) = args.histogram {
        println!("Score distribution:");
        for bin in view.histogram(bins.unwrap_or(DEFAULT_HISTOGRAM_BINS)) {
            println!(
                "  {:.2}-{:.2} | {}",
                bin.lower,
                bin.upper,
                "#".repeat(bin.count)
            );
        }
    }
    Ok(())
}

pub(crate) fn run_notify(config: &AppConfig, args: NotifyArgs) -> Result<(), AppError> {
    let (mut session, filter) = args.sheet.open(config)?;
    let settings = DispatchSettings {
        language: args.language,
        operator_template: args.template,
        send_sms: args.sms,
        ..DispatchSettings::default()
    };

    if args.dry_run {
        match session.preview(&preview_dispatcher(config, settings), &filter) {
            Some(preview) => {
                println!("Preview for {} ({})", preview.record_id, preview.template.label());
                println!("Subject: {}", preview.subject);
                println!("{}", preview.body);
                println!("SMS: {}", preview.sms);
            }
            None => println!("No students with pending dues in this view."),
        }
        return Ok(());
    }

    let dispatcher = dispatcher(config, settings, config.mail.credentials.clone())?;
    let report = session.dispatch(&dispatcher, &filter)?;
    println!(
        "Reminders: {} e-mails sent, {} SMS sent, {} skipped with no dues",
        report.emails_sent, report.sms_sent, report.skipped
    );
    for outcome in &report.outcomes {
        if outcome.email_status == EmailStatus::Failed || outcome.sms_status == SmsStatus::Failed {
            println!(
                "  - {}: {}",
                outcome.student_name,
                outcome
                    .email_error
                    .as_deref()
                    .or(outcome.sms_error.as_deref())
                    .unwrap_or("failed")
            );
        }
    }

    if let Some(path) = args.log_out {
        let bytes = session
            .log()
            .to_csv()
            .map_err(|err| AppError::from(ExportError::from(err)))?;
        std::fs::write(&path, bytes)?;
        println!("Outcome log written to {}", path.display());
    }
    Ok(())
}

pub(crate) fn run_receipt(config: &AppConfig, args: ReceiptArgs) -> Result<(), AppError> {
    let (session, _) = args.sheet.open(config)?;
    let id = RecordId(args.id);
    let receipt = session.receipt(&id)?;
    let pdf = receipt.render_pdf()?;

    let path = args
        .out_dir
        .unwrap_or_else(|| PathBuf::from("."))
        .join(receipt.file_name());
    std::fs::write(&path, &pdf)?;
    println!("Receipt for {} written to {}", receipt.student_name(), path.display());

    if args.email {
        if let Some(record) = session.store().get(&id) {
            let mail = receipt_mail(record, pdf, session.school_name());
            mail_transport(config, config.mail.credentials.clone())?.send(&mail)?;
            println!("Receipt e-mailed to {}", mail.to);
        }
    }
    Ok(())
}

pub(crate) fn run_export(config: &AppConfig, args: ExportArgs) -> Result<(), AppError> {
    let (session, filter) = args.sheet.open(config)?;
    let records = session.filter(&filter);
    let layout = session.store().layout();

    let extension = args
        .out
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let bytes = match extension.as_deref() {
        Some("xlsx") => export_records_xlsx(layout, &records)?,
        Some("pdf") => export_records_pdf(layout, &records)?,
        _ => export_records_csv(layout, &records)?,
    };
    std::fs::write(&args.out, bytes)?;
    println!("{} records written to {}", records.len(), args.out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_accept_kebab_and_snake_case() {
        assert_eq!(
            parse_choice::<TemplateKind>("senior-strict"),
            Ok(TemplateKind::SeniorStrict)
        );
        assert_eq!(
            parse_choice::<RiskSort>("past_delay_count"),
            Ok(RiskSort::PastDelayCount)
        );
        assert_eq!(parse_choice::<Language>("Hindi"), Ok(Language::Hindi));
        assert!(parse_choice::<Language>("klingon").is_err());
    }
}
