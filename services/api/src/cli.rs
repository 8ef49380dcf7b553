use crate::console::{
    run_export, run_notify, run_receipt, run_risk, run_summary, ExportArgs, NotifyArgs,
    ReceiptArgs, RiskArgs, SummaryArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use feedesk::config::AppConfig;
use feedesk::error::AppError;
use feedesk::telemetry::{self, LogSink};

#[derive(Parser, Debug)]
#[command(
    name = "Fee Desk",
    about = "Track school fee dues, send reminders and run admissions from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print dashboard figures for a fee sheet
    Summary(SummaryArgs),
    /// Train the late-payment model and list the riskiest students
    Risk(RiskArgs),
    /// Preview or send fee reminders to parents with pending dues
    Notify(NotifyArgs),
    /// Write (and optionally e-mail) a PDF fee receipt for one student
    Receipt(ReceiptArgs),
    /// Export the filtered sheet as CSV, XLSX or PDF
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        console_command => run_console(console_command),
    }
}

fn run_console(command: Command) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Console)?;

    match command {
        Command::Serve(_) => Ok(()),
        Command::Summary(args) => run_summary(&config, args),
        Command::Risk(args) => run_risk(&config, args),
        Command::Notify(args) => run_notify(&config, args),
        Command::Receipt(args) => run_receipt(&config, args),
        Command::Export(args) => run_export(&config, args),
    }
}
