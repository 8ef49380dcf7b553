use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use feedesk::config::{AppConfig, MailCredentials};
use feedesk::error::AppError;
use feedesk::session::{FeeSession, SessionError};
use feedesk::workflows::fees::{DuesRange, FeeFilter, PaymentLinker};
use feedesk::workflows::notifications::{
    DispatchError, DispatchSettings, Fast2SmsGateway, MailTransport, NotificationDispatcher,
    SmsGateway, SmtpMailTransport,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The single operator session behind the HTTP surface.
#[derive(Clone)]
pub(crate) struct DeskState {
    pub(crate) config: Arc<AppConfig>,
    pub(crate) linker: PaymentLinker,
    session: Arc<Mutex<Option<FeeSession>>>,
}

impl DeskState {
    pub(crate) fn new(config: AppConfig) -> Self {
        let linker = PaymentLinker::new(config.school.payment_base_url.clone());
        Self {
            config: Arc::new(config),
            linker,
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// A poisoned lock still holds a consistent session: every mutation is a single call.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<FeeSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn replace(&self, session: FeeSession) {
        *self.lock() = Some(session);
    }

    pub(crate) fn with_session<T>(
        &self,
        action: impl FnOnce(&mut FeeSession) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut guard = self.lock();
        let session = guard.as_mut().ok_or(SessionError::NotLoaded)?;
        action(session)
    }
}

/// Query-string form of the dashboard filter (`classes=1,2&min_dues=100&location=patna`).
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FilterQuery {
    #[serde(default)]
    pub(crate) classes: Option<String>,
    #[serde(default)]
    pub(crate) min_dues: Option<Decimal>,
    #[serde(default)]
    pub(crate) max_dues: Option<Decimal>,
    #[serde(default)]
    pub(crate) location: Option<String>,
}

impl FilterQuery {
    pub(crate) fn into_filter(self) -> FeeFilter {
        let classes = self.classes.map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|class| !class.is_empty())
                .map(str::to_string)
                .collect()
        });
        let dues = match (self.min_dues, self.max_dues) {
            (None, None) => None,
            (min, max) => Some(DuesRange {
                min: min.unwrap_or(Decimal::MIN),
                max: max.unwrap_or(Decimal::MAX),
            }),
        };
        FeeFilter {
            classes,
            dues,
            location: self.location,
        }
    }
}

/// Operator credentials supplied with a send request; config credentials are the fallback.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CredentialsInput {
    #[serde(default)]
    pub(crate) sender_email: Option<String>,
    #[serde(default)]
    pub(crate) app_password: Option<String>,
}

impl CredentialsInput {
    pub(crate) fn resolve(self, config: &AppConfig) -> Option<MailCredentials> {
        match (self.sender_email, self.app_password) {
            (Some(username), Some(password))
                if !username.trim().is_empty() && !password.trim().is_empty() =>
            {
                Some(MailCredentials { username, password })
            }
            _ => config.mail.credentials.clone(),
        }
    }
}

/// Builds the SMTP transport. Must run on a blocking thread.
pub(crate) fn mail_transport(
    config: &AppConfig,
    credentials: Option<MailCredentials>,
) -> Result<Arc<dyn MailTransport>, AppError> {
    let credentials = credentials.ok_or(DispatchError::MissingCredentials)?;
    let transport = SmtpMailTransport::new(&config.mail, &credentials)
        .map_err(DispatchError::MailSetup)?;
    Ok(Arc::new(transport))
}

/// Builds the SMS gateway when an API key is configured. Must run on a blocking thread.
pub(crate) fn sms_gateway(config: &AppConfig) -> Result<Option<Arc<dyn SmsGateway>>, AppError> {
    let gateway = Fast2SmsGateway::from_config(&config.sms)?;
    Ok(gateway.map(|gateway| Arc::new(gateway) as Arc<dyn SmsGateway>))
}

/// Dispatcher for one run; the school name and bracket toggle come from config.
pub(crate) fn dispatcher(
    config: &AppConfig,
    settings: DispatchSettings,
    credentials: Option<MailCredentials>,
) -> Result<NotificationDispatcher, AppError> {
    let settings = DispatchSettings {
        school_name: config.school.name.clone(),
        bracket_override: config.school.bracket_override,
        ..settings
    };
    let send_sms = settings.send_sms;
    let mut dispatcher =
        NotificationDispatcher::new(settings).with_mail(mail_transport(config, credentials)?);
    if send_sms {
        if let Some(gateway) = sms_gateway(config)? {
            dispatcher = dispatcher.with_sms(gateway);
        }
    }
    Ok(dispatcher)
}

/// Preview needs no transports.
pub(crate) fn preview_dispatcher(
    config: &AppConfig,
    settings: DispatchSettings,
) -> NotificationDispatcher {
    NotificationDispatcher::new(DispatchSettings {
        school_name: config.school.name.clone(),
        bracket_override: config.school.bracket_override,
        ..settings
    })
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    use feedesk::config::{
        AppEnvironment, MailConfig, SchoolConfig, ServerConfig, SmsConfig, TelemetryConfig,
    };
    AppConfig {
        environment: AppEnvironment::Test,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        telemetry: TelemetryConfig {
            log_level: "info".to_string(),
        },
        school: SchoolConfig::default(),
        mail: MailConfig {
            host: "smtp.example.com".to_string(),
            port: 465,
            credentials: None,
        },
        sms: SmsConfig {
            endpoint: "https://sms.example/bulk".to_string(),
            api_key: None,
        },
    }
}
