use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::SmsConfig;

use super::transport::{SmsGateway, TransportError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Fast2SMS bulk route client. Must be built and used off the async runtime.
pub struct Fast2SmsGateway {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GatewayReply {
    #[serde(rename = "return", default)]
    accepted: bool,
}

impl Fast2SmsGateway {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| TransportError::Http(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// `None` when no API key is configured, which disables SMS.
    pub fn from_config(config: &SmsConfig) -> Result<Option<Self>, TransportError> {
        match &config.api_key {
            Some(key) => Self::new(config.endpoint.clone(), key.clone()).map(Some),
            None => Ok(None),
        }
    }
}

impl SmsGateway for Fast2SmsGateway {
    fn send(&self, phone: &str, message: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("authorization", &self.api_key)
            .form(&[
                ("route", "q"),
                ("message", message),
                ("language", "english"),
                ("flash", "0"),
                ("numbers", phone),
            ])
            .send()
            .map_err(|err| TransportError::Http(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| TransportError::Http(err.to_string()))?;
        debug!(status = status.as_u16(), body = %body, "sms gateway responded");

        if reply_accepted(status, &body) {
            Ok(())
        } else {
            Err(TransportError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn reply_accepted(status: StatusCode, body: &str) -> bool {
    status == StatusCode::OK
        && serde_json::from_str::<GatewayReply>(body)
            .map(|reply| reply.accepted)
            .unwrap_or(false)
}

impl fmt::Debug for Fast2SmsGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fast2SmsGateway")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
