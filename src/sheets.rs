//! Client for the spreadsheet export endpoint (a deployed Apps Script web app).

use crate::error::{Result, VersabotError};
use crate::schema::LiveData;
use log::{info, warn};
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    timeout: Duration,
}

impl Default for SheetsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetsClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// GETs `{gas_url}?token=...` and decodes the payload.
    ///
    /// A payload whose `error` field is set is reported as an upstream failure.
    pub async fn fetch(&self, gas_url: &str, token: &str) -> Result<LiveData> {
        let url = gas_url.trim();
        if url.is_empty() {
            return Err(VersabotError::Config("spreadsheet URL is not set".to_string()));
        }

        let res = self
            .client
            .get(url)
            .query(&[("token", token)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| VersabotError::from_transport(e, self.timeout))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| VersabotError::from_transport(e, self.timeout))?;

        if !status.is_success() {
            return Err(VersabotError::Upstream(format!(
                "spreadsheet endpoint returned {}: {}",
                status, body
            )));
        }

        let live = LiveData::from_json(&body)?;
        if let Some(err) = live.error.as_deref().filter(|e| !e.trim().is_empty()) {
            warn!("Spreadsheet endpoint reported an error: {}", err);
            return Err(VersabotError::Upstream(err.to_string()));
        }

        info!(
            "Fetched live data (marketing: {}, jobs: {}, bank: {} rows)",
            live.marketing_raw.as_ref().map_or(0, |t| t.data_len()),
            live.jobs_raw.as_ref().map_or(0, |t| t.data_len()),
            live.bank_raw.as_ref().map_or(0, |t| t.data_len()),
        );
        Ok(live)
    }
}
