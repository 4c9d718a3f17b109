use super::{path, RulesService};
use crate::config::RulesServiceConfig;
use crate::error::{ChargingError, ChargingResult};
use crate::types::Ruleset;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;

/// Blocking HTTP client for the rules service. One attempt per call with
/// the configured timeout; retrying is left to the caller.
pub struct HttpRulesService {
    client: Client,
    config: RulesServiceConfig,
}

impl HttpRulesService {
    pub fn new(config: RulesServiceConfig) -> ChargingResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ChargingError::RulesServiceUnavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, ruleset: Ruleset, financial_year: i32) -> String {
        format!(
            "{}/{}",
            self.config.url.trim_end_matches('/'),
            path(self.config.endpoint(ruleset), financial_year)
        )
    }
}

impl RulesService for HttpRulesService {
    fn calculate(&self, ruleset: Ruleset, financial_year: i32, request: &Value) -> ChargingResult<Value> {
        let url = self.url(ruleset, financial_year);
        log::debug!("rules service request: url={url}");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .map_err(|e| {
                let reason = if e.is_timeout() { "timed out" } else { "request failed" };
                log::warn!("rules service {reason}: url={url} error={e}");
                ChargingError::RulesServiceUnavailable(format!("{reason}: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            log::warn!("rules service rejected request: url={url} status={status}");
            return Err(ChargingError::RulesServiceUnavailable(format!(
                "{status}: {body}"
            )));
        }

        response
            .json::<Value>()
            .map_err(|e| ChargingError::RulesServiceResponse(e.to_string()))
    }
}
