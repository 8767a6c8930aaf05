use chrono::NaiveDate;
use log::info;

use crate::cashflow::CashflowForecaster;
use crate::error::Result;
use crate::llm::client::GeminiClient;
use crate::llm::types::ForecastOutcome;
use crate::prompts::{render_forecast_prompt, SYSTEM_PROMPT_CASHFLOW};
use crate::schema::{CashflowConfig, LiveData};

pub struct ForecastAssistant {
    client: GeminiClient,
    model: String,
}

impl ForecastAssistant {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Computes the cashflow position and asks the model for a verdict on it.
    ///
    /// The forecast is computed before any request is made, so missing sheets
    /// fail fast without touching the network.
    pub async fn run(
        &self,
        live: &LiveData,
        config: &CashflowConfig,
        instructions: Option<&str>,
        now: NaiveDate,
    ) -> Result<ForecastOutcome> {
        let forecast = CashflowForecaster::new(config).forecast(live, now)?;
        let prompt = render_forecast_prompt(&forecast, config, instructions);

        info!(
            "Requesting cashflow verdict from {} (net position {:.0})",
            self.model, forecast.net_position
        );
        let response = self
            .client
            .generate_text(&self.model, SYSTEM_PROMPT_CASHFLOW, &prompt)
            .await?;

        Ok(ForecastOutcome {
            forecast,
            prompt,
            response,
        })
    }
}
