//! # versaBOT Insights
//!
//! Analytics and cashflow core for a spreadsheet-backed window-cleaning business
//! dashboard. The spreadsheet export endpoint returns raw sheet rows; this crate
//! turns them into the figures the dashboard shows.
//!
//! ## Core Concepts
//!
//! - **Raw tables**: header row plus positional JSON cells, read through typed column schemas
//! - **Marketing analytics**: per-source retention, churn and average customer lifetime,
//!   plus a linear projection towards the yearly active-customer goal
//! - **Cashflow forecast**: autopay revenue expected over the next three weeks after tax,
//!   against unpaid recurring bills and the credit card balance
//! - **Skip log**: every row an engine ignores is tallied by reason instead of silently dropped
//!
//! ## Example
//!
//! ```rust,ignore
//! use versabot_insights::*;
//! use chrono::NaiveDate;
//!
//! let live = LiveData::from_json(&body)?;
//! let settings = DashboardSettings::default();
//! let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
//!
//! let snapshot = build_dashboard(live.clone(), &settings, today)?;
//! if let Some(report) = snapshot.analytics.report() {
//!     println!("{} active customers", report.total_active);
//! }
//!
//! let forecast = forecast_from_settings(&live, &settings, today)?;
//! println!("Net position: {}", format_gbp(forecast.net_position));
//! ```

pub mod cashflow;
pub mod dashboard;
pub mod error;
pub mod ingestion;
pub mod kpi;
pub mod marketing;
pub mod prompts;
pub mod schema;
pub mod store;
pub mod utils;

#[cfg(feature = "remote")]
pub mod context;
#[cfg(feature = "remote")]
pub mod llm;
#[cfg(feature = "remote")]
pub mod sheets;

pub use cashflow::{
    forecast_cashflow, CashflowForecast, CashflowForecaster, ForecastRule, PaymentMethodMap,
    PendingBill, UpcomingPayment,
};
pub use dashboard::{AnalyticsState, DashboardSnapshot};
pub use error::{Result, VersabotError};
pub use ingestion::{JobStatePolicy, RawTable, SkipLog, SkipReason};
pub use kpi::{AnalyticsOverview, KpiSummary, TargetProgress};
pub use marketing::{
    analyze_marketing, GrowthProjection, GrowthStatus, MarketingAnalyzer, MarketingReport,
    MarketingSource, SourceSummary,
};
pub use prompts::render_forecast_prompt;
pub use schema::*;
pub use store::{JsonFileStore, MemoryStore, SettingsStore};
pub use utils::{format_gbp, parse_cell_date, parse_date};

#[cfg(feature = "remote")]
pub use context::{AppContext, DashboardState};
#[cfg(feature = "remote")]
pub use llm::{ForecastAssistant, ForecastOutcome, GeminiClient};
#[cfg(feature = "remote")]
pub use sheets::SheetsClient;

use chrono::NaiveDate;
use log::{debug, info};

pub struct InsightsProcessor;

impl InsightsProcessor {
    /// Validates settings, then derives the full dashboard snapshot from one payload.
    pub fn snapshot(
        live: LiveData,
        settings: &DashboardSettings,
        now: NaiveDate,
    ) -> Result<DashboardSnapshot> {
        settings.validate()?;
        debug!(
            "Payload carries marketing: {}, jobs: {}, bank: {}",
            live.marketing_raw.is_some(),
            live.jobs_raw.is_some(),
            live.bank_raw.is_some()
        );
        Ok(DashboardSnapshot::build(live, settings, now))
    }

    /// Validates settings, then runs the cashflow forecast with the configured bills.
    pub fn forecast(
        live: &LiveData,
        settings: &DashboardSettings,
        now: NaiveDate,
    ) -> Result<CashflowForecast> {
        settings.validate()?;
        info!(
            "Forecasting with {} recurring bills and {:?} bill window",
            settings.recurring_bills.len(),
            settings.bill_window
        );
        forecast_cashflow(live, &settings.cashflow_config(), now)
    }
}

pub fn build_dashboard(
    live: LiveData,
    settings: &DashboardSettings,
    now: NaiveDate,
) -> Result<DashboardSnapshot> {
    InsightsProcessor::snapshot(live, settings, now)
}

pub fn forecast_from_settings(
    live: &LiveData,
    settings: &DashboardSettings,
    now: NaiveDate,
) -> Result<CashflowForecast> {
    InsightsProcessor::forecast(live, settings, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> LiveData {
        LiveData::from_json(
            &json!({
                "marketing_raw": [
                    ["Name", "Source", "Created", "Last Done", "Next Due", "Price", "State", "Job State", "Services", "Frequency"],
                    ["Alice Smith", "LSA", "2026-01-20", "2026-02-25", "2026-03-25", "£30", "Active", "", "Window Cleaning", "4 weekly"],
                    ["Bob Jones", "Leaflet", "02/02/2026", "", "2026-03-10", 45, "Active", "", "Window Cleaning", "8 weekly"],
                    ["Cara Wu", "Website", "2026-02-01", "2026-02-20", "", "20", "Inactive", "", "Window Cleaning", "4 weekly"]
                ],
                "jobs_raw": [
                    ["Customer", "GoCardless Status", "Stripe Status"],
                    ["Alice Smith", "Active", ""],
                    ["Bob Jones", "", "active"],
                    ["Cara Wu", "", ""]
                ],
                "bank_raw": [
                    ["Description", "Amount", "Date"],
                    ["CUSTOMER PAYMENT", "1,200.00", "2026-03-01"],
                    ["RENT MARCH", "-900", "2026-03-01"]
                ],
                "financials": { "turnover_mtd": 1200, "turnover_wtd": 300, "debtors_total": 150 }
            })
            .to_string(),
        )
        .unwrap()
    }

    fn settings() -> DashboardSettings {
        DashboardSettings {
            gas_url: "https://script.google.com/macros/s/abc/exec".to_string(),
            credit_card_balance: 400.0,
            recurring_bills: vec![
                RecurringBill::new(BillDay::DayOfMonth(1), "Rent", 900.0),
                RecurringBill::new(BillDay::DayOfMonth(15), "Insurance", 60.0),
            ],
            ..DashboardSettings::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn test_end_to_end_dashboard() {
        let snapshot = build_dashboard(payload(), &settings(), today()).unwrap();
        let report = snapshot.analytics.report().unwrap();
        assert_eq!(report.total_active, 2);
        assert_eq!(report.source(MarketingSource::Website).unwrap().churn, 1);
        assert!((snapshot.kpis.monthly.percent - 6.0).abs() < 1e-9);
        assert!(snapshot.forecast_ready());
    }

    #[test]
    fn test_end_to_end_forecast() {
        let forecast = forecast_from_settings(&payload(), &settings(), today()).unwrap();

        assert_eq!(forecast.mtd_income, 1200.0);
        // Alice: serviced 25 Feb, paid 4 Mar. Bob: due 10 Mar, paid 17 Mar.
        assert_eq!(forecast.upcoming_payments.len(), 2);
        assert_eq!(forecast.gross_projected_revenue, 75.0);
        assert!((forecast.projected_revenue - 61.5).abs() < 1e-9);
        // Rent is in the bank; insurance and the card are not.
        assert_eq!(forecast.committed_spend, 460.0);
        assert!((forecast.net_position - (1200.0 + 61.5 - 460.0)).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let bad = DashboardSettings {
            credit_card_balance: -5.0,
            ..settings()
        };
        assert!(matches!(
            build_dashboard(payload(), &bad, today()),
            Err(VersabotError::Config(_))
        ));
        assert!(matches!(
            forecast_from_settings(&payload(), &bad, today()),
            Err(VersabotError::Config(_))
        ));
    }
}
