use crate::error::{Result, VersabotError};
use crate::ingestion::{JobStatePolicy, RawTable};
use chrono::{NaiveDate, Weekday};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MONTHLY_TARGET: f64 = 20_000.0;
pub const DEFAULT_WEEKLY_TARGET: f64 = 5_000.0;
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Payload returned by the spreadsheet export endpoint. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveData {
    pub marketing_raw: Option<RawTable>,
    pub jobs_raw: Option<RawTable>,
    pub bank_raw: Option<RawTable>,
    pub error: Option<String>,
    pub financials: Option<Financials>,
    pub customers: Option<Customers>,
}

impl LiveData {
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Financials {
    pub turnover_mtd: f64,
    pub turnover_wtd: f64,
    pub debtors_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customers {
    pub new_value_4w: f64,
    pub churn_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BillDay {
    #[schemars(description = "Day of the month the bill leaves the account (1-31)")]
    DayOfMonth(u32),

    #[schemars(description = "Weekly bill taken on this weekday (Mon..Sun)")]
    Weekly(#[schemars(with = "String")] Weekday),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecurringBill {
    pub day: BillDay,

    #[schemars(
        description = "Bill name. The first word is matched against bank transactions to detect payment (e.g. 'Vodafone contract')"
    )]
    pub name: String,

    #[schemars(description = "Amount in GBP")]
    pub amount: f64,
}

impl RecurringBill {
    pub fn new(day: BillDay, name: impl Into<String>, amount: f64) -> Self {
        Self {
            day,
            name: name.into(),
            amount,
        }
    }

    /// Lowercased first word of the name, used to look for the payment in bank text.
    pub fn match_key(&self) -> String {
        self.name
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// Decides which unpaid bills still fall inside the forecast window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BillWindow {
    /// Every bill not yet seen in the bank text counts as committed.
    #[default]
    AllUnpaid,

    /// Only bills whose day is later this month, or early next month
    /// (day below `early_cutoff`), count as committed.
    DayOfMonth { early_cutoff: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Targets {
    #[schemars(description = "Monthly turnover goal in GBP")]
    pub monthly: f64,
    #[schemars(description = "Weekly turnover goal in GBP")]
    pub weekly: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            monthly: DEFAULT_MONTHLY_TARGET,
            weekly: DEFAULT_WEEKLY_TARGET,
        }
    }
}

/// User-editable dashboard settings, persisted by a [`crate::store::SettingsStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DashboardSettings {
    #[schemars(description = "Spreadsheet export (Apps Script) URL. Empty until configured.")]
    pub gas_url: String,

    pub targets: Targets,

    #[schemars(
        description = "Outstanding credit card balance, committed unless a 'credit card' payment appears in the bank data"
    )]
    pub credit_card_balance: f64,

    pub recurring_bills: Vec<RecurringBill>,

    #[schemars(description = "Free-text instructions appended to the forecast prompt")]
    pub prompt_instructions: Option<String>,

    pub job_state_policy: JobStatePolicy,

    pub bill_window: BillWindow,

    #[schemars(description = "Text-generation model used for forecasts")]
    pub model: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            gas_url: String::new(),
            targets: Targets::default(),
            credit_card_balance: 0.0,
            recurring_bills: Vec::new(),
            prompt_instructions: None,
            job_state_policy: JobStatePolicy::default(),
            bill_window: BillWindow::default(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl DashboardSettings {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardSettings)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn is_configured(&self) -> bool {
        !self.gas_url.trim().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.gas_url.trim();
        if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(VersabotError::Config(format!(
                "data source URL must start with http:// or https://, got '{}'",
                url
            )));
        }

        if self.targets.monthly < 0.0 || self.targets.weekly < 0.0 {
            return Err(VersabotError::Config(
                "turnover targets cannot be negative".to_string(),
            ));
        }

        if self.credit_card_balance < 0.0 {
            return Err(VersabotError::Config(
                "credit card balance cannot be negative".to_string(),
            ));
        }

        for bill in &self.recurring_bills {
            if bill.match_key().is_empty() {
                return Err(VersabotError::Config(
                    "recurring bill needs a name".to_string(),
                ));
            }
            if let BillDay::DayOfMonth(day) = bill.day {
                if !(1..=31).contains(&day) {
                    return Err(VersabotError::Config(format!(
                        "bill '{}' has invalid day of month {}",
                        bill.name, day
                    )));
                }
            }
        }

        if self.model.trim().is_empty() {
            return Err(VersabotError::Config("model name is empty".to_string()));
        }

        Ok(())
    }

    pub fn analytics_config(&self) -> AnalyticsConfig {
        AnalyticsConfig {
            job_state_policy: self.job_state_policy,
            ..AnalyticsConfig::default()
        }
    }

    pub fn cashflow_config(&self) -> CashflowConfig {
        CashflowConfig {
            bill_window: self.bill_window,
            credit_card_balance: self.credit_card_balance,
            recurring_bills: self.recurring_bills.clone(),
            ..CashflowConfig::default()
        }
    }
}

/// Inputs of the marketing analytics pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Rows created before this date are ignored; also the growth line's start.
    pub tracking_start: NaiveDate,
    pub growth_end: NaiveDate,
    pub baseline_customers: u32,
    pub goal_customers: u32,
    pub job_state_policy: JobStatePolicy,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            tracking_start: NaiveDate::from_ymd_opt(2026, 1, 12).expect("valid anchor date"),
            growth_end: NaiveDate::from_ymd_opt(2026, 12, 31).expect("valid anchor date"),
            baseline_customers: 814,
            goal_customers: 1600,
            job_state_policy: JobStatePolicy::Strict,
        }
    }
}

/// Inputs of the cashflow forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowConfig {
    /// Days between service (or due date) and the automated payment landing.
    pub settlement_lag_days: u64,
    /// Forward horizon a forecast payment must fall in.
    pub window_days: u64,
    /// Share of projected revenue kept after tax/VAT.
    pub tax_retention: f64,
    /// Column of the jobs sheet holding the customer name.
    pub jobs_name_column: usize,
    pub bill_window: BillWindow,
    pub credit_card_balance: f64,
    pub recurring_bills: Vec<RecurringBill>,
    /// How many upcoming jobs are itemised in the prompt.
    pub upcoming_job_sample: usize,
}

impl Default for CashflowConfig {
    fn default() -> Self {
        Self {
            settlement_lag_days: 7,
            window_days: 21,
            tax_retention: 0.82,
            jobs_name_column: 0,
            bill_window: BillWindow::AllUnpaid,
            credit_card_balance: 0.0,
            recurring_bills: Vec::new(),
            upcoming_job_sample: 10,
        }
    }
}
