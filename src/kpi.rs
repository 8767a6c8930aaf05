use crate::marketing::MarketingReport;
use crate::schema::{LiveData, Targets};
use crate::utils::format_gbp;
use serde::{Deserialize, Serialize};

/// Debtors above this amount are flagged on the dashboard.
pub const DEBTORS_ALERT_THRESHOLD: f64 = 5_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetProgress {
    pub label: String,
    pub current: f64,
    pub target: f64,
    /// Percentage of target reached, capped at 100.
    pub percent: f64,
}

impl TargetProgress {
    pub fn new(label: impl Into<String>, current: f64, target: f64) -> Self {
        let percent = if target > 0.0 {
            (current / target * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            label: label.into(),
            current,
            target,
            percent,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} of {} ({:.0}%)",
            self.label,
            format_gbp(self.current),
            format_gbp(self.target),
            self.percent
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub monthly: TargetProgress,
    pub weekly: TargetProgress,
    pub debtors_total: f64,
    pub debtors_alert: bool,
    pub new_customer_value: f64,
    pub churn_count: u32,
    pub churn_alert: bool,
}

impl KpiSummary {
    /// Missing `financials`/`customers` objects read as zeros.
    pub fn from_live_data(live: &LiveData, targets: &Targets) -> Self {
        let financials = live.financials.clone().unwrap_or_default();
        let customers = live.customers.clone().unwrap_or_default();

        Self {
            monthly: TargetProgress::new("Monthly Turnover", financials.turnover_mtd, targets.monthly),
            weekly: TargetProgress::new("Weekly Turnover", financials.turnover_wtd, targets.weekly),
            debtors_total: financials.debtors_total,
            debtors_alert: financials.debtors_total > DEBTORS_ALERT_THRESHOLD,
            new_customer_value: customers.new_value_4w,
            churn_count: customers.churn_count,
            churn_alert: customers.churn_count > 0,
        }
    }
}

/// Headline figures of the marketing tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub total_active: u32,
    pub avg_retention: u32,
}

impl AnalyticsOverview {
    pub fn from_report(report: &MarketingReport) -> Self {
        let total_active = report.sources.iter().map(|s| s.active).sum();
        let avg_retention = if report.sources.is_empty() {
            0
        } else {
            let sum: u32 = report.sources.iter().map(|s| s.retention_rate).sum();
            (sum as f64 / report.sources.len() as f64).round() as u32
        };

        Self {
            total_active,
            avg_retention,
        }
    }
}
