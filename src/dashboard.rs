//! Everything the dashboard displays after one refresh, built from a single payload.

use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::kpi::{AnalyticsOverview, KpiSummary};
use crate::marketing::{analyze_marketing, MarketingReport};
use crate::schema::{DashboardSettings, LiveData};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalyticsState {
    /// The payload carried no marketing rows.
    NotLoaded,
    Ready {
        report: MarketingReport,
        overview: AnalyticsOverview,
    },
    /// Schema diagnostic, shown in place of the analytics tab.
    Failed { message: String },
}

impl AnalyticsState {
    pub fn report(&self) -> Option<&MarketingReport> {
        match self {
            Self::Ready { report, .. } => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub as_of: NaiveDate,
    pub live: LiveData,
    pub kpis: KpiSummary,
    pub analytics: AnalyticsState,
}

impl DashboardSnapshot {
    /// Derives analytics and KPIs from a payload. Never fails: a broken marketing
    /// sheet only affects the analytics section.
    pub fn build(live: LiveData, settings: &DashboardSettings, now: NaiveDate) -> Self {
        let kpis = KpiSummary::from_live_data(&live, &settings.targets);

        let analytics = match live.marketing_raw.as_ref().filter(|t| !t.is_empty()) {
            None => AnalyticsState::NotLoaded,
            Some(table) => match analyze_marketing(table, &settings.analytics_config(), now) {
                Ok(report) => {
                    let overview = AnalyticsOverview::from_report(&report);
                    AnalyticsState::Ready { report, overview }
                }
                Err(e) => {
                    warn!("Marketing analytics unavailable: {}", e);
                    AnalyticsState::Failed {
                        message: e.to_string(),
                    }
                }
            },
        };

        info!(
            "Built dashboard snapshot for {} (monthly progress {:.0}%)",
            now, kpis.monthly.percent
        );

        Self {
            as_of: now,
            live,
            kpis,
            analytics,
        }
    }

    /// True when every sheet the cashflow forecast reads has rows.
    pub fn forecast_ready(&self) -> bool {
        [&self.live.bank_raw, &self.live.jobs_raw, &self.live.marketing_raw]
            .iter()
            .all(|t| t.as_ref().is_some_and(|t| !t.is_empty()))
    }
}
