//! Per-source retention analytics and the growth-target projection.
//!
//! Only 4- and 8-weekly window cleaning customers created on or after the
//! tracking start are counted. A customer is active when its lifecycle state
//! is `active` and no job state is set; `inactive` customers count as churn and
//! contribute their lifespan in whole months.

use crate::error::Result;
use crate::ingestion::{MarketingColumns, RawTable, SkipLog, SkipReason};
use crate::schema::AnalyticsConfig;
use crate::utils::{days_between, months_between, rounded_percent};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarketingSource {
    Lsa,
    FacebookAds,
    Website,
    Leaflet,
    Canvassed,
    SocialMedia,
    Google,
    Other,
}

impl MarketingSource {
    /// Catalog order; `Other` always last.
    pub const ALL: [MarketingSource; 8] = [
        Self::Lsa,
        Self::FacebookAds,
        Self::Website,
        Self::Leaflet,
        Self::Canvassed,
        Self::SocialMedia,
        Self::Google,
        Self::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lsa => "LSA",
            Self::FacebookAds => "Facebook Ads",
            Self::Website => "Website",
            Self::Leaflet => "Leaflet",
            Self::Canvassed => "Canvassed",
            Self::SocialMedia => "Social Media",
            Self::Google => "Google",
            Self::Other => "Other",
        }
    }

    /// Case-insensitive exact match on the trimmed name; anything else is `Other`.
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|s| *s != Self::Other && s.name().eq_ignore_ascii_case(raw))
            .unwrap_or(Self::Other)
    }
}

impl fmt::Display for MarketingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default)]
struct SourceStats {
    active: u32,
    churn: u32,
    lifespans: Vec<i32>,
}

impl SourceStats {
    fn finalize(self, source: MarketingSource) -> SourceSummary {
        let total = self.active + self.churn;
        let avg_lifetime = if self.lifespans.is_empty() {
            0
        } else {
            let sum: i64 = self.lifespans.iter().map(|&m| m as i64).sum();
            (sum as f64 / self.lifespans.len() as f64).round() as u32
        };

        SourceSummary {
            source,
            name: source.name().to_string(),
            active: self.active,
            churn: self.churn,
            total,
            retention_rate: rounded_percent(self.active, total),
            avg_lifetime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: MarketingSource,
    pub name: String,
    pub active: u32,
    pub churn: u32,
    pub total: u32,
    /// Rounded percentage of active over active + churn.
    pub retention_rate: u32,
    /// Rounded mean lifespan of churned customers, in months.
    pub avg_lifetime: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthStatus {
    Ahead,
    Behind,
}

impl fmt::Display for GrowthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ahead => f.write_str("Ahead"),
            Self::Behind => f.write_str("Behind"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthProjection {
    pub actual: i64,
    pub target: i64,
    pub difference: i64,
    pub status: GrowthStatus,
}

impl GrowthProjection {
    /// Linear target between the baseline on `tracking_start` and the goal on
    /// `growth_end`, compared with baseline plus the new actives counted so far.
    pub fn compute(config: &AnalyticsConfig, new_actives: u32, now: NaiveDate) -> Self {
        let baseline = config.baseline_customers as f64;
        let span_days = days_between(config.tracking_start, config.growth_end);
        let daily_rate = if span_days > 0 {
            (config.goal_customers as f64 - baseline) / span_days as f64
        } else {
            0.0
        };

        let elapsed = days_between(config.tracking_start, now).max(0) as f64;
        let target = (baseline + elapsed * daily_rate).floor() as i64;
        let actual = config.baseline_customers as i64 + new_actives as i64;
        let difference = actual - target;

        Self {
            actual,
            target,
            difference,
            status: if difference >= 0 {
                GrowthStatus::Ahead
            } else {
                GrowthStatus::Behind
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingReport {
    /// One entry per source, sorted by active count (descending).
    pub sources: Vec<SourceSummary>,
    pub total_active: u32,
    pub growth: GrowthProjection,
    pub rows_scanned: usize,
    pub skipped: SkipLog,
}

impl MarketingReport {
    pub fn source(&self, source: MarketingSource) -> Option<&SourceSummary> {
        self.sources.iter().find(|s| s.source == source)
    }
}

pub struct MarketingAnalyzer<'a> {
    config: &'a AnalyticsConfig,
}

impl<'a> MarketingAnalyzer<'a> {
    pub fn new(config: &'a AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, table: &RawTable, now: NaiveDate) -> Result<MarketingReport> {
        let cols = MarketingColumns::resolve(table, self.config.job_state_policy).map_err(|e| {
            warn!("Marketing analytics aborted: {}", e);
            e
        })?;

        info!("Analyzing {} marketing history rows", table.data_len());

        let mut stats: BTreeMap<MarketingSource, SourceStats> = MarketingSource::ALL
            .into_iter()
            .map(|s| (s, SourceStats::default()))
            .collect();
        let mut skipped = SkipLog::default();
        let mut total_active = 0u32;

        for row in table.data_rows() {
            let Some(created) = row.date(cols.created) else {
                skipped.record(SkipReason::UnparseableCreated);
                continue;
            };
            if created < self.config.tracking_start {
                skipped.record(SkipReason::BeforeTrackingStart);
                continue;
            }

            if !row.lower(cols.service).contains("window cleaning") {
                skipped.record(SkipReason::NotWindowCleaning);
                continue;
            }
            let frequency = row.lower(cols.frequency);
            if !(frequency.contains('4') || frequency.contains('8')) {
                skipped.record(SkipReason::UnsupportedFrequency);
                continue;
            }

            let source = MarketingSource::from_raw(&row.text(Some(cols.source)));
            let state = row.lower(Some(cols.state));
            let entry = stats.entry(source).or_default();

            match state.as_str() {
                "active" if row.text(cols.job_state).is_empty() => {
                    entry.active += 1;
                    total_active += 1;
                }
                "active" => skipped.record(SkipReason::ActiveWithOpenJob),
                "inactive" => {
                    entry.churn += 1;
                    if let Some(last_done) = row.date(cols.last_done) {
                        let months = months_between(created, last_done);
                        if months > 0 {
                            entry.lifespans.push(months);
                        }
                    }
                }
                _ => skipped.record(SkipReason::OtherLifecycleState),
            }
        }

        let mut sources: Vec<SourceSummary> = stats
            .into_iter()
            .map(|(source, acc)| acc.finalize(source))
            .collect();
        // Stable: ties keep catalog order.
        sources.sort_by(|a, b| b.active.cmp(&a.active));

        let growth = GrowthProjection::compute(self.config, total_active, now);

        debug!(
            "Marketing pass: {} active, growth {} ({:+}), {} rows skipped",
            total_active,
            growth.status,
            growth.difference,
            skipped.total()
        );
        for (reason, count) in skipped.iter() {
            debug!("  skipped {} row(s): {}", count, reason);
        }

        Ok(MarketingReport {
            sources,
            total_active,
            growth,
            rows_scanned: table.data_len(),
            skipped,
        })
    }
}

pub fn analyze_marketing(
    table: &RawTable,
    config: &AnalyticsConfig,
    now: NaiveDate,
) -> Result<MarketingReport> {
    MarketingAnalyzer::new(config).analyze(table, now)
}
