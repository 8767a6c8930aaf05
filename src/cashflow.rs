//! Near-term cashflow forecast.
//!
//! Revenue is projected only for autopay customers: their payment is expected
//! a fixed settlement lag after the last service (or, failing that, after the
//! next due date). Committed spend is every recurring bill not yet visible in
//! the bank transactions plus the outstanding credit card balance.

use crate::error::{Result, VersabotError};
use crate::ingestion::{cell_text, HistoryColumns, JobsColumns, RawTable, SkipLog, SkipReason};
use crate::schema::{BillDay, BillWindow, CashflowConfig, LiveData, RecurringBill};
use crate::utils::format_gbp;
use chrono::{Datelike, Days, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bank sheet column holding the signed transaction amount.
pub const BANK_AMOUNT_COLUMN: usize = 1;

const CREDIT_CARD_MARKER: &str = "credit card";

fn customer_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Customer name to "has an active GoCardless/Stripe subscription".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodMap {
    customers: BTreeMap<String, bool>,
}

impl PaymentMethodMap {
    pub fn from_jobs(jobs: &RawTable, name_column: usize) -> Self {
        let cols = JobsColumns::resolve(jobs, name_column);
        let mut customers = BTreeMap::new();

        for row in jobs.data_rows() {
            let name = customer_key(&row.text(Some(cols.name)));
            if name.is_empty() {
                continue;
            }
            let autopay = cols
                .processors
                .iter()
                .any(|&i| row.lower(Some(i)).contains("active"));
            *customers.entry(name).or_insert(false) |= autopay;
        }

        Self { customers }
    }

    pub fn has_autopay(&self, name: &str) -> bool {
        self.customers
            .get(&customer_key(name))
            .copied()
            .unwrap_or(false)
    }

    pub fn autopay_count(&self) -> usize {
        self.customers.values().filter(|&&v| v).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastRule {
    /// Paid a settlement lag after the last service.
    RecentlyServiced,
    /// Paid a settlement lag after the next due date.
    UpcomingDue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingPayment {
    pub customer: String,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub rule: ForecastRule,
}

impl UpcomingPayment {
    pub fn describe(&self) -> String {
        format!(
            "{}: {} expected {}",
            self.customer,
            format_gbp(self.amount),
            self.payment_date.format("%a %d %b")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBill {
    pub name: String,
    pub amount: f64,
    pub day: BillDay,
}

impl PendingBill {
    pub fn describe(&self) -> String {
        let due = match self.day {
            BillDay::DayOfMonth(d) => format!("due on day {}", d),
            BillDay::Weekly(w) => format!("weekly on {}", w),
        };
        format!("{}: {} ({})", self.name, format_gbp(self.amount), due)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowForecast {
    pub as_of: NaiveDate,
    /// Sum of positive bank amounts this month.
    pub mtd_income: f64,
    /// Projected autopay revenue before the tax deduction.
    pub gross_projected_revenue: f64,
    /// Projected autopay revenue after the tax deduction.
    pub projected_revenue: f64,
    pub committed_spend: f64,
    pub net_position: f64,
    pub pending_bills: Vec<PendingBill>,
    /// Outstanding credit card balance counted in committed spend, if any.
    pub credit_card_due: Option<f64>,
    pub upcoming_payments: Vec<UpcomingPayment>,
    pub skipped: SkipLog,
}

impl CashflowForecast {
    pub fn pending_bill_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.pending_bills.iter().map(PendingBill::describe).collect();
        if let Some(balance) = self.credit_card_due {
            lines.push(format!("Credit card balance: {}", format_gbp(balance)));
        }
        lines
    }

    pub fn upcoming_job_lines(&self, limit: usize) -> Vec<String> {
        self.upcoming_payments
            .iter()
            .take(limit)
            .map(UpcomingPayment::describe)
            .collect()
    }
}

/// Sum of positive amounts in the bank sheet; anything else contributes zero.
pub fn realtime_mtd_income(bank: &RawTable) -> f64 {
    bank.data_rows()
        .filter_map(|row| row.number(Some(BANK_AMOUNT_COLUMN)))
        .filter(|&amount| amount > 0.0)
        .sum()
}

/// Every bank cell, lowercased and joined, for "has this been paid" lookups.
pub fn bank_text(bank: &RawTable) -> String {
    bank.data_rows()
        .flat_map(|row| row.cells().iter().map(|c| cell_text(Some(c))))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn bill_in_window(bill: &RecurringBill, window: BillWindow, today: NaiveDate) -> bool {
    match (window, bill.day) {
        (BillWindow::AllUnpaid, _) => true,
        (BillWindow::DayOfMonth { .. }, BillDay::Weekly(_)) => true,
        (BillWindow::DayOfMonth { early_cutoff }, BillDay::DayOfMonth(day)) => {
            day > today.day() || day < early_cutoff
        }
    }
}

/// Recurring bills not found in the bank text and still due under `window`.
pub fn unpaid_bills(
    bills: &[RecurringBill],
    bank_text: &str,
    window: BillWindow,
    today: NaiveDate,
) -> Vec<PendingBill> {
    bills
        .iter()
        .filter(|bill| {
            let key = bill.match_key();
            key.is_empty() || !bank_text.contains(&key)
        })
        .filter(|bill| bill_in_window(bill, window, today))
        .map(|bill| PendingBill {
            name: bill.name.clone(),
            amount: bill.amount,
            day: bill.day,
        })
        .collect()
}

pub struct CashflowForecaster<'a> {
    config: &'a CashflowConfig,
}

impl<'a> CashflowForecaster<'a> {
    pub fn new(config: &'a CashflowConfig) -> Self {
        Self { config }
    }

    /// Runs the forecast on the three sheets of a live payload.
    pub fn forecast(&self, live: &LiveData, now: NaiveDate) -> Result<CashflowForecast> {
        let required = [
            ("bank transactions", &live.bank_raw),
            ("jobs", &live.jobs_raw),
            ("service history", &live.marketing_raw),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, t)| t.as_ref().map_or(true, RawTable::is_empty))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(VersabotError::DataNotReady(format!(
                "missing {}",
                missing.join(", ")
            )));
        }

        match (&live.bank_raw, &live.jobs_raw, &live.marketing_raw) {
            (Some(bank), Some(jobs), Some(history)) => {
                self.forecast_tables(bank, jobs, history, now)
            }
            _ => Err(VersabotError::DataNotReady("sheets not loaded".to_string())),
        }
    }

    pub fn forecast_tables(
        &self,
        bank: &RawTable,
        jobs: &RawTable,
        history: &RawTable,
        now: NaiveDate,
    ) -> Result<CashflowForecast> {
        info!(
            "Forecasting cashflow from {} bank, {} job and {} history rows",
            bank.data_len(),
            jobs.data_len(),
            history.data_len()
        );

        let payment_methods = PaymentMethodMap::from_jobs(jobs, self.config.jobs_name_column);
        let (upcoming_payments, gross_projected_revenue, skipped) =
            self.project_revenue(history, &payment_methods, now)?;
        let projected_revenue = gross_projected_revenue * self.config.tax_retention;

        let text = bank_text(bank);
        let pending_bills = unpaid_bills(
            &self.config.recurring_bills,
            &text,
            self.config.bill_window,
            now,
        );
        let credit_card_due = (self.config.credit_card_balance > 0.0
            && !text.contains(CREDIT_CARD_MARKER))
        .then_some(self.config.credit_card_balance);
        let committed_spend = pending_bills.iter().map(|b| b.amount).sum::<f64>()
            + credit_card_due.unwrap_or(0.0);

        let mtd_income = realtime_mtd_income(bank);
        let net_position = mtd_income + projected_revenue - committed_spend;

        debug!(
            "Cashflow: {} autopay customers, {} upcoming payments, {} pending bills, net {}",
            payment_methods.autopay_count(),
            upcoming_payments.len(),
            pending_bills.len(),
            format_gbp(net_position)
        );

        Ok(CashflowForecast {
            as_of: now,
            mtd_income,
            gross_projected_revenue,
            projected_revenue,
            committed_spend,
            net_position,
            pending_bills,
            credit_card_due,
            upcoming_payments,
            skipped,
        })
    }

    /// Applies the recently-serviced rule, else the upcoming-due rule, to each
    /// autopay customer's history row. Only the first applicable rule is tried.
    fn project_revenue(
        &self,
        history: &RawTable,
        payment_methods: &PaymentMethodMap,
        now: NaiveDate,
    ) -> Result<(Vec<UpcomingPayment>, f64, SkipLog)> {
        let cols = HistoryColumns::resolve(history)?;
        let lag = Days::new(self.config.settlement_lag_days);
        let horizon = now
            .checked_add_days(Days::new(self.config.window_days))
            .unwrap_or(NaiveDate::MAX);

        let mut payments = Vec::new();
        let mut skipped = SkipLog::default();
        let mut gross = 0.0;

        for row in history.data_rows() {
            let customer = row.text(Some(cols.name));
            if !payment_methods.has_autopay(&customer) {
                skipped.record(SkipReason::NoAutopay);
                continue;
            }

            let (base, rule) = if let Some(last) = row.date(cols.last_done) {
                (last, ForecastRule::RecentlyServiced)
            } else if let Some(due) = row.date(cols.next_due) {
                (due, ForecastRule::UpcomingDue)
            } else {
                skipped.record(SkipReason::NoServiceDate);
                continue;
            };

            let Some(payment_date) = base.checked_add_days(lag) else {
                skipped.record(SkipReason::OutsideWindow);
                continue;
            };
            if payment_date < now || payment_date > horizon {
                skipped.record(SkipReason::OutsideWindow);
                continue;
            }

            let Some(amount) = row.number(Some(cols.price)) else {
                skipped.record(SkipReason::MissingPrice);
                continue;
            };

            gross += amount;
            payments.push(UpcomingPayment {
                customer,
                amount,
                payment_date,
                rule,
            });
        }

        payments.sort_by_key(|p| p.payment_date);
        Ok((payments, gross, skipped))
    }
}

pub fn forecast_cashflow(
    live: &LiveData,
    config: &CashflowConfig,
    now: NaiveDate,
) -> Result<CashflowForecast> {
    CashflowForecaster::new(config).forecast(live, now)
}
