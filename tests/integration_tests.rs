use chrono::{Days, NaiveDate};
use versabot_insights::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Reads a CSV fixture into a table, first line as headers.
fn table_from_csv(text: &str) -> RawTable {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    RawTable::from_strings(rows)
}

const MARKETING_CSV: &str = "\
Name,Source,Created,Last Done,Next Due,Price,State,Job State,Services,Frequency
Ann Hale,Google,2026-01-14,,2026-03-02,25,Active,,Window Cleaning,4 Weekly
Ben Ito,Google,15/01/2026,2026-04-18,,30,Inactive,,Window Cleaning,8 Weekly
Cal Dee,LSA,Jan 20 2026,,2026-03-05,40,Active,,Window Cleaning,4 weekly
Dot Eve,Facebook Ads,2026-02-01,2026-02-27,,22,Active,,Window Cleaning + Gutters,8 weekly
Eli Fox,Leaflet,2026-02-02,2026-05-20,,18,Inactive,,Window Cleaning,4 weekly
Fay Gil,Canvassed,2026-02-03,,,35,Active,Booked,Window Cleaning,4 weekly
Gus Hay,Website,2025-12-30,,,20,Active,,Window Cleaning,4 weekly
Hal Ivy,Social Media,2026-02-05,,,20,Active,,Conservatory Roof,4 weekly
Ida Joy,Referral,2026-02-06,,,20,Active,,Window Cleaning,6 weekly
Jon Kay,Referral,2026-02-07,,,20,Active,,Window Cleaning,8 weekly
";

fn marketing() -> RawTable {
    table_from_csv(MARKETING_CSV)
}

fn google_row() -> Vec<String> {
    [
        "New Lead", "Google", "2026-03-01", "", "", "20", "Active", "", "Window Cleaning", "8-weekly",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn with_extra_row(table: &RawTable, row: Vec<String>) -> RawTable {
    let mut csv_text = MARKETING_CSV.to_string();
    csv_text.push_str(&row.join(","));
    csv_text.push('\n');
    let extended = table_from_csv(&csv_text);
    assert_eq!(extended.data_len(), table.data_len() + 1);
    extended
}

#[test]
fn test_date_parser_layouts_agree() {
    let expected = Some(date(2026, 1, 12));
    assert_eq!(parse_date("2026-01-12"), expected);
    assert_eq!(parse_date("12/01/2026"), expected);
    assert_eq!(parse_date("Jan 12 2026"), expected);
    assert_eq!(parse_date(""), None);
    assert_eq!(parse_date("not-a-date"), None);
}

#[test]
fn test_marketing_fixture_summary() {
    let report = analyze_marketing(&marketing(), &AnalyticsConfig::default(), date(2026, 3, 1)).unwrap();

    let google = report.source(MarketingSource::Google).unwrap();
    assert_eq!((google.active, google.churn), (1, 1));
    assert_eq!(google.retention_rate, 50);
    assert_eq!(google.avg_lifetime, 3);

    assert_eq!(report.source(MarketingSource::Lsa).unwrap().active, 1);
    assert_eq!(report.source(MarketingSource::FacebookAds).unwrap().active, 1);
    assert_eq!(report.source(MarketingSource::Leaflet).unwrap().avg_lifetime, 3);
    assert_eq!(report.source(MarketingSource::Other).unwrap().active, 1);
    assert_eq!(report.total_active, 4);

    assert_eq!(report.skipped.count(SkipReason::ActiveWithOpenJob), 1);
    assert_eq!(report.skipped.count(SkipReason::BeforeTrackingStart), 1);
    assert_eq!(report.skipped.count(SkipReason::NotWindowCleaning), 1);
    assert_eq!(report.skipped.count(SkipReason::UnsupportedFrequency), 1);
    assert_eq!(report.skipped.total() + 6, report.rows_scanned);

    let overview = AnalyticsOverview::from_report(&report);
    assert_eq!(overview.total_active, 4);
    // Mean of 50, 100, 100, 0, 0, 0, 0, 100 over all eight sources.
    assert_eq!(overview.avg_retention, 44);
}

#[test]
fn test_missing_headers_are_schema_errors() {
    for headers in ["Name,State,Job State", "Name,Source,Job State"] {
        let table = table_from_csv(&format!("{}\nAnn,x,y\n", headers));
        let err = analyze_marketing(&table, &AnalyticsConfig::default(), date(2026, 3, 1)).unwrap_err();
        match err {
            VersabotError::Schema { headers: found, .. } => {
                assert_eq!(found.len(), 3);
                assert_eq!(found[0], "name");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}

#[test]
fn test_marketing_is_idempotent() {
    let table = marketing();
    let config = AnalyticsConfig::default();
    let first = analyze_marketing(&table, &config, date(2026, 3, 1)).unwrap();
    let second = analyze_marketing(&table, &config, date(2026, 3, 1)).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_marketing_monotonicity() {
    let config = AnalyticsConfig::default();
    let now = date(2026, 3, 2);
    let base = analyze_marketing(&marketing(), &config, now).unwrap();
    let grown = analyze_marketing(&with_extra_row(&marketing(), google_row()), &config, now).unwrap();

    assert_eq!(grown.total_active, base.total_active + 1);
    for source in MarketingSource::ALL {
        let before = base.source(source).unwrap();
        let after = grown.source(source).unwrap();
        if source == MarketingSource::Google {
            assert_eq!(after.active, before.active + 1);
            assert_eq!(after.churn, before.churn);
        } else {
            assert_eq!((after.active, after.churn), (before.active, before.churn));
        }
    }
    assert_eq!(grown.growth.actual, base.growth.actual + 1);
}

#[test]
fn test_growth_projection_scenario() {
    let growth = GrowthProjection::compute(&AnalyticsConfig::default(), 26, date(2026, 1, 22));
    assert_eq!(growth.target, 836);
    assert_eq!(growth.actual, 840);
    assert_eq!(growth.difference, 4);
    assert_eq!(growth.status, GrowthStatus::Ahead);
}

fn cashflow_live(history: &str, bank: &str) -> LiveData {
    LiveData {
        marketing_raw: Some(table_from_csv(history)),
        jobs_raw: Some(table_from_csv(
            "Customer,GoCardless,Stripe\nAnn Hale,Active,\nBen Ito,,Cancelled\n",
        )),
        bank_raw: Some(table_from_csv(bank)),
        ..LiveData::default()
    }
}

const EMPTY_BANK: &str = "date,amount\n";

#[test]
fn test_bank_mtd_scenario() {
    let bank = table_from_csv("date,amount\n2026-02-01,500\n2026-02-03,-20\n");
    assert_eq!(cashflow::realtime_mtd_income(&bank), 500.0);
}

#[test]
fn test_recent_service_contributes_after_tax() {
    let now = date(2026, 3, 10);
    let last = now.checked_sub_days(Days::new(7)).unwrap();
    let history = format!("Name,Last Done,Next Due,Price\nAnn Hale,{},,100\n", last);

    let forecast =
        forecast_cashflow(&cashflow_live(&history, EMPTY_BANK), &CashflowConfig::default(), now).unwrap();
    assert!((forecast.projected_revenue - 82.0).abs() < 1e-9);
    assert_eq!(forecast.upcoming_payments[0].payment_date, now);
    assert_eq!(forecast.upcoming_payments[0].rule, ForecastRule::RecentlyServiced);
}

#[test]
fn test_only_first_rule_fires() {
    let now = date(2026, 3, 10);
    let last = now.checked_sub_days(Days::new(30)).unwrap();
    let due = now.checked_add_days(Days::new(3)).unwrap();
    let history = format!("Name,Last Done,Next Due,Price\nAnn Hale,{},{},100\n", last, due);

    let forecast =
        forecast_cashflow(&cashflow_live(&history, EMPTY_BANK), &CashflowConfig::default(), now).unwrap();
    assert_eq!(forecast.projected_revenue, 0.0);
    assert!(forecast.upcoming_payments.is_empty());
    assert_eq!(forecast.skipped.count(SkipReason::OutsideWindow), 1);
}

#[test]
fn test_non_autopay_customers_are_ignored() {
    let now = date(2026, 3, 10);
    let history = "Name,Last Done,Next Due,Price\nBen Ito,2026-03-05,,60\nZoe Zed,2026-03-05,,60\n";

    let forecast =
        forecast_cashflow(&cashflow_live(history, EMPTY_BANK), &CashflowConfig::default(), now).unwrap();
    assert_eq!(forecast.gross_projected_revenue, 0.0);
    assert_eq!(forecast.skipped.count(SkipReason::NoAutopay), 2);
}

#[test]
fn test_committed_spend_and_net_position() {
    let now = date(2026, 3, 10);
    let history = "Name,Last Done,Next Due,Price\nAnn Hale,2026-03-05,,50\n";
    let bank = "date,amount,description\n2026-03-01,900,Invoice 12\n2026-03-02,-120,VAN LEASE MARCH\n2026-03-03,-300,Credit Card Payment\n";
    let config = CashflowConfig {
        credit_card_balance: 750.0,
        recurring_bills: vec![
            RecurringBill::new(BillDay::DayOfMonth(2), "Van lease", 120.0),
            RecurringBill::new(BillDay::DayOfMonth(20), "Phone", 35.0),
            RecurringBill::new(BillDay::Weekly(chrono::Weekday::Fri), "Fuel", 80.0),
        ],
        ..CashflowConfig::default()
    };

    let forecast = forecast_cashflow(&cashflow_live(history, bank), &config, now).unwrap();
    assert_eq!(forecast.mtd_income, 900.0);
    assert_eq!(forecast.credit_card_due, None);
    assert_eq!(
        forecast.pending_bills.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
        vec!["Phone", "Fuel"]
    );
    assert_eq!(forecast.committed_spend, 115.0);
    assert!((forecast.net_position - (900.0 + 41.0 - 115.0)).abs() < 1e-9);
}

#[test]
fn test_day_of_month_bill_window() {
    let now = date(2026, 3, 12);
    let config = CashflowConfig {
        bill_window: BillWindow::DayOfMonth { early_cutoff: 10 },
        recurring_bills: vec![
            RecurringBill::new(BillDay::DayOfMonth(5), "Insurance", 40.0),
            RecurringBill::new(BillDay::DayOfMonth(11), "Software", 25.0),
            RecurringBill::new(BillDay::DayOfMonth(28), "Rent", 900.0),
        ],
        ..CashflowConfig::default()
    };
    let history = "Name,Last Done,Next Due,Price\n";

    let forecast = forecast_cashflow(&cashflow_live(history, EMPTY_BANK), &config, now).unwrap();
    let names: Vec<&str> = forecast.pending_bills.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Insurance", "Rent"]);
}

#[test]
fn test_forecast_needs_all_tables() {
    let live = LiveData {
        marketing_raw: Some(marketing()),
        ..LiveData::default()
    };
    let err = forecast_cashflow(&live, &CashflowConfig::default(), date(2026, 3, 1)).unwrap_err();
    match err {
        VersabotError::DataNotReady(msg) => {
            assert!(msg.contains("bank transactions"));
            assert!(msg.contains("jobs"));
            assert!(!msg.contains("service history"));
        }
        other => panic!("expected data-not-ready, got {other:?}"),
    }
}

#[test]
fn test_prompt_from_fixture_forecast() {
    let now = date(2026, 3, 10);
    let history = "Name,Last Done,Next Due,Price\nAnn Hale,2026-03-05,,1250\n";
    let config = CashflowConfig::default();
    let forecast = forecast_cashflow(&cashflow_live(history, EMPTY_BANK), &config, now).unwrap();

    let prompt = render_forecast_prompt(&forecast, &config, Some("Keep it short."));
    assert!(prompt.contains("Ann Hale: £1,250 expected Thu 12 Mar"));
    assert!(prompt.contains("(showing 1 of 1)"));
    assert!(prompt.contains("Keep it short."));
}

#[test]
fn test_schema_generation() -> anyhow::Result<()> {
    let schema = DashboardSettings::schema_as_json()?;
    assert!(schema.contains("credit_card_balance"));
    assert!(schema.contains("recurring_bills"));
    assert!(schema.contains("job_state_policy"));

    let settings: DashboardSettings = serde_json::from_str(r#"{ "gas_url": "https://x.example/exec" }"#)?;
    assert!(settings.is_configured());
    assert_eq!(settings.targets.monthly, 20_000.0);
    assert_eq!(settings.job_state_policy, JobStatePolicy::Strict);
    Ok(())
}
