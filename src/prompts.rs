// Prompt text sent to the text-generation service for cashflow verdicts.

use crate::cashflow::CashflowForecast;
use crate::schema::CashflowConfig;
use crate::utils::format_gbp;

pub const VERDICT_PLACEHOLDER: &str = "[SAFE | CAUTION | DANGER]";

pub const SYSTEM_PROMPT_CASHFLOW: &str = r#"
You are versaBOT, the finance assistant of a small UK window cleaning business.
You read a pre-computed cashflow position and tell the owner, in plain English,
whether the next three weeks look safe. You never recalculate the figures you
are given and you never invent transactions.
"#;

fn bullet_list(lines: &[String], empty: &str) -> String {
    if lines.is_empty() {
        return format!("- {}\n", empty);
    }
    lines.iter().map(|l| format!("- {}\n", l)).collect()
}

/// Renders the forecast as the user prompt for the verdict request.
pub fn render_forecast_prompt(
    forecast: &CashflowForecast,
    config: &CashflowConfig,
    instructions: Option<&str>,
) -> String {
    let tax_percent = ((1.0 - config.tax_retention) * 100.0).round();
    let jobs = forecast.upcoming_job_lines(config.upcoming_job_sample);
    let bills = forecast.pending_bill_lines();

    let mut prompt = format!(
        "## VERDICT\n\
         Start your reply with {verdict} (pick exactly one word), then one sentence explaining why.\n\n\
         ## POSITION AS OF {date}\n\
         - Income received this month (bank, MTD): {mtd}\n\
         - Projected autopay revenue, next {window} days (after {tax}% tax): {projected}\n\
         - Committed spend (unpaid bills + credit card): {committed}\n\
         - Net cash position: {net}\n\n\
         ## PENDING BILLS\n\
         {bills}\n\
         ## UPCOMING AUTOPAY PAYMENTS (showing {shown} of {total})\n\
         {jobs}\n\
         ## RULES\n\
         - All amounts are GBP. Write money as £1,234 with no decimals.\n\
         - Use only the figures above.\n\
         - Keep the reply under 120 words.\n",
        verdict = VERDICT_PLACEHOLDER,
        date = forecast.as_of.format("%d %b %Y"),
        mtd = format_gbp(forecast.mtd_income),
        window = config.window_days,
        tax = tax_percent,
        projected = format_gbp(forecast.projected_revenue),
        committed = format_gbp(forecast.committed_spend),
        net = format_gbp(forecast.net_position),
        bills = bullet_list(&bills, "None outstanding"),
        shown = jobs.len(),
        total = forecast.upcoming_payments.len(),
        jobs = bullet_list(&jobs, "No autopay payments expected"),
    );

    if let Some(extra) = instructions.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n## OWNER INSTRUCTIONS\n");
        prompt.push_str(extra);
        prompt.push('\n');
    }

    prompt
}
