use chrono::Local;
use dotenv::dotenv;
use std::error::Error;
use versabot_insights::{
    AnalyticsState, AppContext, DashboardSettings, GeminiClient, JsonFileStore, SettingsStore,
    SheetsClient,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    let token = std::env::var("VERSABOT_SHEETS_TOKEN").expect("VERSABOT_SHEETS_TOKEN must be set");
    let settings_path =
        std::env::var("VERSABOT_SETTINGS").unwrap_or_else(|_| "versabot_settings.json".to_string());

    let store = JsonFileStore::new(&settings_path);
    if let Ok(url) = std::env::var("VERSABOT_GAS_URL") {
        let settings = DashboardSettings {
            gas_url: url,
            ..store.load()?
        };
        store.save(&settings)?;
    }

    let ctx = AppContext::new(
        Box::new(store),
        SheetsClient::new(),
        GeminiClient::from_env()?,
        token,
    )?;
    let today = Local::now().date_naive();

    println!("📥 Fetching live data...");
    let snapshot = ctx.refresh(today).await?;
    println!("   {}", snapshot.kpis.monthly.summary());
    println!("   {}", snapshot.kpis.weekly.summary());

    match &snapshot.analytics {
        AnalyticsState::Ready { report, overview } => {
            println!(
                "📊 {} active customers, {}% average retention, growth {} ({:+})",
                overview.total_active, overview.avg_retention, report.growth.status, report.growth.difference
            );
            for source in report.sources.iter().filter(|s| s.total > 0) {
                println!(
                    "   {:<14} active {:>3}  churn {:>3}  retention {:>3}%  lifetime {} mo",
                    source.name, source.active, source.churn, source.retention_rate, source.avg_lifetime
                );
            }
        }
        AnalyticsState::Failed { message } => println!("⚠️  Analytics unavailable: {}", message),
        AnalyticsState::NotLoaded => println!("⚠️  No marketing data in payload"),
    }

    println!("\n🤖 Asking for a cashflow verdict...");
    match ctx.run_forecast(today).await {
        Ok(outcome) => {
            println!("{}", outcome.prompt);
            println!("------------------------------------------------------------------");
            println!("{}", outcome.response);
        }
        Err(e) => eprintln!("❌ {}", e.user_message()),
    }

    Ok(())
}
