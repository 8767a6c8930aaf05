//! Application context: settings, remote clients and the displayed dashboard state.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use log::{info, warn};

use crate::dashboard::DashboardSnapshot;
use crate::error::{Result, VersabotError};
use crate::llm::{ForecastAssistant, ForecastOutcome, GeminiClient};
use crate::schema::DashboardSettings;
use crate::sheets::SheetsClient;
use crate::store::SettingsStore;

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub snapshot: Option<Arc<DashboardSnapshot>>,
    pub analyzing: bool,
    pub last_forecast: Option<Arc<ForecastOutcome>>,
    /// User-facing text of the most recent failed refresh or forecast.
    pub last_error: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Clears the analyzing flag when dropped, whichever way the run ends.
struct AnalysisGuard<'a> {
    state: &'a Mutex<DashboardState>,
}

impl<'a> AnalysisGuard<'a> {
    fn start(state: &'a Mutex<DashboardState>) -> Result<Self> {
        let mut guard = lock(state);
        if guard.analyzing {
            return Err(VersabotError::Busy("forecast".to_string()));
        }
        guard.analyzing = true;
        Ok(Self { state })
    }
}

impl Drop for AnalysisGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).analyzing = false;
    }
}

pub struct AppContext {
    store: Box<dyn SettingsStore>,
    settings: Mutex<DashboardSettings>,
    sheets: SheetsClient,
    gemini: GeminiClient,
    sheets_token: String,
    state: Mutex<DashboardState>,
}

impl AppContext {
    /// Loads the persisted settings once; later changes go through [`Self::save_settings`].
    pub fn new(
        store: Box<dyn SettingsStore>,
        sheets: SheetsClient,
        gemini: GeminiClient,
        sheets_token: impl Into<String>,
    ) -> Result<Self> {
        let settings = store.load()?;
        Ok(Self {
            store,
            settings: Mutex::new(settings),
            sheets,
            gemini,
            sheets_token: sheets_token.into(),
            state: Mutex::new(DashboardState::default()),
        })
    }

    pub fn settings(&self) -> DashboardSettings {
        lock(&self.settings).clone()
    }

    pub fn state(&self) -> DashboardState {
        lock(&self.state).clone()
    }

    pub fn snapshot(&self) -> Option<Arc<DashboardSnapshot>> {
        lock(&self.state).snapshot.clone()
    }

    pub fn is_analyzing(&self) -> bool {
        lock(&self.state).analyzing
    }

    /// Validates and persists new settings, then makes them current.
    pub fn save_settings(&self, settings: DashboardSettings) -> Result<()> {
        self.store.save(&settings)?;
        *lock(&self.settings) = settings;
        Ok(())
    }

    /// Fetches the payload and replaces the displayed snapshot in one write.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self, now: NaiveDate) -> Result<Arc<DashboardSnapshot>> {
        let settings = self.settings();
        if !settings.is_configured() {
            return Err(VersabotError::Config("spreadsheet URL is not set".to_string()));
        }

        let live = match self.sheets.fetch(&settings.gas_url, &self.sheets_token).await {
            Ok(live) => live,
            Err(e) => {
                warn!("Refresh failed: {}", e);
                lock(&self.state).last_error = Some(e.user_message());
                return Err(e);
            }
        };

        let snapshot = Arc::new(DashboardSnapshot::build(live, &settings, now));
        let mut state = lock(&self.state);
        state.snapshot = Some(Arc::clone(&snapshot));
        state.last_error = None;
        Ok(snapshot)
    }

    /// Runs the cashflow assistant against the displayed snapshot.
    pub async fn run_forecast(&self, now: NaiveDate) -> Result<Arc<ForecastOutcome>> {
        let snapshot = self
            .snapshot()
            .ok_or_else(|| VersabotError::DataNotReady("no data loaded yet".to_string()))?;
        let settings = self.settings();
        let _guard = AnalysisGuard::start(&self.state)?;

        let assistant = ForecastAssistant::new(self.gemini.clone(), settings.model.clone());
        let result = assistant
            .run(
                &snapshot.live,
                &settings.cashflow_config(),
                settings.prompt_instructions.as_deref(),
                now,
            )
            .await;

        let mut state = lock(&self.state);
        match result {
            Ok(outcome) => {
                info!("Forecast complete for {}", now);
                let outcome = Arc::new(outcome);
                state.last_forecast = Some(Arc::clone(&outcome));
                state.last_error = None;
                Ok(outcome)
            }
            Err(e) => {
                warn!("Forecast failed: {}", e);
                state.last_error = Some(e.user_message());
                Err(e)
            }
        }
    }
}
