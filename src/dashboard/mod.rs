//! HTTP dashboard over the store
//!
//! - `GET /` filtered tables plus the last-run summary
//! - `GET /update` synchronous collection run, then redirect to `/`
//! - `GET /logs` the log file
//! - `GET /api/status` current phase and last report as JSON
//!
//! Handlers only read the store through the shared pool; the collector's
//! run guard is the one place a manual update can be turned away.

pub mod render;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{Html, Redirect},
    routing::get,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use self::render::{Banner, BannerLevel, FormValues, PageModel};
use crate::collector::{Collector, RunOutcome, RunPhase, RunReport};
use crate::config::TransactionKind;
use crate::error::CollectorError;
use crate::logging;
use crate::session::SessionBroker;
use crate::store::{DATE_FORMAT, DashboardFilters, DashboardView, Store};

/// Shared dashboard state
pub struct AppState<B: SessionBroker> {
    pub collector: Arc<Collector<B>>,
    pub store: Store,
    pub log_file: PathBuf,
    pub recent_days: u32,
}

pub type SharedState<B> = Arc<AppState<B>>;

/// Query string of `GET /`
///
/// Every field is optional free text; bad values are ignored rather than
/// rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub date: Option<String>,
    pub message: Option<String>,
    pub message_type: Option<String>,
}

impl DashboardQuery {
    /// Store filters; an unknown type or malformed date is dropped
    #[must_use]
    pub fn filters(&self) -> DashboardFilters {
        let username = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        let kind = self
            .kind
            .as_deref()
            .and_then(|k| TransactionKind::from_str(k.trim()).ok());
        let date = self
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), DATE_FORMAT).ok());

        DashboardFilters { username, kind, date }
    }

    fn form_values(&self) -> FormValues {
        FormValues {
            username: self.username.clone().unwrap_or_default().trim().to_string(),
            kind: self.kind.clone().unwrap_or_default(),
            date: self.date.clone().unwrap_or_default(),
        }
    }

    fn banner(&self) -> Option<Banner> {
        let text = self.message.as_deref().filter(|m| !m.is_empty())?;
        Some(Banner {
            text: text.to_string(),
            level: BannerLevel::parse(self.message_type.as_deref().unwrap_or("")),
        })
    }
}

/// Build the dashboard router
pub fn router<B: SessionBroker + 'static>(state: SharedState<B>) -> Router {
    Router::new()
        .route("/", get(index::<B>))
        .route("/update", get(update::<B>))
        .route("/logs", get(logs::<B>))
        .route("/api/status", get(status::<B>))
        .with_state(state)
}

/// GET /
async fn index<B: SessionBroker + 'static>(
    State(state): State<SharedState<B>>,
    Query(query): Query<DashboardQuery>,
) -> Html<String> {
    let filters = query.filters();
    let form = query.form_values();
    let today = Local::now().date_naive();

    let (view, banner) = match state.store.query_dashboard(&filters, today, state.recent_days).await {
        Ok(view) => (view, query.banner()),
        Err(e) => {
            error!("Failed to load dashboard data: {e}");
            (
                DashboardView::default(),
                Some(Banner {
                    text: format!("Failed to load data: {e}"),
                    level: BannerLevel::Error,
                }),
            )
        }
    };

    let last_report = state.collector.last_report();
    Html(render::dashboard_page(&PageModel {
        banner,
        form: &form,
        view: &view,
        recent_days: state.recent_days,
        phase: state.collector.phase(),
        last_report: last_report.as_ref(),
    }))
}

/// Banner text and level for a finished manual update
#[must_use]
pub fn update_banner(result: &Result<RunReport, CollectorError>) -> Banner {
    match result {
        Ok(report) => {
            let level = match report.outcome {
                RunOutcome::Done => BannerLevel::Success,
                RunOutcome::PartialFailure => BannerLevel::Warning,
                RunOutcome::Failed { .. } => BannerLevel::Error,
            };
            Banner {
                text: report.summary(),
                level,
            }
        }
        Err(CollectorError::RunInProgress) => Banner {
            text: "A collection run is already in progress".to_string(),
            level: BannerLevel::Warning,
        },
        Err(e) => Banner {
            text: format!("Update failed: {e}"),
            level: BannerLevel::Error,
        },
    }
}

fn redirect_with(banner: &Banner) -> Redirect {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("message", &banner.text)
        .append_pair("message_type", banner.level.as_str())
        .finish();
    Redirect::to(&format!("/?{query}"))
}

/// GET /update
async fn update<B: SessionBroker + 'static>(State(state): State<SharedState<B>>) -> Redirect {
    info!("Manual update requested from the dashboard");
    // Own task, so a client that disconnects does not cancel the run
    let collector = Arc::clone(&state.collector);
    let result = match tokio::spawn(async move { collector.run().await }).await {
        Ok(result) => result,
        Err(e) => {
            error!("Collection task failed: {e}");
            Err(CollectorError::Other(format!("collection task failed: {e}")))
        }
    };
    redirect_with(&update_banner(&result))
}

/// GET /logs
async fn logs<B: SessionBroker + 'static>(State(state): State<SharedState<B>>) -> Html<String> {
    match logging::read_log(&state.log_file).await {
        Ok(contents) => Html(render::logs_page(&contents)),
        Err(e) => Html(render::logs_page(&format!("Failed to read logs: {e:#}"))),
    }
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub phase: RunPhase,
    pub last_report: Option<RunReport>,
}

/// GET /api/status
async fn status<B: SessionBroker + 'static>(State(state): State<SharedState<B>>) -> Json<StatusBody> {
    Json(StatusBody {
        phase: state.collector.phase(),
        last_report: state.collector.last_report(),
    })
}
