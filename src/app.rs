#![cfg(not(tarpaulin_include))]

use axum::{
    Form, Router,
    extract::{Query, Request, State},
    http::{StatusCode, Uri, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Local, NaiveDate, Timelike, Utc};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower_http::services::ServeDir;

use crate::analysis::Dashboard;
use crate::config::Config;
use crate::downloader::{XLSX_CONTENT_TYPE, export_filename, to_xlsx};
use crate::error::AppError;
use crate::login::{self, AdminAuth};
use crate::page::{self, Page, Templates, Thanks, ThanksNotes};
use crate::store::Database;
use crate::survey::Submission;

pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub templates: Templates,
    pub auth: AdminAuth,
    pub thanks: ThanksNotes,
}

/// Cookie carrying the id of a pending thank-you note
pub const THANKS_COOKIE: &str = "survey_thanks";

impl AppState {
    /// Open the configured database and build the shared state.
    pub fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let db = Database::open(&config.db_path)?;
        Self::with_database(config, db)
    }

    pub fn with_database(config: Config, db: Database) -> Result<Arc<Self>, AppError> {
        let auth = AdminAuth::new(&config.admin_password, config.session_ttl)?;
        Ok(Arc::new(Self {
            templates: Templates::new()?,
            auth,
            thanks: ThanksNotes::default(),
            db,
            config,
        }))
    }
}

/// Date filter of the dashboard and the export, as `YYYY-MM-DD` strings.
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateQuery {
    fn parse(value: &Option<String>) -> Option<NaiveDate> {
        let value = value.as_deref()?.trim();
        if value.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|e| warn!("Ignoring date filter {value:?}: {e}"))
            .ok()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        Self::parse(&self.start)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        Self::parse(&self.end)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let admin_only = Router::new()
        .route("/admin/export", get(export_workbook))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login::require_admin,
        ));

    Router::new()
        .route(Page::Survey.path(), get(survey_page))
        .route("/survey", post(submit_survey))
        .route(Page::Home.path(), get(home_page))
        .route(Page::About.path(), get(about_page))
        .route(Page::Admin.path(), get(admin_page))
        .route("/admin/login", post(login::handle_login))
        .route("/admin/logout", post(login::handle_logout))
        .merge(admin_only)
        .nest_service("/media", ServeDir::new(&state.config.media_dir))
        .fallback(unknown_page)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.addr.clone();
    let state = AppState::new(config)?;
    info!(
        "Survey database holds {} respondents",
        state.db.respondent_count()?
    );

    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    info!("{method} {path} -> {}", response.status());
    response
}

async fn unknown_page(uri: Uri) -> Redirect {
    Redirect::to(Page::from_path(uri.path()).path())
}

async fn survey_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    Ok(Html(page::render_survey(&state, &HashMap::new(), &[])?))
}

fn thanks_cookie(value: String) -> Cookie<'static> {
    Cookie::build((THANKS_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

async fn submit_survey(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let submission = match Submission::from_form(&fields) {
        Ok(submission) => submission,
        Err(e) => {
            info!("Rejected survey submission: {e}");
            let html = page::render_survey(&state, &fields, &e.problems)?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
        }
    };

    let now = Utc::now().naive_utc();
    let submitted_at = now.with_nanosecond(0).unwrap_or(now);
    let id = state.db.save_submission(&submission, submitted_at)?;
    info!(
        "Stored survey {id} ({}, average {:.2})",
        submission.service,
        submission.average_score()
    );

    let note = state.thanks.issue(Thanks::from(&submission));
    Ok((jar.add(thanks_cookie(note)), Redirect::to(Page::Home.path())).into_response())
}

async fn home_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let Some(note) = jar.get(THANKS_COOKIE).map(|c| c.value().to_string()) else {
        return Ok((jar, Html(page::render_home(&state, None)?)));
    };

    let thanks = state.thanks.take(&note);
    let html = page::render_home(&state, thanks.as_ref())?;
    Ok((jar.remove(thanks_cookie(String::new())), Html(html)))
}

async fn about_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    Ok(Html(page::render_about(&state)?))
}

async fn admin_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DateQuery>,
) -> Result<Html<String>, AppError> {
    if !state.auth.is_authenticated(&jar) {
        return Ok(Html(page::render_login(&state, None)?));
    }

    let data = state.db.load_all()?;
    let dashboard = Dashboard::build(&data, query.start(), query.end());
    Ok(Html(page::render_dashboard(&state, dashboard.as_ref())?))
}

async fn export_workbook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Result<Response, AppError> {
    let data = state.db.load_all()?;
    let tables = Dashboard::build(&data, query.start(), query.end())
        .map(|d| d.tables())
        .unwrap_or_default();

    let bytes = to_xlsx(&tables)?;
    let filename = export_filename(Local::now().naive_local());
    info!("Exported {filename} ({} bytes)", bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
