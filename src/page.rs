//! Page selection and HTML rendering.
//!
//! Every page shares one layout: logo header, a flat navigation menu and the
//! clinic footer. The selected page is simply the one whose link was followed.

use chrono::NaiveDate;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::analysis::{ClusterOutcome, Dashboard};
use crate::app::AppState;
use crate::error::AppError;
use crate::graph::{GraphOptions, render_cluster_chart};
use crate::survey::{
    AgeBracket, Gender, Likert, OVERALL_QUESTIONS, Question, Sentiment, ServiceType, Submission,
    questions_for,
};
use crate::table::Table;

pub const CLINIC_NAME: &str = "Klinik Theresia";
pub const FOOTER: &str = "© 2025 Klinik Pratama Theresia Kabupaten Nias Selatan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Page {
    Survey,
    Home,
    About,
    Admin,
}

impl Page {
    /// Menu order.
    pub const ALL: [Page; 4] = [Page::Survey, Page::Home, Page::About, Page::Admin];

    pub fn title(self) -> &'static str {
        match self {
            Page::Survey => "Formulir Survei",
            Page::Home => "Beranda",
            Page::About => "Tentang Klinik",
            Page::Admin => "Admin Dashboard",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Page::Survey => "/",
            Page::Home => "/home",
            Page::About => "/about",
            Page::Admin => "/admin",
        }
    }

    /// Unknown paths fall back to the survey form.
    pub fn from_path(path: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.path() == path)
            .unwrap_or(Page::Survey)
    }
}

/// Optional photos and video shown on the public pages.
pub mod media {
    pub const LOGO: &str = "logo.jpeg";
    pub const STAFF: &str = "staf.jpg";
    pub const VIDEO: &str = "video.mp4";
    pub const GALLERY: [(&str, &str); 4] = [
        ("ftbersama.jpg", "Foto Bersama Staf"),
        ("penerima.jpg", "Prosesi Penerimaan"),
        ("piagam.jpg", "Piagam Penghargaan"),
        ("plakat.jpg", "Plakat Penghargaan"),
    ];
}

/// URL of a media file, if it exists in the media directory.
pub fn media_url(media_dir: &Path, file: &str) -> Option<String> {
    media_dir
        .join(file)
        .is_file()
        .then(|| format!("/media/{file}"))
}

/// Thank-you note for the home page after a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Thanks {
    pub name: String,
    pub average: f64,
}

impl From<&Submission> for Thanks {
    fn from(submission: &Submission) -> Self {
        Self {
            name: submission.name.clone(),
            average: submission.average_score(),
        }
    }
}

const THANKS_TTL: Duration = Duration::from_secs(10 * 60);

/// Notes waiting for the redirect to the home page, each readable once.
#[derive(Default)]
pub struct ThanksNotes {
    notes: Mutex<HashMap<String, (Instant, Thanks)>>,
}

impl ThanksNotes {
    pub fn issue(&self, thanks: Thanks) -> String {
        let id = Uuid::new_v4().to_string();
        let mut notes = self.notes.lock().unwrap_or_else(|p| p.into_inner());
        notes.retain(|_, (issued, _)| issued.elapsed() < THANKS_TTL);
        notes.insert(id.clone(), (Instant::now(), thanks));
        id
    }

    pub fn take(&self, id: &str) -> Option<Thanks> {
        self.notes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(id)
            .filter(|(issued, _)| issued.elapsed() < THANKS_TTL)
            .map(|(_, thanks)| thanks)
    }
}

pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, AppError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);

        registry
            .register_partial("layout", include_str!("./static/layout.hbs"))
            .map_err(Box::new)?;
        for (name, source) in [
            ("survey", include_str!("./static/survey.hbs")),
            ("home", include_str!("./static/home.hbs")),
            ("about", include_str!("./static/about.hbs")),
            ("login", include_str!("./static/login.hbs")),
            ("dashboard", include_str!("./static/dashboard.hbs")),
        ] {
            registry
                .register_template_string(name, source)
                .map_err(Box::new)?;
        }

        Ok(Self { registry })
    }

    pub fn render(&self, name: &str, context: &Value) -> Result<String, AppError> {
        Ok(self.registry.render(name, context)?)
    }
}

fn layout_context(state: &AppState, page: Page) -> Value {
    let nav: Vec<Value> = Page::ALL
        .into_iter()
        .map(|p| json!({ "title": p.title(), "path": p.path(), "active": p == page }))
        .collect();

    json!({
        "page_title": page.title(),
        "clinic_name": CLINIC_NAME,
        "logo": media_url(&state.config.media_dir, media::LOGO),
        "nav": nav,
        "footer": FOOTER,
    })
}

fn question_context(question: &Question, fields: &HashMap<String, String>) -> Value {
    let selected = fields.get(question.key).map(String::as_str).unwrap_or("");
    let options: Vec<Value> = Likert::ALL
        .into_iter()
        .map(|score| {
            let value = score.score().to_string();
            json!({
                "value": value,
                "text": score.option_text(),
                "checked": selected == value,
            })
        })
        .collect();

    json!({ "key": question.key, "text": question.text, "options": options })
}

fn choice_context(values: impl Iterator<Item = &'static str>, selected: &str) -> Vec<Value> {
    values
        .map(|v| json!({ "value": v, "checked": v == selected }))
        .collect()
}

/// Survey form, optionally re-filled with rejected input and its problems.
pub fn render_survey(
    state: &AppState,
    fields: &HashMap<String, String>,
    errors: &[String],
) -> Result<String, AppError> {
    let field = |name: &str| fields.get(name).map(String::as_str).unwrap_or("");
    let service = ServiceType::parse(field("service")).unwrap_or(ServiceType::General);
    let gender = Gender::parse(field("gender")).unwrap_or(Gender::Male);
    let age = AgeBracket::parse(field("age")).unwrap_or(AgeBracket::Under20);

    let sections: Vec<Value> = ServiceType::ALL
        .into_iter()
        .map(|s| {
            let questions: Vec<Value> = questions_for(s)
                .iter()
                .map(|q| question_context(q, fields))
                .collect();
            json!({
                "service": s.as_str(),
                "title": s.section_title(),
                "hidden": s != service,
                "questions": questions,
            })
        })
        .collect();
    let overall: Vec<Value> = OVERALL_QUESTIONS
        .iter()
        .map(|q| question_context(q, fields))
        .collect();

    let mut context = layout_context(state, Page::Survey);
    context["name"] = json!(field("name"));
    context["suggestion"] = json!(field("suggestion"));
    context["ages"] = json!(choice_context(
        AgeBracket::ALL.into_iter().map(AgeBracket::as_str),
        age.as_str(),
    ));
    context["genders"] = json!(choice_context(
        Gender::ALL.into_iter().map(Gender::as_str),
        gender.as_str(),
    ));
    context["services"] = json!(choice_context(
        ServiceType::ALL.into_iter().map(ServiceType::as_str),
        service.as_str(),
    ));
    context["sections"] = json!(sections);
    context["overall"] = json!(overall);
    context["errors"] = json!(errors);

    state.templates.render("survey", &context)
}

/// Home page; after a submission it carries the thank-you note and sentiment.
pub fn render_home(state: &AppState, thanks: Option<&Thanks>) -> Result<String, AppError> {
    let media_dir = &state.config.media_dir;
    let mut context = layout_context(state, Page::Home);

    context["staff_photo"] = json!(media_url(media_dir, media::STAFF));
    context["video"] = json!(media_url(media_dir, media::VIDEO));
    context["thanks"] = json!(thanks.map(|t| {
        let sentiment = Sentiment::from_average(t.average);
        json!({
            "name": t.name,
            "sentiment": format!("{} {}", sentiment.emoji(), sentiment.label()),
            "average": format!("{:.2}", t.average),
        })
    }));

    state.templates.render("home", &context)
}

pub fn render_about(state: &AppState) -> Result<String, AppError> {
    let gallery: Vec<Value> = media::GALLERY
        .iter()
        .filter_map(|(file, caption)| {
            media_url(&state.config.media_dir, file)
                .map(|url| json!({ "url": url, "caption": caption }))
        })
        .collect();

    let mut context = layout_context(state, Page::About);
    context["gallery"] = json!(gallery);
    context["services"] = json!([
        "Layanan Umum",
        "Layanan BPJS Kesehatan",
        "Pemeriksaan Dokter Umum",
        "Pengobatan dan Farmasi",
    ]);

    state.templates.render("about", &context)
}

pub fn render_login(state: &AppState, error: Option<&str>) -> Result<String, AppError> {
    let mut context = layout_context(state, Page::Admin);
    context["error"] = json!(error);
    state.templates.render("login", &context)
}

fn table_context(heading: &str, table: &Table) -> Value {
    json!({
        "heading": heading,
        "columns": table.columns,
        "rows": table.display_rows(),
        "empty": table.is_empty(),
    })
}

fn date_value(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Admin dashboard for the requested date range.
pub fn render_dashboard(state: &AppState, dashboard: Option<&Dashboard>) -> Result<String, AppError> {
    let mut context = layout_context(state, Page::Admin);

    let Some(dashboard) = dashboard else {
        context["empty"] = json!(true);
        return state.templates.render("dashboard", &context);
    };

    let tables = dashboard.tables();
    let headings = [
        "1. Data Responden",
        "2. Detail Semua Jawaban",
        "3. Saran dan Masukan",
        "4. Data Gabungan (Responden + Saran)",
    ];
    let sections: Vec<Value> = headings
        .iter()
        .zip(tables.iter())
        .map(|(heading, table)| table_context(heading, table))
        .collect();

    let mut cluster = json!({
        "table": table_context("Detail Data Kluster", &tables[4]),
    });
    match &dashboard.clusters {
        ClusterOutcome::Clustered(report) => {
            cluster["clustered"] = json!(true);
            match render_cluster_chart(report, &GraphOptions::default()) {
                Ok(svg) => cluster["chart"] = json!(svg),
                Err(e) => {
                    log::warn!("{e}");
                    cluster["error"] = json!(format!("Terjadi error saat visualisasi K-Means: {e}"));
                }
            }
        }
        ClusterOutcome::InsufficientData(_) => cluster["insufficient"] = json!(true),
        ClusterOutcome::Failed { error, .. } => {
            cluster["error"] = json!(format!("Terjadi error saat visualisasi K-Means: {error}"));
        }
    }

    let start = date_value(dashboard.range.start);
    let end = date_value(dashboard.range.end);

    context["empty"] = json!(false);
    context["min_date"] = json!(date_value(dashboard.bounds.start));
    context["max_date"] = json!(date_value(dashboard.bounds.end));
    context["start"] = json!(start);
    context["end"] = json!(end);
    context["shown"] = json!(dashboard.data.respondents.len());
    context["total"] = json!(dashboard.total_respondents);
    context["sections"] = json!(sections);
    context["cluster"] = cluster;
    context["export_url"] = json!(format!("/admin/export?start={start}&end={end}"));

    state.templates.render("dashboard", &context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_paths_round_trip() {
        for page in Page::ALL {
            assert_eq!(Page::from_path(page.path()), page);
        }
        assert_eq!(Page::from_path("/nowhere"), Page::Survey);
    }

    #[test]
    fn missing_media_has_no_url() {
        let dir = std::env::temp_dir().join("klinik-survey-no-media");
        assert_eq!(media_url(&dir, media::LOGO), None);
    }

    #[test]
    fn thanks_notes_are_read_once() {
        let notes = ThanksNotes::default();
        let id = notes.issue(Thanks {
            name: "Lina".to_string(),
            average: 4.5,
        });

        let thanks = notes.take(&id).unwrap();
        assert_eq!(thanks.name, "Lina");
        assert!(notes.take(&id).is_none());
        assert!(notes.take("unknown").is_none());
    }

    fn test_state() -> std::sync::Arc<AppState> {
        let config = crate::config::Config {
            media_dir: std::env::temp_dir().join("klinik-survey-no-media"),
            ..Default::default()
        };
        let db = crate::store::Database::open_in_memory().unwrap();
        AppState::with_database(config, db).unwrap()
    }

    #[test]
    fn failed_clustering_shows_its_message() {
        let submitted_at = NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let data = crate::store::SurveyData {
            respondents: vec![crate::store::Respondent {
                id: 1,
                name: "Mega".to_string(),
                gender: "Perempuan".to_string(),
                age: "21–30 tahun".to_string(),
                service: "Umum".to_string(),
                submitted_at,
            }],
            answers: vec![],
            suggestions: vec![],
        };
        let mut dashboard = Dashboard::build(&data, None, None).unwrap();
        dashboard.clusters = ClusterOutcome::Failed {
            points: vec![],
            error: "matriks kosong".to_string(),
        };

        let html = render_dashboard(&test_state(), Some(&dashboard)).unwrap();
        assert!(html.contains("Terjadi error saat visualisasi K-Means: matriks kosong"));
        assert!(!html.contains("Detail Data Kluster"));
        assert!(!html.contains("minimum 3"));
    }

    #[test]
    fn templates_register() {
        assert!(Templates::new().is_ok());
    }
}
