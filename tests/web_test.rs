#![cfg(feature = "web")]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use std::sync::Arc;
use std::time::Duration;
use survey::app::{AppState, router};
use survey::config::Config;
use survey::store::Database;
use tempfile::TempDir;
use tower::ServiceExt;

const PASSWORD: &str = "rahasia-klinik";

struct TestApp {
    state: Arc<AppState>,
    _media: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let config = Config {
            media_dir: media.path().to_path_buf(),
            admin_password: PASSWORD.to_string(),
            session_ttl: Duration::from_secs(3600),
            ..Config::default()
        };
        let state = AppState::with_database(config, Database::open_in_memory().unwrap()).unwrap();
        Self {
            state,
            _media: media,
        }
    }

    fn router(&self) -> Router {
        router(self.state.clone())
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<(String, String)>, String) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Vec<(String, String)>, String) {
        let mut request = Request::get(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str) -> (StatusCode, Vec<(String, String)>, String) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Log in and return the `name=value` session cookie.
    async fn login(&self) -> String {
        let (status, headers, _) = self
            .post_form("/admin/login", &format!("password={PASSWORD}"))
            .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        let set_cookie = header_value(&headers, "set-cookie").unwrap();
        assert!(set_cookie.starts_with("admin_session="));
        set_cookie.split(';').next().unwrap().to_string()
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn survey_body(name: &str, score: u8) -> String {
    let mut body = format!("name={name}&gender=Laki-laki&age=Dibawah+20+tahun&service=Umum");
    for i in 1..=10 {
        body.push_str(&format!("&u{i}={score}"));
    }
    body.push_str("&k1=5&suggestion=Parkir+sempit");
    body
}

#[tokio::test]
async fn survey_form_is_the_default_page() {
    let app = TestApp::new();

    let (status, _, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Formulir Survei"));
    assert!(body.contains("name=\"u1\""));
    assert!(body.contains("name=\"b10\""));
    assert!(body.contains("Logo tidak ditemukan"));

    let (status, headers, _) = app.get("/tidak-ada", None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(header_value(&headers, "location"), Some("/"));
}

#[tokio::test]
async fn incomplete_survey_is_rejected_and_not_stored() {
    let app = TestApp::new();

    let (status, _, body) = app
        .post_form("/survey", "name=&gender=Laki-laki&age=Dibawah+20+tahun&service=Umum&u1=4")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("Mohon isi Nama Lengkap"));
    assert_eq!(app.state.db.respondent_count().unwrap(), 0);
}

#[tokio::test]
async fn valid_survey_redirects_to_a_one_time_thank_you() {
    let app = TestApp::new();

    let (status, headers, _) = app.post_form("/survey", &survey_body("Hana", 5)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(header_value(&headers, "location"), Some("/home"));
    assert_eq!(app.state.db.respondent_count().unwrap(), 1);

    let set_cookie = header_value(&headers, "set-cookie").unwrap();
    assert!(set_cookie.starts_with("survey_thanks="));
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let (status, _, body) = app.get("/home", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Terima kasih, Hana!"));
    assert!(body.contains("5.00"));

    // Reloading the home page neither repeats the note nor stores anything
    let (status, _, body) = app.get("/home", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("Terima kasih"));
    assert_eq!(app.state.db.respondent_count().unwrap(), 1);

    let data = app.state.db.load_all().unwrap();
    assert_eq!(data.answers.len(), 11);
    assert_eq!(data.suggestions[0].text, "Parkir sempit");
}

#[tokio::test]
async fn admin_requires_the_password() {
    let app = TestApp::new();

    let (status, _, body) = app.get("/admin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Masukkan Password Admin"));

    let (status, _, body) = app.post_form("/admin/login", "password=salah").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Password salah. Coba lagi."));

    let (status, headers, _) = app.get("/admin/export", None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(header_value(&headers, "location"), Some("/admin"));
}

#[tokio::test]
async fn dashboard_shows_empty_state_then_data() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let (_, _, body) = app.get("/admin", Some(&cookie)).await;
    assert!(body.contains("Belum ada data survei yang masuk."));

    app.post_form("/survey", &survey_body("Indra", 4)).await;
    app.post_form("/survey", &survey_body("Joko", 2)).await;

    let (status, _, body) = app.get("/admin", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Menampilkan <strong>2</strong> Responden (dari total <strong>2</strong>)"));
    assert!(body.contains("Indra"));
    assert!(body.contains("Parkir sempit"));

    // Malformed dates fall back to the full range
    let (status, _, body) = app.get("/admin?start=kemarin&end=", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Joko"));
}

#[tokio::test]
async fn dashboard_clusters_three_respondents() {
    let app = TestApp::new();
    for (name, score) in [("Lusi", 1), ("Made", 3), ("Nina", 5)] {
        app.post_form("/survey", &survey_body(name, score)).await;
    }
    let cookie = app.login().await;

    let (status, _, body) = app.get("/admin", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("minimum 3"));

    let chart_drawn = body.contains("<svg") && body.contains("Pusat Kluster");
    let chart_error = body.contains("Terjadi error saat visualisasi K-Means");
    assert!(chart_drawn || chart_error);

    assert!(body.contains("Detail Data Kluster"));
    assert!(body.contains("Negatif/Kurang Puas"));
    assert!(body.contains("Positif/Puas"));
}

#[tokio::test]
async fn export_downloads_a_workbook() {
    let app = TestApp::new();
    app.post_form("/survey", &survey_body("Kiki", 3)).await;
    let cookie = app.login().await;

    let response = app
        .router()
        .oneshot(
            Request::get("/admin/export")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"hasil_survei_klinik_"));
    assert!(disposition.ends_with(".xlsx\""));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let request = Request::post("/admin/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (_, _, body) = app.get("/admin", Some(&cookie)).await;
    assert!(body.contains("Masukkan Password Admin"));
}
