#![cfg(not(tarpaulin_include))]

use crate::app::AppState;
use crate::error::AppError;
use crate::page;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Name of the cookie carrying the admin session id
pub const SESSION_COOKIE: &str = "admin_session";

/// Admin login form data
#[derive(Debug, Deserialize)]
pub struct AdminCredentials {
    /// Password in plaintext (only transmitted, never stored)
    #[serde(default)]
    pub password: String,
}

/// Admin session data
///
/// Represents an authenticated admin session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Time when the session expires
    pub expires_at: SystemTime,
}

/// Admin password check and session bookkeeping
///
/// The dashboard has a single shared admin password. Only its Argon2 hash is
/// kept in memory; sessions live in a thread-safe map keyed by a random id.
pub struct AdminAuth {
    password_hash: String,
    sessions: RwLock<HashMap<String, Session>>,
    session_ttl: Duration,
}

impl AdminAuth {
    /// Hash the configured admin password and start with no sessions
    ///
    /// # Arguments
    /// * `password` - The configured admin password
    /// * `session_ttl` - How long a login stays valid
    ///
    /// # Returns
    /// * `Result<AdminAuth, AppError>` - The authenticator or a hashing error
    pub fn new(password: &str, session_ttl: Duration) -> Result<Self, AppError> {
        Ok(Self {
            password_hash: hash_password(password)?,
            sessions: RwLock::new(HashMap::new()),
            session_ttl,
        })
    }

    /// Check a submitted password against the stored hash
    pub fn verify_password(&self, password: &str) -> Result<bool, AppError> {
        verify_password(password, &self.password_hash)
    }

    /// Create a new admin session
    ///
    /// Expired sessions are dropped while the map is locked.
    ///
    /// # Returns
    /// * `String` - A unique session ID
    pub fn create_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let now = SystemTime::now();
        let session = Session {
            expires_at: now + self.session_ttl,
        };

        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session_id.clone(), session);

        session_id
    }

    /// Checks if a session exists and has not expired
    pub fn validate_session(&self, session_id: &str) -> bool {
        let sessions = self
            .sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        sessions
            .get(session_id)
            .is_some_and(|session| session.expires_at > SystemTime::now())
    }

    pub fn end_session(&self, session_id: &str) {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(session_id);
    }

    /// Whether the request's cookie jar holds a live admin session
    pub fn is_authenticated(&self, jar: &CookieJar) -> bool {
        jar.get(SESSION_COOKIE)
            .is_some_and(|cookie| self.validate_session(cookie.value()))
    }
}

/// Hash a password using Argon2
///
/// # Arguments
/// * `password` - The plaintext password to hash
///
/// # Returns
/// * `Result<String, AppError>` - The password hash or an error
fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err(AppError::Auth("Password hashing failed".to_string())),
    }
}

/// Verify a password against a stored hash
///
/// # Returns
/// * `Result<bool, AppError>` - True if the password matches, false if not, or an error
///
/// # Errors
/// * Returns an error if the hash is in an invalid format
fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err(AppError::Auth("Invalid password hash format".to_string())),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Handle admin login requests
///
/// Verifies the submitted password and creates a session if it matches.
///
/// # Arguments
/// * `state` - Shared application state
/// * `jar` - Cookie jar for storing the session cookie
/// * `credentials` - Form data containing the password
///
/// # Returns
/// * `Response` - Redirect to the dashboard if successful, or the login page with an error
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<AdminCredentials>,
) -> Result<Response, AppError> {
    if credentials.password.is_empty() {
        let html = page::render_login(&state, None)?;
        return Ok(Html(html).into_response());
    }

    if state.auth.verify_password(&credentials.password)? {
        info!("Admin logged in");
        let session_id = state.auth.create_session();
        Ok((jar.add(session_cookie(session_id)), Redirect::to("/admin")).into_response())
    } else {
        warn!("Rejected admin login with a wrong password");
        let html = page::render_login(&state, Some("Password salah. Coba lagi."))?;
        Ok((StatusCode::UNAUTHORIZED, Html(html)).into_response())
    }
}

/// Handle admin logout
///
/// Ends the server-side session and clears the session cookie.
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.auth.end_session(cookie.value());
    }

    (jar.remove(session_cookie(String::new())), Redirect::to("/admin"))
}

/// Authentication middleware
///
/// Lets requests with a valid admin session through; everything else is
/// redirected to the admin login page.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if state.auth.is_authenticated(&jar) {
        return next.run(request).await;
    }

    Redirect::to("/admin").into_response()
}
