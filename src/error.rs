#[cfg(feature = "web")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised by the survey application.
///
/// Form validation problems are not errors here: they are reported back to
/// the respondent through [`crate::survey::FormError`] and a re-rendered form.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Excel export failed: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("Clustering failed: {0}")]
    Clustering(String),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "web")]
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[cfg(feature = "web")]
    #[error("Template syntax error: {0}")]
    TemplateSyntax(#[from] Box<handlebars::TemplateError>),

    #[error("Authentication error: {0}")]
    Auth(String),
}

#[cfg(feature = "web")]
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log::error!("{self}");

        let status = match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
