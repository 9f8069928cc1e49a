use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use log::{info, warn};

use crate::error::AppError;

pub const DEFAULT_ADMIN_PASSWORD: &str = "kliniktheresia";

/// Runtime settings, read from `SURVEY_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub db_path: PathBuf,
    pub media_dir: PathBuf,
    pub admin_password: String,
    pub session_ttl: Duration,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let admin_password = var("SURVEY_ADMIN_PASSWORD").unwrap_or_else(|_| {
            warn!("SURVEY_ADMIN_PASSWORD not set, falling back to the built-in admin password");
            DEFAULT_ADMIN_PASSWORD.to_string()
        });

        if admin_password.is_empty() {
            return Err(AppError::Config(
                "SURVEY_ADMIN_PASSWORD must not be empty".to_string(),
            ));
        }

        let session_ttl = session_ttl(try_load("SURVEY_SESSION_HOURS", "8")?)?;

        Ok(Self {
            addr: try_load("SURVEY_ADDR", "127.0.0.1:3000")?,
            db_path: try_load("SURVEY_DB_PATH", "survei_klinik.db")?,
            media_dir: try_load("SURVEY_MEDIA_DIR", "media")?,
            admin_password,
            session_ttl,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
            db_path: PathBuf::from("survei_klinik.db"),
            media_dir: PathBuf::from("media"),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            session_ttl: Duration::from_secs(8 * 60 * 60),
        }
    }
}

/// Session lifetime for a number of hours.
fn session_ttl(hours: u64) -> Result<Duration, AppError> {
    hours
        .checked_mul(60 * 60)
        .map(Duration::from_secs)
        .ok_or_else(|| AppError::Config(format!("SURVEY_SESSION_HOURS too large: {hours}")))
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| ())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            AppError::Config(format!("invalid {key}: {e}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_hours_become_seconds() {
        assert_eq!(session_ttl(8).unwrap(), Duration::from_secs(8 * 60 * 60));
        assert_eq!(session_ttl(0).unwrap(), Duration::ZERO);
    }

    #[test]
    fn huge_session_hours_are_rejected() {
        assert!(matches!(session_ttl(u64::MAX), Err(AppError::Config(_))));
    }
}
