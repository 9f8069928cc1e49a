//! SQLite persistence for survey submissions.
//!
//! The table and column names match the clinic's existing `survei_klinik.db`
//! so an old database file can be opened as-is.

use chrono::NaiveDateTime;
use log::{debug, info};
use rusqlite::{Connection, params};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::AppError;
use crate::survey::Submission;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS responden (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nama TEXT,
    jenis_kelamin TEXT,
    usia TEXT,
    layanan TEXT,
    tanggal TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS jawaban (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    responden_id INTEGER,
    pertanyaan_key TEXT,
    jawaban_teks TEXT,
    jawaban_skor INTEGER,
    FOREIGN KEY (responden_id) REFERENCES responden (id)
);

CREATE TABLE IF NOT EXISTS saran_masukan (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    responden_id INTEGER,
    saran TEXT,
    FOREIGN KEY (responden_id) REFERENCES responden (id)
);
"#;

/// One stored survey submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Respondent {
    pub id: i64,
    pub name: String,
    pub gender: String,
    pub age: String,
    pub service: String,
    pub submitted_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub id: i64,
    pub respondent_id: i64,
    pub question_key: String,
    pub answer_text: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub id: i64,
    pub respondent_id: i64,
    pub text: String,
}

/// Full contents of the three tables, in dashboard order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyData {
    /// Newest respondent first.
    pub respondents: Vec<Respondent>,
    /// Grouped by respondent (newest first), question order within a group.
    pub answers: Vec<Answer>,
    pub suggestions: Vec<Suggestion>,
}

impl SurveyData {
    pub fn is_empty(&self) -> bool {
        self.respondents.is_empty()
    }
}

/// Shared handle to the survey database.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and make sure the tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        info!("Opening survey database at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves the connection usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store one submission in a single transaction and return the new respondent id.
    pub fn save_submission(
        &self,
        submission: &Submission,
        submitted_at: NaiveDateTime,
    ) -> Result<i64, AppError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO responden (nama, jenis_kelamin, usia, layanan, tanggal) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                submission.name,
                submission.gender.as_str(),
                submission.age.as_str(),
                submission.service.as_str(),
                submitted_at,
            ],
        )?;
        let respondent_id = tx.last_insert_rowid();

        {
            let mut insert = tx.prepare(
                "INSERT INTO jawaban (responden_id, pertanyaan_key, jawaban_teks, jawaban_skor) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (key, answer) in &submission.answers {
                insert.execute(params![respondent_id, key, answer.answer_text(), answer.score()])?;
            }
        }

        if let Some(suggestion) = &submission.suggestion {
            tx.execute(
                "INSERT INTO saran_masukan (responden_id, saran) VALUES (?1, ?2)",
                params![respondent_id, suggestion],
            )?;
        }

        tx.commit()?;
        debug!(
            "Stored respondent {respondent_id} with {} answers",
            submission.answers.len()
        );
        Ok(respondent_id)
    }

    /// Read every table in full.
    pub fn load_all(&self) -> Result<SurveyData, AppError> {
        let conn = self.conn();

        let respondents = conn
            .prepare(
                "SELECT id, nama, jenis_kelamin, usia, layanan, tanggal FROM responden ORDER BY id DESC",
            )?
            .query_map([], |row| {
                Ok(Respondent {
                    id: row.get(0)?,
                    name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    gender: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    age: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    service: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    submitted_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let answers = conn
            .prepare(
                "SELECT id, responden_id, pertanyaan_key, jawaban_teks, jawaban_skor FROM jawaban ORDER BY responden_id DESC, id ASC",
            )?
            .query_map([], |row| {
                Ok(Answer {
                    id: row.get(0)?,
                    respondent_id: row.get(1)?,
                    question_key: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    answer_text: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    score: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let suggestions = conn
            .prepare(
                "SELECT id, responden_id, saran FROM saran_masukan ORDER BY responden_id DESC",
            )?
            .query_map([], |row| {
                Ok(Suggestion {
                    id: row.get(0)?,
                    respondent_id: row.get(1)?,
                    text: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SurveyData {
            respondents,
            answers,
            suggestions,
        })
    }

    pub fn respondent_count(&self) -> Result<i64, AppError> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM responden", [], |row| row.get(0))?;
        Ok(count)
    }
}
