use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use survey::analysis::{ClusterOutcome, Dashboard};
use survey::store::Database;
use survey::survey::{BPJS_QUESTIONS, GENERAL_QUESTIONS, OVERALL_QUESTIONS, Sentiment, Submission};
use tempfile::tempdir;

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(hour, 15, 0)
        .unwrap()
}

/// A valid submission answering every question with `score`.
fn submission(name: &str, service: &str, score: u8, suggestion: &str) -> Submission {
    let mut fields = HashMap::new();
    fields.insert("name".to_string(), name.to_string());
    fields.insert("gender".to_string(), "Laki-laki".to_string());
    fields.insert("age".to_string(), "Diatas 50 tahun".to_string());
    fields.insert("service".to_string(), service.to_string());
    fields.insert("suggestion".to_string(), suggestion.to_string());

    let track = if service == "BPJS" {
        &BPJS_QUESTIONS
    } else {
        &GENERAL_QUESTIONS
    };
    for q in track.iter().chain(OVERALL_QUESTIONS.iter()) {
        fields.insert(q.key.to_string(), score.to_string());
    }

    Submission::from_form(&fields).unwrap()
}

#[test]
fn submissions_survive_reopening_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("survei_klinik.db");

    {
        let db = Database::open(&path).unwrap();
        db.save_submission(&submission("Ani", "Umum", 4, "Antrian lama"), at(1, 9))
            .unwrap();
        db.save_submission(&submission("Budi", "BPJS", 2, ""), at(2, 10))
            .unwrap();
    }

    let db = Database::open(&path).unwrap();
    assert_eq!(db.respondent_count().unwrap(), 2);

    let data = db.load_all().unwrap();
    let names: Vec<&str> = data.respondents.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Budi", "Ani"]);
    assert_eq!(data.respondents[0].service, "BPJS");
    assert_eq!(data.respondents[1].submitted_at, at(1, 9));

    let json = serde_json::to_value(&data.respondents[1]).unwrap();
    assert_eq!(json["submitted_at"], "2025-03-01T09:15:00");

    // 13 answers each, newest respondent first, questions in insert order
    assert_eq!(data.answers.len(), 26);
    assert_eq!(data.answers[0].respondent_id, data.respondents[0].id);
    assert!(data.answers[..13].iter().all(|a| a.score == 2));
    assert_eq!(data.answers[13].answer_text, "🙂 Puas");

    // Blank suggestions are not stored
    assert_eq!(data.suggestions.len(), 1);
    assert_eq!(data.suggestions[0].text, "Antrian lama");
}

#[test]
fn only_the_selected_track_is_stored() {
    let db = Database::open_in_memory().unwrap();
    let mut fields = HashMap::new();
    fields.insert("name".to_string(), "Citra".to_string());
    fields.insert("gender".to_string(), "Perempuan".to_string());
    fields.insert("age".to_string(), "Dibawah 20 tahun".to_string());
    fields.insert("service".to_string(), "BPJS".to_string());
    for q in BPJS_QUESTIONS.iter().chain(GENERAL_QUESTIONS.iter()) {
        fields.insert(q.key.to_string(), "5".to_string());
    }

    let s = Submission::from_form(&fields).unwrap();
    db.save_submission(&s, at(3, 8)).unwrap();

    let data = db.load_all().unwrap();
    assert_eq!(data.answers.len(), BPJS_QUESTIONS.len());
    assert!(data.answers.iter().all(|a| a.question_key.starts_with('b')));
}

#[test]
fn dashboard_filters_by_date_and_clusters() {
    let db = Database::open_in_memory().unwrap();
    db.save_submission(&submission("Dedi", "Umum", 1, "Kotor"), at(1, 8))
        .unwrap();
    db.save_submission(&submission("Eka", "BPJS", 3, ""), at(5, 8))
        .unwrap();
    db.save_submission(&submission("Fani", "Umum", 5, "Mantap"), at(9, 8))
        .unwrap();
    let all = db.load_all().unwrap();

    let full = Dashboard::build(&all, None, None).unwrap();
    assert_eq!(full.range.start, at(1, 0).date());
    assert_eq!(full.range.end, at(9, 0).date());
    assert_eq!(full.data.respondents.len(), 3);
    assert_eq!(full.merged.len(), 3);

    match &full.clusters {
        ClusterOutcome::Clustered(report) => {
            assert_eq!(report.rows.len(), 3);
            let sentiment_of = |score: f64| {
                report
                    .rows
                    .iter()
                    .find(|r| r.point.service_score == score)
                    .and_then(|r| r.sentiment)
            };
            assert_eq!(sentiment_of(1.0), Some(Sentiment::Negative));
            assert_eq!(sentiment_of(3.0), Some(Sentiment::Neutral));
            assert_eq!(sentiment_of(5.0), Some(Sentiment::Positive));
        }
        other => panic!("expected clusters, got {other:?}"),
    }

    let tables = full.tables();
    assert_eq!(tables.len(), 5);
    assert_eq!(tables[4].len(), 3);

    let early = Dashboard::build(&all, None, Some(at(5, 0).date())).unwrap();
    assert_eq!(early.total_respondents, 3);
    assert_eq!(early.data.respondents.len(), 2);
    assert_eq!(early.data.suggestions.len(), 1);
    assert!(matches!(early.clusters, ClusterOutcome::InsufficientData(_)));
}

#[test]
fn empty_database_has_no_dashboard() {
    let db = Database::open_in_memory().unwrap();
    let data = db.load_all().unwrap();
    assert!(data.is_empty());
    assert!(Dashboard::build(&data, None, None).is_none());
}
