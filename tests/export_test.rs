use chrono::NaiveDate;
use std::collections::HashMap;
use survey::analysis::Dashboard;
use survey::downloader::{to_csv, to_xlsx};
use survey::store::Database;
use survey::survey::{GENERAL_QUESTIONS, Submission};
use survey::table::{CellValue, Table};

fn seeded_database() -> Database {
    let db = Database::open_in_memory().unwrap();
    let mut fields = HashMap::new();
    fields.insert("name".to_string(), "Gita".to_string());
    fields.insert("gender".to_string(), "Perempuan".to_string());
    fields.insert("age".to_string(), "Dibawah 20 tahun".to_string());
    fields.insert("service".to_string(), "Umum".to_string());
    fields.insert("suggestion".to_string(), "Tambah kursi, \"segera\"".to_string());
    for q in GENERAL_QUESTIONS.iter() {
        fields.insert(q.key.to_string(), "3".to_string());
    }

    let submitted = NaiveDate::from_ymd_opt(2025, 5, 20)
        .unwrap()
        .and_hms_opt(14, 0, 0)
        .unwrap();
    db.save_submission(&Submission::from_form(&fields).unwrap(), submitted)
        .unwrap();
    db
}

#[test]
fn suggestion_sheet_as_csv() {
    let data = seeded_database().load_all().unwrap();
    let dashboard = Dashboard::build(&data, None, None).unwrap();
    let tables = dashboard.tables();

    let suggestions = tables.iter().find(|t| t.title == "Saran Masukan").unwrap();
    let csv = to_csv(suggestions);
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("id,responden_id,saran"));
    assert_eq!(lines.next(), Some("1,1,\"Tambah kursi, \"\"segera\"\"\""));
    assert_eq!(lines.next(), None);
}

#[test]
fn respondent_sheet_keeps_timestamp_text() {
    let data = seeded_database().load_all().unwrap();
    let tables = Dashboard::build(&data, None, None).unwrap().tables();

    let csv = to_csv(&tables[0]);
    assert!(csv.starts_with("id,nama,jenis_kelamin,usia,layanan,tanggal\n"));
    assert!(csv.contains("Gita,Perempuan,Dibawah 20 tahun,Umum,2025-05-20 14:00:00"));
}

#[test]
fn workbook_is_a_zip_archive() {
    let data = seeded_database().load_all().unwrap();
    let tables = Dashboard::build(&data, None, None).unwrap().tables();

    let bytes = to_xlsx(&tables).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn empty_tables_still_make_a_workbook() {
    let empty = Table {
        title: "Analisis Kluster".to_string(),
        columns: vec!["responden_id".to_string()],
        rows: vec![],
    };
    let bytes = to_xlsx(&[empty]).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn numbers_export_at_full_precision() {
    let table = Table {
        title: "Analisis Kluster".to_string(),
        columns: vec!["skor_layanan".to_string()],
        rows: vec![vec![CellValue::Number(10.0 / 3.0)]],
    };
    assert_eq!(to_csv(&table), format!("skor_layanan\n{}\n", 10.0_f64 / 3.0));
}
