//! Survey vocabulary: the Likert scale, respondent demographics, the fixed
//! question catalogue and validation of a submitted form.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

lazy_static! {
    /// Question keys look like `u3`, `b10` or `k2`.
    static ref QUESTION_KEY: Regex = Regex::new(r"^([ubk])(\d{1,2})$").unwrap();
}

/// One answer on the five-point satisfaction scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Likert {
    VeryDissatisfied = 1,
    Dissatisfied = 2,
    Neutral = 3,
    Satisfied = 4,
    VerySatisfied = 5,
}

impl Likert {
    pub const ALL: [Likert; 5] = [
        Likert::VeryDissatisfied,
        Likert::Dissatisfied,
        Likert::Neutral,
        Likert::Satisfied,
        Likert::VerySatisfied,
    ];

    pub fn from_score(score: i64) -> Option<Self> {
        match score {
            1 => Some(Likert::VeryDissatisfied),
            2 => Some(Likert::Dissatisfied),
            3 => Some(Likert::Neutral),
            4 => Some(Likert::Satisfied),
            5 => Some(Likert::VerySatisfied),
            _ => None,
        }
    }

    pub fn score(self) -> i64 {
        self as i64
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Likert::VeryDissatisfied => "😠",
            Likert::Dissatisfied => "😟",
            Likert::Neutral => "😐",
            Likert::Satisfied => "🙂",
            Likert::VerySatisfied => "😄",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Likert::VeryDissatisfied => "Sangat Tidak Puas",
            Likert::Dissatisfied => "Tidak Puas",
            Likert::Neutral => "Netral",
            Likert::Satisfied => "Puas",
            Likert::VerySatisfied => "Sangat Puas",
        }
    }

    /// Text shown next to the radio button, e.g. `"4 🙂 Puas"`.
    pub fn option_text(self) -> String {
        format!("{} {} {}", self.score(), self.emoji(), self.label())
    }

    /// Text stored with the answer: the option text without its leading score.
    pub fn answer_text(self) -> String {
        format!("{} {}", self.emoji(), self.label())
    }
}

/// Which questionnaire track the respondent filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServiceType {
    General,
    Bpjs,
}

impl ServiceType {
    pub const ALL: [ServiceType; 2] = [ServiceType::General, ServiceType::Bpjs];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::General => "Umum",
            ServiceType::Bpjs => "BPJS",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Prefix shared by this track's question keys.
    pub fn key_prefix(self) -> char {
        match self {
            ServiceType::General => 'u',
            ServiceType::Bpjs => 'b',
        }
    }

    pub fn section_title(self) -> &'static str {
        match self {
            ServiceType::General => "B1. Kepuasan Pelayanan – LAYANAN UMUM",
            ServiceType::Bpjs => "B2. Kepuasan Pelayanan – LAYANAN BPJS",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeBracket {
    Under20,
    From21To30,
    From31To40,
    From41To50,
    Over50,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 5] = [
        AgeBracket::Under20,
        AgeBracket::From21To30,
        AgeBracket::From31To40,
        AgeBracket::From41To50,
        AgeBracket::Over50,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgeBracket::Under20 => "Dibawah 20 tahun",
            AgeBracket::From21To30 => "21–30 tahun",
            AgeBracket::From31To40 => "31–40 tahun",
            AgeBracket::From41To50 => "41–50 tahun",
            AgeBracket::Over50 => "Diatas 50 tahun",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Laki-laki",
            Gender::Female => "Perempuan",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == value)
    }
}

/// Ordinal satisfaction bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// Fixed display order, worst to best.
    pub const ORDER: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

    /// Bucket for a single respondent's mean score.
    pub fn from_average(average: f64) -> Self {
        if average >= 4.0 {
            Sentiment::Positive
        } else if average >= 2.5 {
            Sentiment::Neutral
        } else {
            Sentiment::Negative
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Negative => "Negatif",
            Sentiment::Neutral => "Netral",
            Sentiment::Positive => "Positif",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Sentiment::Negative => "😠",
            Sentiment::Neutral => "😐",
            Sentiment::Positive => "😄",
        }
    }

    /// Label used for k-means clusters on the dashboard and in the export.
    pub fn cluster_label(self) -> &'static str {
        match self {
            Sentiment::Negative => "Negatif/Kurang Puas",
            Sentiment::Neutral => "Netral",
            Sentiment::Positive => "Positif/Puas",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Question {
    pub key: &'static str,
    pub text: &'static str,
}

const fn q(key: &'static str, text: &'static str) -> Question {
    Question { key, text }
}

pub const GENERAL_QUESTIONS: [Question; 10] = [
    q("u1", "Dokter menjelaskan kondisi dan pengobatan dengan jelas."),
    q("u2", "Dokter bersikap ramah dan profesional selama pemeriksaan."),
    q("u3", "Waktu tunggu sebelum pemeriksaan sesuai harapan."),
    q("u4", "Proses pendaftaran dan pembayaran berlangsung cepat dan mudah."),
    q("u5", "Petugas administrasi sopan dan informatif."),
    q("u6", "Obat sesuai keluhan & ketersediaan memadai."),
    q("u7", "Ruang tunggu & fasilitas bersih/nyaman."),
    q("u8", "Biaya sesuai kualitas layanan."),
    q("u9", "Secara keseluruhan puas pada layanan umum."),
    q("u10", "Bersedia datang kembali & merekomendasikan."),
];

pub const BPJS_QUESTIONS: [Question; 10] = [
    q("b1", "Pendaftaran BPJS mudah & cepat."),
    q("b2", "Petugas BPJS informatif & membantu."),
    q("b3", "Dokter ramah & menjelaskan pengobatan dengan baik."),
    q("b4", "Waktu tunggu dokter sesuai harapan."),
    q("b5", "Administrasi & pengambilan obat lancar."),
    q("b6", "Tidak ada perbedaan perlakuan dgn pasien umum."),
    q("b7", "Prosedur rujukan cepat & jelas."),
    q("b8", "Fasilitas klinik bersih & nyaman."),
    q("b9", "Secara keseluruhan puas pada layanan BPJS."),
    q("b10", "Bersedia datang kembali & merekomendasikan."),
];

pub const OVERALL_QUESTIONS: [Question; 3] = [
    q("k1", "Pelayanan keseluruhan klinik baik."),
    q("k2", "Akan kembali menggunakan layanan klinik."),
    q("k3", "Akan merekomendasikan ke keluarga/teman."),
];

pub fn questions_for(service: ServiceType) -> &'static [Question] {
    match service {
        ServiceType::General => &GENERAL_QUESTIONS,
        ServiceType::Bpjs => &BPJS_QUESTIONS,
    }
}

/// Group a stored question key belongs to, if it is a known key shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionGroup {
    Service,
    Overall,
}

pub fn question_group(key: &str) -> Option<QuestionGroup> {
    let caps = QUESTION_KEY.captures(key)?;
    match &caps[1] {
        "u" | "b" => Some(QuestionGroup::Service),
        "k" => Some(QuestionGroup::Overall),
        _ => None,
    }
}

fn form_field<'a>(fields: &'a HashMap<String, String>, name: &str) -> &'a str {
    fields.get(name).map(|v| v.trim()).unwrap_or("")
}

/// A validated survey submission, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub name: String,
    pub gender: Gender,
    pub age: AgeBracket,
    pub service: ServiceType,
    /// Keyed by question key; only the selected track and the overall section.
    pub answers: BTreeMap<String, Likert>,
    pub suggestion: Option<String>,
}

/// Everything wrong with a submitted form, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormError {
    pub problems: Vec<String>,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.problems.join("; "))
    }
}

impl std::error::Error for FormError {}

impl Submission {
    /// Parse and validate raw form fields.
    ///
    /// Field names are `name`, `gender`, `age`, `service`, `suggestion` and
    /// one field per question key holding the score `1`..`5`. Answers to the
    /// track that was not selected are dropped.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self, FormError> {
        let mut problems = Vec::new();
        let field = |name: &str| form_field(fields, name);

        let name = field("name").to_string();
        let gender = Gender::parse(field("gender"));
        let age = AgeBracket::parse(field("age"));
        let service = ServiceType::parse(field("service"));

        let mut answers = BTreeMap::new();
        let mut unanswered = false;

        if let Some(service) = service {
            let keys = questions_for(service).iter().map(|q| (q, true));
            let overall = OVERALL_QUESTIONS.iter().map(|q| (q, false));

            for (question, required) in keys.chain(overall) {
                match field(question.key) {
                    "" => unanswered |= required,
                    raw => match raw.parse().ok().and_then(Likert::from_score) {
                        Some(score) => {
                            answers.insert(question.key.to_string(), score);
                        }
                        None => problems.push(format!(
                            "Jawaban tidak valid untuk pertanyaan {}.",
                            question.key
                        )),
                    },
                }
            }
        } else {
            problems.push("Jenis layanan tidak valid.".to_string());
        }

        if name.is_empty() || unanswered {
            problems.insert(
                0,
                "Mohon isi Nama Lengkap dan semua pertanyaan di bagian Kepuasan Pelayanan."
                    .to_string(),
            );
        }
        if gender.is_none() {
            problems.push("Jenis kelamin tidak valid.".to_string());
        }
        if age.is_none() {
            problems.push("Usia tidak valid.".to_string());
        }

        match (gender, age, service) {
            (Some(gender), Some(age), Some(service)) if problems.is_empty() => {
                let suggestion = Some(field("suggestion").to_string()).filter(|s| !s.is_empty());
                Ok(Submission {
                    name,
                    gender,
                    age,
                    service,
                    answers,
                    suggestion,
                })
            }
            _ => Err(FormError { problems }),
        }
    }

    /// Mean of every answered score, or 0 when nothing was answered.
    pub fn average_score(&self) -> f64 {
        if self.answers.is_empty() {
            return 0.0;
        }
        let total: i64 = self.answers.values().map(|s| s.score()).sum();
        total as f64 / self.answers.len() as f64
    }

    pub fn sentiment(&self) -> Sentiment {
        Sentiment::from_average(self.average_score())
    }
}
