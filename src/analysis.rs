//! Dashboard aggregation: date filtering, the respondent/suggestion join, the
//! per-respondent score pivot and the three-cluster k-means grouping.

use chrono::NaiveDate;
use linfa::DatasetBase;
use linfa::traits::{Fit, Predict};
use linfa_clustering::KMeans;
use log::{debug, warn};
use ndarray::{Array1, Array2};
use rand_xoshiro::Xoshiro256Plus;
use rand_xoshiro::rand_core::SeedableRng;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::error::AppError;
use crate::store::{Answer, Respondent, Suggestion, SurveyData};
use crate::survey::{QuestionGroup, Sentiment, question_group};
use crate::table::{CellValue, Table, TableRow};

pub const CLUSTER_COUNT: usize = 3;
const KMEANS_SEED: u64 = 42;
const KMEANS_RUNS: usize = 10;

pub const SHEET_RESPONDENTS: &str = "Responden";
pub const SHEET_ANSWERS: &str = "Detail Jawaban";
pub const SHEET_SUGGESTIONS: &str = "Saran Masukan";
pub const SHEET_MERGED: &str = "Data Gabungan";
pub const SHEET_CLUSTERS: &str = "Analisis Kluster";

/// Inclusive range of submission dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Earliest and latest submission dates, if there are any respondents.
    pub fn bounds(respondents: &[Respondent]) -> Option<Self> {
        let dates = respondents.iter().map(|r| r.submitted_at.date());
        let start = dates.clone().min()?;
        let end = dates.max()?;
        Some(Self { start, end })
    }

    /// Requested range, defaulted to and clamped into `bounds`.
    ///
    /// A reversed range is swapped rather than treated as empty.
    pub fn resolve(bounds: Self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let clamp = |d: NaiveDate| d.clamp(bounds.start, bounds.end);
        let start = clamp(start.unwrap_or(bounds.start));
        let end = clamp(end.unwrap_or(bounds.end));

        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl SurveyData {
    /// Respondents submitted within `range`, with their answers and suggestions.
    pub fn filter(&self, range: DateRange) -> SurveyData {
        let respondents: Vec<Respondent> = self
            .respondents
            .iter()
            .filter(|r| range.contains(r.submitted_at.date()))
            .cloned()
            .collect();
        let ids: HashSet<i64> = respondents.iter().map(|r| r.id).collect();

        SurveyData {
            answers: self
                .answers
                .iter()
                .filter(|a| ids.contains(&a.respondent_id))
                .cloned()
                .collect(),
            suggestions: self
                .suggestions
                .iter()
                .filter(|s| ids.contains(&s.respondent_id))
                .cloned()
                .collect(),
            respondents,
        }
    }
}

/// A respondent joined with one of their suggestions (or none).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRow {
    pub respondent: Respondent,
    pub suggestion: Option<Suggestion>,
}

/// Left join of respondents onto suggestions, keeping respondent order.
pub fn merge_suggestions(respondents: &[Respondent], suggestions: &[Suggestion]) -> Vec<MergedRow> {
    let mut merged = Vec::with_capacity(respondents.len());
    for respondent in respondents {
        let mut matched = suggestions
            .iter()
            .filter(|s| s.respondent_id == respondent.id)
            .peekable();

        if matched.peek().is_none() {
            merged.push(MergedRow {
                respondent: respondent.clone(),
                suggestion: None,
            });
        }
        for suggestion in matched {
            merged.push(MergedRow {
                respondent: respondent.clone(),
                suggestion: Some(suggestion.clone()),
            });
        }
    }
    merged
}

/// Averaged scores for one respondent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterPoint {
    pub respondent_id: i64,
    /// Mean of the General/BPJS track answers.
    pub service_score: f64,
    /// Mean of the overall-experience answers.
    pub overall_score: f64,
}

/// Pivot long-format answers into one point per respondent.
///
/// Respondents missing either group of answers are left out. Points are
/// ordered by respondent id.
pub fn prepare_cluster_data(answers: &[Answer]) -> Vec<ClusterPoint> {
    let mut service: BTreeMap<i64, (i64, usize)> = BTreeMap::new();
    let mut overall: BTreeMap<i64, (i64, usize)> = BTreeMap::new();

    for answer in answers {
        let bucket = match question_group(&answer.question_key) {
            Some(QuestionGroup::Service) => &mut service,
            Some(QuestionGroup::Overall) => &mut overall,
            None => continue,
        };
        let entry = bucket.entry(answer.respondent_id).or_insert((0, 0));
        entry.0 += answer.score;
        entry.1 += 1;
    }

    service
        .into_iter()
        .filter_map(|(respondent_id, (sum, count))| {
            let (o_sum, o_count) = overall.get(&respondent_id)?;
            Some(ClusterPoint {
                respondent_id,
                service_score: sum as f64 / count as f64,
                overall_score: *o_sum as f64 / *o_count as f64,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterRow {
    pub point: ClusterPoint,
    pub cluster: Option<usize>,
    pub sentiment: Option<Sentiment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterCenter {
    pub cluster: usize,
    pub service_score: f64,
    pub overall_score: f64,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    pub rows: Vec<ClusterRow>,
    /// Indexed by cluster number.
    pub centers: Vec<ClusterCenter>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterOutcome {
    Clustered(ClusterReport),
    /// Fewer than three respondents, or fewer than three distinct points.
    InsufficientData(Vec<ClusterPoint>),
    Failed {
        points: Vec<ClusterPoint>,
        error: String,
    },
}

impl ClusterOutcome {
    /// Rows for the cluster sheet; unclustered points have empty labels.
    pub fn rows(&self) -> Vec<ClusterRow> {
        match self {
            ClusterOutcome::Clustered(report) => report.rows.clone(),
            ClusterOutcome::InsufficientData(points) | ClusterOutcome::Failed { points, .. } => {
                points
                    .iter()
                    .map(|&point| ClusterRow {
                        point,
                        cluster: None,
                        sentiment: None,
                    })
                    .collect()
            }
        }
    }
}

/// Run the fixed three-cluster k-means and name clusters by centre order.
pub fn cluster(points: &[ClusterPoint]) -> ClusterOutcome {
    if points.len() < CLUSTER_COUNT {
        debug!("Skipping clustering: only {} points", points.len());
        return ClusterOutcome::InsufficientData(points.to_vec());
    }

    match fit_clusters(points) {
        Ok(report) => ClusterOutcome::Clustered(report),
        Err(e) => {
            warn!("{e}");
            ClusterOutcome::Failed {
                points: points.to_vec(),
                error: e.to_string(),
            }
        }
    }
}

fn fit_clusters(points: &[ClusterPoint]) -> Result<ClusterReport, AppError> {
    let flat: Vec<f64> = points
        .iter()
        .flat_map(|p| [p.service_score, p.overall_score])
        .collect();
    let records = Array2::from_shape_vec((points.len(), 2), flat)
        .map_err(|e| AppError::Clustering(e.to_string()))?;

    let dataset = DatasetBase::from(records.clone());
    let rng = Xoshiro256Plus::seed_from_u64(KMEANS_SEED);
    let model = KMeans::params_with_rng(CLUSTER_COUNT, rng)
        .n_runs(KMEANS_RUNS)
        .fit(&dataset)
        .map_err(|e| AppError::Clustering(e.to_string()))?;

    let labels: Array1<usize> = model.predict(&records);
    let centroids = model.centroids();

    let mut order: Vec<usize> = (0..centroids.nrows()).collect();
    order.sort_by(|&a, &b| {
        let mean = |i: usize| (centroids[[i, 0]] + centroids[[i, 1]]) / 2.0;
        mean(a).total_cmp(&mean(b))
    });

    let mut sentiments = vec![Sentiment::Neutral; centroids.nrows()];
    for (rank, &cluster) in order.iter().enumerate() {
        sentiments[cluster] = Sentiment::ORDER[rank.min(Sentiment::ORDER.len() - 1)];
    }

    let centers = (0..centroids.nrows())
        .map(|i| ClusterCenter {
            cluster: i,
            service_score: centroids[[i, 0]],
            overall_score: centroids[[i, 1]],
            sentiment: sentiments[i],
        })
        .collect();

    let rows = points
        .iter()
        .zip(labels.iter())
        .map(|(&point, &label)| ClusterRow {
            point,
            cluster: Some(label),
            sentiment: sentiments.get(label).copied(),
        })
        .collect();

    Ok(ClusterReport { rows, centers })
}

/// Everything the admin dashboard shows for one date range.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub bounds: DateRange,
    pub range: DateRange,
    pub total_respondents: usize,
    pub data: SurveyData,
    pub merged: Vec<MergedRow>,
    pub clusters: ClusterOutcome,
}

impl Dashboard {
    /// `None` when nothing has been submitted yet.
    pub fn build(all: &SurveyData, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        let bounds = DateRange::bounds(&all.respondents)?;
        let range = DateRange::resolve(bounds, start, end);
        let data = all.filter(range);
        let merged = merge_suggestions(&data.respondents, &data.suggestions);
        let clusters = cluster(&prepare_cluster_data(&data.answers));

        Some(Self {
            bounds,
            range,
            total_respondents: all.respondents.len(),
            data,
            merged,
            clusters,
        })
    }

    /// The five dashboard tables, in export sheet order.
    pub fn tables(&self) -> Vec<Table> {
        vec![
            Table::from_rows(SHEET_RESPONDENTS, &self.data.respondents),
            Table::from_rows(SHEET_ANSWERS, &self.data.answers),
            Table::from_rows(SHEET_SUGGESTIONS, &self.data.suggestions),
            Table::from_rows(SHEET_MERGED, &self.merged),
            Table::from_rows(SHEET_CLUSTERS, &self.clusters.rows()),
        ]
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl TableRow for Respondent {
    const COLUMNS: &'static [&'static str] =
        &["id", "nama", "jenis_kelamin", "usia", "layanan", "tanggal"];

    fn cells(&self) -> Vec<CellValue> {
        vec![
            self.id.into(),
            self.name.as_str().into(),
            self.gender.as_str().into(),
            self.age.as_str().into(),
            self.service.as_str().into(),
            self.submitted_at.format(TIMESTAMP_FORMAT).to_string().into(),
        ]
    }
}

impl TableRow for Answer {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "responden_id",
        "pertanyaan_key",
        "jawaban_teks",
        "jawaban_skor",
    ];

    fn cells(&self) -> Vec<CellValue> {
        vec![
            self.id.into(),
            self.respondent_id.into(),
            self.question_key.as_str().into(),
            self.answer_text.as_str().into(),
            self.score.into(),
        ]
    }
}

impl TableRow for Suggestion {
    const COLUMNS: &'static [&'static str] = &["id", "responden_id", "saran"];

    fn cells(&self) -> Vec<CellValue> {
        vec![
            self.id.into(),
            self.respondent_id.into(),
            self.text.as_str().into(),
        ]
    }
}

impl TableRow for MergedRow {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "nama",
        "jenis_kelamin",
        "usia",
        "layanan",
        "tanggal",
        "responden_id",
        "saran",
    ];

    fn cells(&self) -> Vec<CellValue> {
        let mut cells = self.respondent.cells();
        cells.push(self.suggestion.as_ref().map(|s| s.respondent_id).into());
        cells.push(self.suggestion.as_ref().map(|s| s.text.clone()).into());
        cells
    }
}

impl TableRow for ClusterRow {
    const COLUMNS: &'static [&'static str] = &[
        "responden_id",
        "skor_layanan",
        "skor_keseluruhan",
        "cluster",
        "sentimen",
    ];

    fn cells(&self) -> Vec<CellValue> {
        vec![
            self.point.respondent_id.into(),
            self.point.service_score.into(),
            self.point.overall_score.into(),
            self.cluster.map(|c| c as i64).into(),
            self.sentiment.map(Sentiment::cluster_label).into(),
        ]
    }
}
