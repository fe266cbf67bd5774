//! Reading statistics derived from the full catalog. Everything here is a pure
//! function of the stored records: one pass tallies the year and month buckets
//! plus the days-to-read samples, a second reduces the buckets to maxima and
//! report rows. Nothing is cached, so callers recompute after every mutation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::debug;

use crate::db::BookStore;
use crate::error::BookResult;
use crate::models::{Book, Status};

/// How many authors the leaderboard keeps.
pub const TOP_AUTHORS_LIMIT: usize = 20;
/// Average number of weeks in a month, used for per-week rates.
const WEEKS_PER_MONTH: f64 = 4.3363;
/// Week count per active month used by the yearly report.
const YEARLY_WEEKS_PER_MONTH: f64 = 4.33;

/// Calendar month bucket. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    /// The following calendar month.
    pub fn succ(self) -> Self {
        if self.month >= 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Which date places a book into a year/month bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BucketRule {
    /// The end date, falling back to the start date for unfinished books.
    #[default]
    EndOrStart,
    /// Only finished books, bucketed by end date.
    EndDate,
    /// Bucket by start date.
    StartDate,
}

impl BucketRule {
    pub fn bucket_date(&self, book: &Book) -> Option<NaiveDate> {
        match self {
            BucketRule::EndOrStart => book.end_date.or(book.start_date),
            BucketRule::EndDate => book.end_date,
            BucketRule::StartDate => book.start_date,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BucketRule::EndOrStart => "end-or-start",
            BucketRule::EndDate => "end",
            BucketRule::StartDate => "start",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown bucket rule '{0}' (expected end-or-start, end or start)")]
pub struct UnknownBucketRule(pub String);

impl FromStr for BucketRule {
    type Err = UnknownBucketRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "end-or-start" | "default" => Ok(BucketRule::EndOrStart),
            "end" | "end-date" => Ok(BucketRule::EndDate),
            "start" | "start-date" => Ok(BucketRule::StartDate),
            _ => Err(UnknownBucketRule(s.trim().to_string())),
        }
    }
}

/// Minimum, maximum and mean days-to-read over books with both dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaysToReadStats {
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    pub samples: usize,
}

impl DaysToReadStats {
    /// `None` when there are no samples, so an empty catalog never divides by
    /// zero.
    fn from_samples(samples: &[i64]) -> Option<Self> {
        let min = *samples.iter().min()?;
        let max = *samples.iter().max()?;
        let sum: i64 = samples.iter().sum();
        Some(Self {
            min,
            max,
            mean: sum as f64 / samples.len() as f64,
            samples: samples.len(),
        })
    }
}

/// One row of the yearly report.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSummary {
    pub year: i32,
    pub count: usize,
    /// Books per month, counting only months in which something was read.
    pub per_month: f64,
    pub per_week: f64,
    pub avg_days_to_read: Option<f64>,
}

/// One row of the monthly report.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthSummary {
    pub period: YearMonth,
    pub count: usize,
    pub per_week: f64,
    pub avg_days_to_read: Option<f64>,
}

/// Aggregate metrics over one consistent view of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct StatSnapshot {
    pub rule: BucketRule,
    pub total: usize,
    pub count_by_status: BTreeMap<Status, usize>,
    pub count_by_year: BTreeMap<i32, usize>,
    pub count_by_year_month: BTreeMap<YearMonth, usize>,
    /// Busiest year and its count; ties go to the earliest year.
    pub max_year: Option<(i32, usize)>,
    /// Busiest month and its count; ties go to the earliest month.
    pub max_year_month: Option<(YearMonth, usize)>,
    pub days_to_read: Option<DaysToReadStats>,
    pub top_authors: Vec<(String, usize)>,
    bucketed: Vec<(YearMonth, Option<i64>)>,
}

/// Recompute statistics from the store's current contents.
pub fn compute(store: &BookStore, rule: BucketRule) -> BookResult<StatSnapshot> {
    let books = store.list_all()?;
    Ok(StatSnapshot::from_books(&books, rule))
}

impl StatSnapshot {
    pub fn from_books(books: &[Book], rule: BucketRule) -> Self {
        let mut count_by_status = BTreeMap::new();
        let mut count_by_year = BTreeMap::new();
        let mut count_by_year_month = BTreeMap::new();
        let mut bucketed = Vec::new();
        let mut samples = Vec::new();

        for book in books {
            *count_by_status.entry(book.status).or_insert(0) += 1;

            let days = book.days_to_read();
            if let Some(days) = days {
                samples.push(days);
            }

            if let Some(date) = rule.bucket_date(book) {
                let period = YearMonth::of(date);
                *count_by_year.entry(period.year).or_insert(0) += 1;
                *count_by_year_month.entry(period).or_insert(0) += 1;
                bucketed.push((period, days));
            }
        }

        let snapshot = Self {
            rule,
            total: books.len(),
            max_year: max_bucket(&count_by_year),
            max_year_month: max_bucket(&count_by_year_month),
            days_to_read: DaysToReadStats::from_samples(&samples),
            top_authors: top_authors(books, TOP_AUTHORS_LIMIT),
            count_by_status,
            count_by_year,
            count_by_year_month,
            bucketed,
        };
        debug!(
            total = snapshot.total,
            years = snapshot.count_by_year.len(),
            rule = snapshot.rule.as_str(),
            "computed reading stats"
        );
        snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn count_for_status(&self, status: Status) -> usize {
        self.count_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Per-year rows, newest year first.
    pub fn yearly_report(&self) -> Vec<YearSummary> {
        self.count_by_year
            .iter()
            .rev()
            .map(|(&year, &count)| {
                let active_months = self
                    .count_by_year_month
                    .keys()
                    .filter(|period| period.year == year)
                    .count()
                    .max(1) as f64;
                YearSummary {
                    year,
                    count,
                    per_month: round2(count as f64 / active_months),
                    per_week: round2(count as f64 / (active_months * YEARLY_WEEKS_PER_MONTH)),
                    avg_days_to_read: mean_days(
                        self.bucketed
                            .iter()
                            .filter(|(period, _)| period.year == year)
                            .map(|(_, days)| *days),
                    ),
                }
            })
            .collect()
    }

    /// Per-month rows, newest first. Months between the first and last active
    /// month that have no books appear with a zero count.
    pub fn monthly_report(&self) -> Vec<MonthSummary> {
        let (Some(&first), Some(&last)) = (
            self.count_by_year_month.keys().next(),
            self.count_by_year_month.keys().next_back(),
        ) else {
            return Vec::new();
        };

        let mut rows = Vec::new();
        let mut period = first;
        while period <= last {
            let count = self.count_by_year_month.get(&period).copied().unwrap_or(0);
            let days = self
                .bucketed
                .iter()
                .filter(|(p, _)| *p == period)
                .map(|(_, days)| *days);
            rows.push(MonthSummary {
                period,
                count,
                per_week: round2(count as f64 / WEEKS_PER_MONTH),
                avg_days_to_read: mean_days(days),
            });
            period = period.succ();
        }
        rows.reverse();
        rows
    }
}

/// Highest-count bucket. Keys iterate in ascending order and only a strictly
/// greater count replaces the current best, so ties resolve to the earliest.
fn max_bucket<K: Copy + Ord>(counts: &BTreeMap<K, usize>) -> Option<(K, usize)> {
    counts
        .iter()
        .fold(None, |best, (&key, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((key, count)),
        })
}

fn top_authors(books: &[Book], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for book in books {
        let author = book.author.trim();
        if !author.is_empty() {
            *counts.entry(author).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(author, count)| (author.to_string(), count))
        .collect();
    ranked.sort_by(|(a_name, a_count), (b_name, b_count)| {
        b_count
            .cmp(a_count)
            .then_with(|| a_name.to_lowercase().cmp(&b_name.to_lowercase()))
            .then_with(|| a_name.cmp(b_name))
    });
    ranked.truncate(limit);
    ranked
}

fn mean_days(days: impl Iterator<Item = Option<i64>>) -> Option<f64> {
    let samples: Vec<i64> = days.flatten().collect();
    if samples.is_empty() {
        return None;
    }
    let sum: i64 = samples.iter().sum();
    Some(round2(sum as f64 / samples.len() as f64))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
