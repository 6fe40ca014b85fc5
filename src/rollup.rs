use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::models::{CourseAggregate, RegistrationRecord, RegistrationReport, TimeSpent};

/// Learners seen within this many days count as active.
pub const ACTIVE_WINDOW_DAYS: i64 = 30;

pub fn is_active(last_access: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - last_access <= Duration::days(ACTIVE_WINDOW_DAYS)
}

/// Scores above 1 are on a 0..=100 scale.
pub fn normalize_score(score: f64) -> f64 {
    if score > 1.0 {
        score / 100.0
    } else {
        score
    }
}

#[derive(Default)]
struct Tally {
    registrations: usize,
    learners: HashSet<String>,
    active_learners: HashSet<String>,
    passed: usize,
    failed: usize,
    seconds: f64,
    /// Nonzero normalized scores per learner.
    scores: HashMap<String, (f64, usize)>,
}

impl Tally {
    fn add(&mut self, record: &RegistrationRecord, now: DateTime<Utc>) {
        self.registrations += 1;
        self.learners.insert(record.learner_id.clone());

        if record.last_access_date.is_some_and(|last| is_active(last, now)) {
            self.active_learners.insert(record.learner_id.clone());
        }
        if record.passed() {
            self.passed += 1;
        }
        if record.failed() {
            self.failed += 1;
        }
        if record.total_time.is_finite() && record.total_time > 0.0 {
            self.seconds += record.total_time;
        }
        if let Some(score) = record.score.map(normalize_score).filter(|score| *score != 0.0) {
            let (total, count) = self
                .scores
                .entry(record.learner_id.clone())
                .or_insert((0.0, 0));
            *total += score;
            *count += 1;
        }
    }

    /// Mean over learners; a learner with several scored registrations
    /// contributes the mean of those.
    fn score_avg(&self) -> Option<f64> {
        if self.scores.is_empty() {
            return None;
        }
        let sum: f64 = self
            .scores
            .values()
            .map(|(total, count)| total / *count as f64)
            .sum();
        Some(sum / self.scores.len() as f64)
    }
}

/// Per-course rollup plus report-wide totals.
///
/// Registrations that were never launched (no last access date) are left out.
pub fn registration_list_results(
    records: &[RegistrationRecord],
    now: DateTime<Utc>,
) -> RegistrationReport {
    let mut total = Tally::default();
    let mut courses: HashMap<&str, (&str, Tally)> = HashMap::new();

    for record in records {
        if record.last_access_date.is_none() {
            continue;
        }

        total.add(record, now);
        let entry = courses
            .entry(record.course_id.as_str())
            .or_insert_with(|| (record.course_title.as_str(), Tally::default()));
        if entry.0.is_empty() {
            entry.0 = record.course_title.as_str();
        }
        entry.1.add(record, now);
    }

    let courses: BTreeMap<String, CourseAggregate> = courses
        .into_iter()
        .map(|(course_id, (course_title, tally))| {
            let aggregate = CourseAggregate {
                course_id: course_id.to_string(),
                course_title: course_title.to_string(),
                registrations: tally.registrations,
                learners: tally.learners.len(),
                active_learners: tally.active_learners.len(),
                passed: tally.passed,
                failed: tally.failed,
                score_avg: tally.score_avg(),
                total_time: TimeSpent::from_seconds(tally.seconds),
            };
            (course_id.to_string(), aggregate)
        })
        .collect();

    RegistrationReport {
        registrations: total.registrations,
        active_learners: total.active_learners.len(),
        total_learners: total.learners.len(),
        passed: total.passed,
        failed: total.failed,
        score_avg: total.score_avg(),
        time: TimeSpent::from_seconds(total.seconds),
        courses,
    }
}

/// [`registration_list_results`] restricted to the given learners.
pub fn organization_list_results(
    records: &[RegistrationRecord],
    learners: &HashSet<String>,
    now: DateTime<Utc>,
) -> RegistrationReport {
    let members: Vec<RegistrationRecord> = records
        .iter()
        .filter(|record| learners.contains(&record.learner_id))
        .cloned()
        .collect();
    registration_list_results(&members, now)
}
