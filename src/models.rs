use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    Complete,
    Incomplete,
    #[default]
    Unknown,
}

impl Completion {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "complete" | "completed" => Completion::Complete,
            "incomplete" | "not attempted" | "not_attempted" => Completion::Incomplete,
            _ => Completion::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Success {
    Passed,
    Failed,
    #[default]
    Unknown,
}

impl Success {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "passed" => Success::Passed,
            "failed" => Success::Failed,
            _ => Success::Unknown,
        }
    }
}

/// Elapsed time split into hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimeSpent {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeSpent {
    pub fn from_seconds(total: f64) -> Self {
        let total = if total.is_finite() && total > 0.0 {
            total.floor() as u64
        } else {
            0
        };
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }

    pub fn time_str(&self) -> String {
        format!("{} hours {} minutes", self.hours, self.minutes)
    }
}

impl fmt::Display for TimeSpent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// One node of a registration's activity tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityNode {
    pub id: String,
    pub title: String,
    pub attempts: u32,
    pub complete: Completion,
    pub success: Success,
    /// 0..=1 when the content reports it
    pub progress: Option<f64>,
    pub score: Option<f64>,
    pub total_time: f64,
    pub children: Vec<ActivityNode>,
}

impl ActivityNode {
    /// Leaf activities, depth first. A tree with no children yields itself.
    pub fn modules(&self) -> Vec<&ActivityNode> {
        if self.children.is_empty() {
            return vec![self];
        }
        self.children.iter().flat_map(ActivityNode::modules).collect()
    }
}

/// One learner's registration for one course, as decoded from the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrationRecord {
    pub registration_id: String,
    pub course_id: String,
    pub course_title: String,
    pub learner_id: String,
    pub learner_first_name: String,
    pub learner_last_name: String,
    pub email: String,
    pub create_date: Option<DateTime<Utc>>,
    pub first_access_date: Option<DateTime<Utc>>,
    pub last_access_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub complete: Completion,
    pub success: Success,
    /// Seconds
    pub total_time: f64,
    pub score: Option<f64>,
    pub activity: Option<ActivityNode>,
}

impl RegistrationRecord {
    pub fn learner_name(&self) -> String {
        format!("{} {}", self.learner_first_name, self.learner_last_name)
            .trim()
            .to_string()
    }

    pub fn passed(&self) -> bool {
        self.complete == Completion::Complete && self.success == Success::Passed
    }

    pub fn failed(&self) -> bool {
        self.success == Success::Failed
    }
}

/// Result of `getRegistrationResult` for a single registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrationResult {
    pub(crate) format: String,
    pub(crate) registration_id: String,
    pub(crate) instance_id: String,
    pub(crate) complete: Completion,
    pub(crate) success: Success,
    pub(crate) total_time: f64,
    pub(crate) score: Option<f64>,
    pub(crate) activity: Option<ActivityNode>,
}

impl RegistrationResult {
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn complete(&self) -> Completion {
        self.complete
    }

    pub fn success(&self) -> Success {
        self.success
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn activity(&self) -> Option<&ActivityNode> {
        self.activity.as_ref()
    }

    /// Progress of the first module, for single-SCO courses.
    pub fn progress(&self) -> Option<f64> {
        self.activity
            .as_ref()
            .and_then(|root| root.modules().first().and_then(|module| module.progress))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountUsage {
    pub month_start: String,
    pub reg_count: Option<i64>,
    pub total_registrations: Option<i64>,
    pub total_courses: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) company: String,
    pub(crate) account_type: String,
    pub(crate) reg_limit: Option<i64>,
    pub(crate) strict_limit: bool,
    pub(crate) create_date: String,
    pub(crate) usage: AccountUsage,
}

impl AccountInfo {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn account_type(&self) -> &str {
        &self.account_type
    }

    pub fn reg_limit(&self) -> Option<i64> {
        self.reg_limit
    }

    pub fn is_strict_limit(&self) -> bool {
        self.strict_limit
    }

    pub fn create_date(&self) -> &str {
        &self.create_date
    }

    pub fn usage(&self) -> &AccountUsage {
        &self.usage
    }

    pub fn remaining_registrations(&self) -> Option<i64> {
        Some(self.reg_limit? - self.usage.total_registrations?)
    }
}

/// Rollup of all registrations of one course.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseAggregate {
    pub(crate) course_id: String,
    pub(crate) course_title: String,
    pub(crate) registrations: usize,
    pub(crate) learners: usize,
    pub(crate) active_learners: usize,
    pub(crate) passed: usize,
    pub(crate) failed: usize,
    /// `None` when no registration carries a nonzero score
    pub(crate) score_avg: Option<f64>,
    pub(crate) total_time: TimeSpent,
}

impl CourseAggregate {
    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    pub fn course_title(&self) -> &str {
        &self.course_title
    }

    pub fn registrations(&self) -> usize {
        self.registrations
    }

    pub fn learners(&self) -> usize {
        self.learners
    }

    pub fn active_learners(&self) -> usize {
        self.active_learners
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn score_avg(&self) -> Option<f64> {
        self.score_avg
    }

    pub fn total_time(&self) -> TimeSpent {
        self.total_time
    }

    pub fn duration(&self) -> String {
        self.total_time.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrationReport {
    pub(crate) registrations: usize,
    pub(crate) active_learners: usize,
    pub(crate) total_learners: usize,
    pub(crate) passed: usize,
    pub(crate) failed: usize,
    pub(crate) score_avg: Option<f64>,
    pub(crate) time: TimeSpent,
    pub(crate) courses: BTreeMap<String, CourseAggregate>,
}

impl RegistrationReport {
    pub fn registrations(&self) -> usize {
        self.registrations
    }

    pub fn active_learners(&self) -> usize {
        self.active_learners
    }

    pub fn total_learners(&self) -> usize {
        self.total_learners
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn score_avg(&self) -> Option<f64> {
        self.score_avg
    }

    pub fn time(&self) -> TimeSpent {
        self.time
    }

    pub fn time_str(&self) -> String {
        self.time.time_str()
    }

    pub fn hours(&self) -> u64 {
        self.time.hours
    }

    pub fn minutes(&self) -> u64 {
        self.time.minutes
    }

    pub fn seconds(&self) -> u64 {
        self.time.seconds
    }

    pub fn courses(&self) -> &BTreeMap<String, CourseAggregate> {
        &self.courses
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleProgress {
    pub title: String,
    pub progress: Option<f64>,
    pub score: Option<f64>,
    pub time: TimeSpent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseProgress {
    pub course_title: String,
    /// Human description of how long ago the learner enrolled.
    pub enrolled: String,
    pub attempts: u32,
    pub complete: Completion,
    pub success: Success,
    pub modules: BTreeMap<String, ModuleProgress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LearnerProgress {
    pub learner_id: String,
    pub name: String,
    pub email: String,
    pub courses: BTreeMap<String, CourseProgress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LearnersReport {
    pub(crate) learners: BTreeMap<String, LearnerProgress>,
}

impl LearnersReport {
    pub fn learners(&self) -> &BTreeMap<String, LearnerProgress> {
        &self.learners
    }

    pub fn learner(&self, learner_id: &str) -> Option<&LearnerProgress> {
        self.learners.get(learner_id)
    }
}

/// Learner counts by how many weeks after the cohort week they were last seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetentionBuckets {
    pub week1: usize,
    pub week2: usize,
    pub week3: usize,
    pub week4: usize,
    pub week5: usize,
    pub week6: usize,
    pub week7: usize,
    pub week8: usize,
    pub week9plus: usize,
}

impl RetentionBuckets {
    /// Counts in order, week1 first and week9plus last.
    pub fn as_array(&self) -> [usize; 9] {
        [
            self.week1,
            self.week2,
            self.week3,
            self.week4,
            self.week5,
            self.week6,
            self.week7,
            self.week8,
            self.week9plus,
        ]
    }

    pub fn total(&self) -> usize {
        self.as_array().iter().sum()
    }

    pub(crate) fn increment(&mut self, bucket: usize) {
        let slot = match bucket {
            1 => &mut self.week1,
            2 => &mut self.week2,
            3 => &mut self.week3,
            4 => &mut self.week4,
            5 => &mut self.week5,
            6 => &mut self.week6,
            7 => &mut self.week7,
            8 => &mut self.week8,
            _ => &mut self.week9plus,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortBucket {
    pub year: i32,
    pub week: u32,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub registrations: Vec<RegistrationRecord>,
    pub retention: RetentionBuckets,
}

/// Weekly cohorts keyed by `(iso year, iso week)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CohortsReport {
    #[serde(serialize_with = "cohorts_as_seq")]
    pub(crate) cohorts: BTreeMap<(i32, u32), CohortBucket>,
}

// JSON object keys must be strings; the cohort carries its own week anyway.
fn cohorts_as_seq<S>(
    cohorts: &BTreeMap<(i32, u32), CohortBucket>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(cohorts.values())
}

impl CohortsReport {
    pub fn cohorts(&self) -> impl Iterator<Item = &CohortBucket> {
        self.cohorts.values()
    }

    pub fn cohort(&self, year: i32, week: u32) -> Option<&CohortBucket> {
        self.cohorts.get(&(year, week))
    }

    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }
}

/// Course rollup and cohorts taken from one registration list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSnapshot {
    pub generated_at: DateTime<Utc>,
    pub registrations: RegistrationReport,
    pub cohorts: CohortsReport,
}
