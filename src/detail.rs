//! Per-learner, per-course progress.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{
    ActivityNode, CourseProgress, LearnerProgress, LearnersReport, ModuleProgress,
    RegistrationRecord, TimeSpent,
};
use crate::rollup::normalize_score;

/// "3 weeks ago" style description of the time between `since` and `now`.
pub fn describe_elapsed(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(since) = since else {
        return "unknown".to_string();
    };
    let days = (now - since).num_days().max(0);

    let (amount, unit) = match days {
        0 => return "today".to_string(),
        1..=13 => (days, "day"),
        14..=59 => (days / 7, "week"),
        60..=364 => (days / 30, "month"),
        _ => (days / 365, "year"),
    };
    let plural = if amount == 1 { "" } else { "s" };
    format!("{amount} {unit}{plural} ago")
}

fn module_key(module: &ActivityNode, index: usize) -> String {
    if !module.id.is_empty() {
        module.id.clone()
    } else if !module.title.is_empty() {
        module.title.clone()
    } else {
        format!("module-{}", index + 1)
    }
}

fn modules(activity: Option<&ActivityNode>) -> BTreeMap<String, ModuleProgress> {
    let Some(root) = activity else {
        return BTreeMap::new();
    };
    root.modules()
        .into_iter()
        .enumerate()
        .map(|(index, module)| {
            let progress = ModuleProgress {
                title: module.title.clone(),
                progress: module.progress.map(|progress| progress.clamp(0.0, 1.0)),
                score: module.score.map(normalize_score),
                time: TimeSpent::from_seconds(module.total_time),
            };
            (module_key(module, index), progress)
        })
        .collect()
}

fn attempts(record: &RegistrationRecord) -> u32 {
    match &record.activity {
        Some(root) if root.attempts > 0 => root.attempts,
        _ if record.last_access_date.is_some() => 1,
        _ => 0,
    }
}

/// Groups registrations by learner, then course.
///
/// When a learner holds several registrations for one course, attempts add
/// up and the most recently created registration supplies the rest.
pub fn full_registration_list_results(
    records: &[RegistrationRecord],
    learner_id: Option<&str>,
    now: DateTime<Utc>,
) -> LearnersReport {
    let mut learners: BTreeMap<String, LearnerProgress> = BTreeMap::new();
    let mut created: BTreeMap<(String, String), Option<DateTime<Utc>>> = BTreeMap::new();

    for record in records {
        if learner_id.is_some_and(|wanted| wanted != record.learner_id) {
            continue;
        }

        let learner = learners
            .entry(record.learner_id.clone())
            .or_insert_with(|| LearnerProgress {
                learner_id: record.learner_id.clone(),
                name: record.learner_name(),
                email: record.email.clone(),
                courses: BTreeMap::new(),
            });

        let key = (record.learner_id.clone(), record.course_id.clone());
        let previous_attempts = learner
            .courses
            .get(&record.course_id)
            .map_or(0, |course| course.attempts);
        let newer = match created.get(&key) {
            None => true,
            Some(seen) => record.create_date >= *seen,
        };

        if newer {
            created.insert(key, record.create_date);
            learner.courses.insert(
                record.course_id.clone(),
                CourseProgress {
                    course_title: record.course_title.clone(),
                    enrolled: describe_elapsed(record.create_date, now),
                    attempts: previous_attempts + attempts(record),
                    complete: record.complete,
                    success: record.success,
                    modules: modules(record.activity.as_ref()),
                },
            );
        } else if let Some(course) = learner.courses.get_mut(&record.course_id) {
            course.attempts += attempts(record);
        }
    }

    LearnersReport { learners }
}
