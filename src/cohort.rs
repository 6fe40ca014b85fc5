//! Weekly enrollment cohorts and how long their learners kept coming back.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

use crate::models::{CohortBucket, CohortsReport, RegistrationRecord, RetentionBuckets};

/// Retention bucket for a last access `days` after the cohort week ended.
///
/// Each bucket spans seven days with the upper bound inclusive, so day 7 is
/// still week 1 and day 8 is week 2. Anything past day 56 is week 9+.
pub fn retention_bucket(days: i64) -> usize {
    if days <= 7 {
        1
    } else {
        ((days + 6) / 7).min(9) as usize
    }
}

/// Monday and Sunday of the ISO week.
pub fn week_bounds(year: i32, week: u32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?,
        NaiveDate::from_isoywd_opt(year, week, Weekday::Sun)?,
    ))
}

/// Groups registrations by the ISO week they were created in.
///
/// Registrations without a create date cannot be placed and are dropped.
/// Within a cohort each learner is bucketed once, by their most recent access.
pub fn cohort_list_results(records: &[RegistrationRecord]) -> CohortsReport {
    let mut weeks: BTreeMap<(i32, u32), Vec<&RegistrationRecord>> = BTreeMap::new();

    for record in records {
        let Some(created) = record.create_date else {
            continue;
        };
        let week = created.iso_week();
        weeks
            .entry((week.year(), week.week()))
            .or_default()
            .push(record);
    }

    let mut cohorts = BTreeMap::new();
    for ((year, week), members) in weeks {
        let Some((week_start, week_end)) = week_bounds(year, week) else {
            continue;
        };

        let mut last_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
        for record in &members {
            if let Some(access) = record.last_access_date {
                last_seen
                    .entry(record.learner_id.as_str())
                    .and_modify(|seen| *seen = (*seen).max(access))
                    .or_insert(access);
            }
        }

        let mut retention = RetentionBuckets::default();
        for access in last_seen.values() {
            let days = (access.date_naive() - week_end).num_days();
            retention.increment(retention_bucket(days));
        }

        cohorts.insert(
            (year, week),
            CohortBucket {
                year,
                week,
                week_start,
                week_end,
                registrations: members.into_iter().cloned().collect(),
                retention,
            },
        );
    }

    CohortsReport { cohorts }
}
