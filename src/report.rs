use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{CohortsReport, CourseAggregate, LearnersReport, RegistrationReport};

fn percent(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.1}%", value * 100.0),
        None => "n/a".to_string(),
    }
}

/// Courses ordered by registration count, busiest first.
pub fn courses_by_registrations(report: &RegistrationReport) -> Vec<&CourseAggregate> {
    let mut courses: Vec<&CourseAggregate> = report.courses().values().collect();
    courses.sort_by(|a, b| {
        b.registrations()
            .cmp(&a.registrations())
            .then_with(|| a.course_id().cmp(b.course_id()))
    });
    courses
}

pub fn build_report(
    generated_at: DateTime<Utc>,
    registrations: &RegistrationReport,
    cohorts: &CohortsReport,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Registration Report");
    let _ = writeln!(output, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "- {} registrations across {} learners ({} active in the last 30 days)",
        registrations.registrations(),
        registrations.total_learners(),
        registrations.active_learners()
    );
    let _ = writeln!(
        output,
        "- {} passed, {} failed, average score {}",
        registrations.passed(),
        registrations.failed(),
        percent(registrations.score_avg())
    );
    let _ = writeln!(output, "- {} spent in courses", registrations.time_str());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Courses");

    let courses = courses_by_registrations(registrations);
    if courses.is_empty() {
        let _ = writeln!(output, "No launched registrations.");
    } else {
        for course in courses {
            let _ = writeln!(
                output,
                "- {} ({}): {} registrations, {} learners, {} active, {} passed, {} failed, avg score {}, time {}",
                course.course_title(),
                course.course_id(),
                course.registrations(),
                course.learners(),
                course.active_learners(),
                course.passed(),
                course.failed(),
                percent(course.score_avg()),
                course.duration()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Cohort Retention");

    if cohorts.is_empty() {
        let _ = writeln!(output, "No cohorts recorded.");
    } else {
        let _ = writeln!(output, "| Week | Starts | Registrations | W1 | W2 | W3 | W4 | W5 | W6 | W7 | W8 | W9+ |");
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|---|---|---|");
        for cohort in cohorts.cohorts() {
            let buckets: Vec<String> = cohort
                .retention
                .as_array()
                .iter()
                .map(|count| count.to_string())
                .collect();
            let _ = writeln!(
                output,
                "| {}-W{:02} | {} | {} | {} |",
                cohort.year,
                cohort.week,
                cohort.week_start,
                cohort.registrations.len(),
                buckets.join(" | ")
            );
        }
    }

    output
}

/// Plain-text listing of learner progress.
pub fn build_learner_listing(report: &LearnersReport) -> String {
    let mut output = String::new();

    if report.learners().is_empty() {
        let _ = writeln!(output, "No learners found.");
        return output;
    }

    for learner in report.learners().values() {
        let _ = writeln!(output, "{} <{}> ({})", learner.name, learner.email, learner.learner_id);
        for (course_id, course) in &learner.courses {
            let _ = writeln!(
                output,
                "  {} ({}): enrolled {}, {} attempts",
                course.course_title, course_id, course.enrolled, course.attempts
            );
            for (module_id, module) in &course.modules {
                let progress = module
                    .progress
                    .map(|progress| format!("{:.0}%", progress * 100.0))
                    .unwrap_or_else(|| "n/a".to_string());
                let _ = writeln!(
                    output,
                    "    - {} [{}]: progress {}, score {}, time {}",
                    module.title,
                    module_id,
                    progress,
                    percent(module.score),
                    module.time
                );
            }
        }
    }

    output
}

#[derive(Serialize)]
struct CourseRow<'a> {
    course_id: &'a str,
    course_title: &'a str,
    registrations: usize,
    learners: usize,
    active_learners: usize,
    passed: usize,
    failed: usize,
    score_avg: Option<f64>,
    total_seconds: u64,
    duration: String,
}

/// One CSV row per course, busiest course first.
pub fn write_course_csv<W: std::io::Write>(
    writer: W,
    report: &RegistrationReport,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for course in courses_by_registrations(report) {
        writer.serialize(CourseRow {
            course_id: course.course_id(),
            course_title: course.course_title(),
            registrations: course.registrations(),
            learners: course.learners(),
            active_learners: course.active_learners(),
            passed: course.passed(),
            failed: course.failed(),
            score_avg: course.score_avg(),
            total_seconds: course.total_time().total_seconds(),
            duration: course.duration(),
        })?;
    }
    writer.flush()?;
    Ok(())
}
