//! Typed views of service documents.
//!
//! Required fields that are missing turn into
//! [`ResponseError::MalformedResponse`]; optional ones fall back to defaults.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::error::ResponseError;
use crate::models::{
    AccountInfo, AccountUsage, ActivityNode, Completion, RegistrationRecord, RegistrationResult,
    Success,
};
use crate::xml::Element;

type DecodeResult<T> = Result<T, ResponseError>;

fn missing(what: &str) -> ResponseError {
    debug!(field = what, "required field missing from response");
    ResponseError::MalformedResponse
}

fn text_or_default(element: &Element, name: &str) -> String {
    element.child_text(name).unwrap_or_default().to_string()
}

/// Parses the date formats the service has used over time.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y%m%d%H%M%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Seconds from a plain number, `HHHH:MM:SS.SS`, or an ISO 8601 `PT..` span.
pub fn parse_seconds(value: &str) -> f64 {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<f64>() {
        return seconds;
    }
    if value.contains(':') {
        return value
            .split(':')
            .map(|part| part.parse::<f64>().unwrap_or(0.0))
            .fold(0.0, |total, part| total * 60.0 + part);
    }
    parse_iso_duration(value).unwrap_or(0.0)
}

fn parse_iso_duration(value: &str) -> Option<f64> {
    let rest = value.strip_prefix('P')?;
    let (days, time) = match rest.split_once('T') {
        Some((days, time)) => (days, time),
        None => (rest, ""),
    };

    let mut total = 0.0;
    let mut number = String::new();
    for (part, scale) in [(days, true), (time, false)] {
        for c in part.chars() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
                continue;
            }
            let amount: f64 = number.parse().ok()?;
            number.clear();
            total += amount
                * match (scale, c) {
                    (true, 'Y') => 365.0 * 86_400.0,
                    (true, 'M') => 30.0 * 86_400.0,
                    (true, 'W') => 7.0 * 86_400.0,
                    (true, 'D') => 86_400.0,
                    (false, 'H') => 3_600.0,
                    (false, 'M') => 60.0,
                    (false, 'S') => 1.0,
                    _ => return None,
                };
        }
        // A trailing number without a designator is not a duration.
        if !number.is_empty() {
            return None;
        }
    }
    Some(total)
}

/// `None` for empty or `unknown` scores.
pub fn parse_score(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|score| score.is_finite())
}

fn parse_count(value: Option<&str>) -> Option<i64> {
    value.and_then(|value| value.trim().parse().ok())
}

/// `<success/>` marker of mutating calls.
pub fn success_marker(rsp: &Element) -> DecodeResult<bool> {
    Ok(rsp.child("success").is_some())
}

/// `<result>true</result>` of `exists`; `None` when the service said nothing.
pub fn exists_result(rsp: &Element) -> DecodeResult<Option<bool>> {
    Ok(rsp
        .child_text("result")
        .filter(|text| !text.is_empty())
        .map(|text| text.eq_ignore_ascii_case("true")))
}

pub fn account_info(rsp: &Element) -> DecodeResult<AccountInfo> {
    let account = rsp.child("account").ok_or_else(|| missing("account"))?;
    let usage = account
        .child("usage")
        .map(|usage| AccountUsage {
            month_start: text_or_default(usage, "monthstart"),
            reg_count: parse_count(usage.child_text("regcount")),
            total_registrations: parse_count(usage.child_text("totalregistrations")),
            total_courses: parse_count(usage.child_text("totalcourses")),
        })
        .unwrap_or_default();

    Ok(AccountInfo {
        email: text_or_default(account, "email"),
        first_name: text_or_default(account, "firstname"),
        last_name: text_or_default(account, "lastname"),
        company: text_or_default(account, "company"),
        account_type: text_or_default(account, "accounttype"),
        reg_limit: parse_count(account.child_text("reglimit")),
        strict_limit: account
            .child_text("strictlimit")
            .is_some_and(|value| value.eq_ignore_ascii_case("true")),
        create_date: text_or_default(account, "createdate"),
        usage,
    })
}

fn activity(element: &Element) -> ActivityNode {
    let runtime = element.child("runtime");
    let runtime_text = |name: &str| runtime.and_then(|runtime| runtime.child_text(name));

    let complete = element
        .child_text("complete")
        .or_else(|| element.child_text("completed"))
        .or_else(|| runtime_text("completion_status"))
        .map(Completion::parse)
        .unwrap_or_default();
    let success = element
        .child_text("success")
        .or_else(|| {
            element
                .child_text("satisfied")
                .map(|satisfied| if satisfied == "true" { "passed" } else { "failed" })
        })
        .or_else(|| runtime_text("success_status"))
        .map(Success::parse)
        .unwrap_or_default();
    let progress = runtime_text("progress_measure")
        .and_then(parse_score)
        .or((complete == Completion::Complete).then_some(1.0));
    let score = runtime_text("score_scaled")
        .and_then(parse_score)
        .or_else(|| element.child_text("score").and_then(parse_score))
        .or_else(|| runtime_text("score_raw").and_then(parse_score));
    let total_time = runtime_text("total_time")
        .or_else(|| element.child_text("time"))
        .or_else(|| element.child_text("totaltime"))
        .map(parse_seconds)
        .unwrap_or(0.0);

    let children = element
        .child("children")
        .map(|children| children.children_named("activity").map(activity).collect())
        .unwrap_or_default();

    ActivityNode {
        id: element.attribute("id").unwrap_or_default().to_string(),
        title: text_or_default(element, "title"),
        attempts: element
            .child_text("attempts")
            .and_then(|value| value.parse().ok())
            .unwrap_or(0),
        complete,
        success,
        progress,
        score,
        total_time,
        children,
    }
}

/// Fields shared by `<registrationreport>` in `course` and `full` formats.
struct ReportFields {
    complete: Completion,
    success: Success,
    total_time: f64,
    score: Option<f64>,
    activity: Option<ActivityNode>,
}

fn report_fields(report: &Element) -> ReportFields {
    let activity = report.child("activity").map(activity);
    let root = activity.as_ref();

    ReportFields {
        complete: report
            .child_text("complete")
            .map(Completion::parse)
            .or(root.map(|root| root.complete))
            .unwrap_or_default(),
        success: report
            .child_text("success")
            .map(Success::parse)
            .or(root.map(|root| root.success))
            .unwrap_or_default(),
        total_time: report
            .child_text("totaltime")
            .map(parse_seconds)
            .or(root.map(|root| root.total_time))
            .unwrap_or(0.0),
        score: match report.child_text("score") {
            Some(score) => parse_score(score),
            None => root.and_then(|root| root.score),
        },
        activity,
    }
}

pub fn registration_result(rsp: &Element) -> DecodeResult<RegistrationResult> {
    let report = rsp
        .child("registrationreport")
        .ok_or_else(|| missing("registrationreport"))?;
    let fields = report_fields(report);

    Ok(RegistrationResult {
        format: report.attribute("format").unwrap_or_default().to_string(),
        registration_id: report
            .attribute("regid")
            .ok_or_else(|| missing("registrationreport@regid"))?
            .to_string(),
        instance_id: report.attribute("instanceid").unwrap_or_default().to_string(),
        complete: fields.complete,
        success: fields.success,
        total_time: fields.total_time,
        score: fields.score,
        activity: fields.activity,
    })
}

fn registration(element: &Element) -> DecodeResult<RegistrationRecord> {
    let required = |attribute: &str, child: &str| {
        element
            .attribute(attribute)
            .or_else(|| element.child_text(child))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| missing(child))
    };
    let date = |name: &str| element.child_text(name).and_then(parse_date);

    let fields = element.child("registrationreport").map(report_fields);
    let (complete, success, total_time, score, activity) = match fields {
        Some(f) => (f.complete, f.success, f.total_time, f.score, f.activity),
        None => (Completion::Unknown, Success::Unknown, 0.0, None, None),
    };

    Ok(RegistrationRecord {
        registration_id: required("id", "registrationId")?,
        course_id: required("courseid", "courseId")?,
        course_title: text_or_default(element, "courseTitle"),
        learner_id: required("learnerid", "learnerId")?,
        learner_first_name: text_or_default(element, "learnerFirstName"),
        learner_last_name: text_or_default(element, "learnerLastName"),
        email: text_or_default(element, "email"),
        create_date: date("createDate"),
        first_access_date: date("firstAccessDate"),
        last_access_date: date("lastAccessDate"),
        completed_date: date("completedDate"),
        complete,
        success,
        total_time,
        score,
        activity,
    })
}

pub fn registration_list(rsp: &Element) -> DecodeResult<Vec<RegistrationRecord>> {
    let list = rsp
        .child("registrationlist")
        .ok_or_else(|| missing("registrationlist"))?;
    list.children_named("registration").map(registration).collect()
}
