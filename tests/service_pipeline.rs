use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use scormcloud_reporting::registration::{CreateRegistration, LaunchOptions, RegistrationFilter};
use scormcloud_reporting::{
    Configuration, FixedClock, ResponseError, ResponseEvent, ScormEngineService, Status,
    Transport, TransportError,
};

const ACCOUNT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rsp stat="ok">
  <account>
    <email>jane@example.com</email>
    <firstname>Jane</firstname>
    <lastname>Doe</lastname>
    <company>Acme</company>
    <accounttype>paid</accounttype>
    <reglimit>100</reglimit>
    <strictlimit>false</strictlimit>
    <createdate>2010-02-01</createdate>
    <usage>
      <monthstart>2013-05-01</monthstart>
      <regcount>12</regcount>
      <totalregistrations>40</totalregistrations>
      <totalcourses>3</totalcourses>
    </usage>
  </account>
</rsp>"#;

const REGISTRATIONS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rsp stat="ok">
  <registrationlist>
    <registration id="r1" courseid="safety">
      <courseTitle>Safety Basics</courseTitle>
      <learnerId>ann</learnerId>
      <learnerFirstName>Ann</learnerFirstName>
      <learnerLastName>Lee</learnerLastName>
      <email>ann@example.com</email>
      <createDate>2013-05-08T09:00:00.000+0000</createDate>
      <lastAccessDate>2013-05-30T09:00:00.000+0000</lastAccessDate>
      <registrationreport format="course" regid="r1" instanceid="0">
        <complete>complete</complete>
        <success>passed</success>
        <totaltime>1800</totaltime>
        <score>80</score>
      </registrationreport>
    </registration>
    <registration id="r2" courseid="safety">
      <courseTitle>Safety Basics</courseTitle>
      <learnerId>bob</learnerId>
      <learnerFirstName>Bob</learnerFirstName>
      <learnerLastName>Ray</learnerLastName>
      <createDate>2013-05-08T10:00:00.000+0000</createDate>
      <lastAccessDate>2013-05-14T10:00:00.000+0000</lastAccessDate>
      <registrationreport format="course" regid="r2" instanceid="0">
        <complete>complete</complete>
        <success>failed</success>
        <totaltime>600</totaltime>
        <score>40</score>
      </registrationreport>
    </registration>
    <registration id="r3" courseid="ethics">
      <courseTitle>Ethics</courseTitle>
      <learnerId>bob</learnerId>
      <createDate>2013-05-20T10:00:00.000+0000</createDate>
      <lastAccessDate></lastAccessDate>
    </registration>
  </registrationlist>
</rsp>"#;

const FULL_REGISTRATIONS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rsp stat="ok">
  <registrationlist>
    <registration id="r4" courseid="safety">
      <courseTitle>Safety Basics</courseTitle>
      <learnerId>cy</learnerId>
      <learnerFirstName>Cy</learnerFirstName>
      <learnerLastName>Fox</learnerLastName>
      <createDate>2013-06-06T08:00:00.000+0000</createDate>
      <lastAccessDate>2013-06-18T08:00:00.000+0000</lastAccessDate>
      <registrationreport format="full" regid="r4" instanceid="0">
        <activity id="safety">
          <title>Safety Basics</title>
          <attempts>3</attempts>
          <completed>incomplete</completed>
          <success>unknown</success>
          <children>
            <activity id="intro">
              <title>Intro</title>
              <attempts>1</attempts>
              <runtime>
                <completion_status>completed</completion_status>
                <score_scaled>0.9</score_scaled>
                <total_time>0000:05:00.00</total_time>
              </runtime>
            </activity>
            <activity id="quiz">
              <title>Quiz</title>
              <attempts>2</attempts>
              <runtime>
                <completion_status>incomplete</completion_status>
                <progress_measure>0.25</progress_measure>
                <score_raw>45</score_raw>
                <total_time>PT1H2M3S</total_time>
              </runtime>
            </activity>
          </children>
        </activity>
      </registrationreport>
    </registration>
    <registration id="r5" courseid="ethics">
      <courseTitle>Ethics</courseTitle>
      <learnerId>dan</learnerId>
      <createDate>2013-06-01T08:00:00.000+0000</createDate>
      <lastAccessDate></lastAccessDate>
    </registration>
  </registrationlist>
</rsp>"#;

/// Answers by `method` and remembers every URL it was asked for.
#[derive(Default)]
struct FakeCloud {
    urls: Mutex<Vec<String>>,
    /// Account info comes back as a bare `<rsp stat="ok"/>`.
    hollow_account: bool,
}

impl FakeCloud {
    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeCloud {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.urls.lock().unwrap().push(url.to_string());

        let body = if url.contains("method=rustici.reporting.getAccountInfo") {
            if self.hollow_account {
                r#"<rsp stat="ok"/>"#
            } else {
                ACCOUNT
            }
        } else if url.contains("method=rustici.registration.getRegistrationList") {
            if url.contains("resultsformat=full") {
                FULL_REGISTRATIONS
            } else {
                REGISTRATIONS
            }
        } else if url.contains("method=rustici.registration.createRegistration") {
            r#"<rsp stat="ok"><success/></rsp>"#
        } else if url.contains("method=rustici.registration.exists") {
            if url.contains("regid=r1") {
                r#"<rsp stat="ok"><result>true</result></rsp>"#
            } else {
                r#"<rsp stat="ok"><result>false</result></rsp>"#
            }
        } else if url.contains("method=rustici.registration.deleteRegistration") {
            r#"<rsp stat="fail"><err code="1" msg="The regid specified is invalid"/></rsp>"#
        } else {
            return Err(TransportError::Status {
                status: 404,
                url: url.to_string(),
            });
        };
        Ok(body.as_bytes().to_vec())
    }
}

fn engine() -> (ScormEngineService, Arc<FakeCloud>) {
    engine_over(FakeCloud::default())
}

fn engine_over(cloud: FakeCloud) -> (ScormEngineService, Arc<FakeCloud>) {
    let cloud = Arc::new(cloud);
    let engine = ScormEngineService::with_parts(
        Arc::new(Configuration::new(
            "https://cloud.scorm.com/",
            "myapp",
            "secret",
            "acme.reporting",
        )),
        cloud.clone(),
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2013, 6, 20, 12, 0, 0).unwrap())),
    );
    (engine, cloud)
}

#[tokio::test]
async fn account_info_is_signed_and_decoded() {
    let (engine, cloud) = engine();
    let info = engine.account().account_info().await.into_result().unwrap();

    assert_eq!(info.first_name(), "Jane");
    assert_eq!(info.reg_limit(), Some(100));
    assert_eq!(info.remaining_registrations(), Some(60));

    let urls = cloud.urls();
    assert_eq!(urls.len(), 1);
    let url = &urls[0];
    assert!(url.starts_with("https://cloud.scorm.com/api?"));
    assert!(url.contains("appid=myapp"));
    assert!(url.contains("applib=net"));
    assert!(url.contains("origin=acme.reporting"));
    assert!(url.contains("ts=20130620120000"));
    let sig = url.rsplit_once("&sig=").unwrap().1;
    assert_eq!(sig.len(), 32);
    assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn exists_reports_both_answers() {
    let (engine, _) = engine();
    let registrations = engine.registration();

    let found = registrations.registration_exists("r1").await;
    assert_eq!(found.status(), Status::Ok);
    assert_eq!(found.data(), Some(&Some(true)));

    let missing = registrations.registration_exists("nope").await;
    assert_eq!(missing.data(), Some(&Some(false)));
}

#[tokio::test]
async fn registration_list_decodes_every_record() {
    let (engine, _) = engine();
    let records = engine
        .registration()
        .registration_list(&RegistrationFilter::default())
        .await
        .into_result()
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].learner_name(), "Ann Lee");
    assert!(records[2].last_access_date.is_none());
}

#[tokio::test]
async fn course_rollup_skips_unlaunched_registrations() {
    let (engine, _) = engine();
    let report = engine
        .registration()
        .registration_list_results()
        .await
        .into_result()
        .unwrap();

    assert_eq!(report.registrations(), 2);
    assert_eq!(report.total_learners(), 2);
    assert_eq!(report.active_learners(), 1);
    assert_eq!(report.passed(), 1);
    assert_eq!(report.failed(), 1);
    assert!((report.score_avg().unwrap() - 0.6).abs() < 1e-9);
    assert_eq!(report.time_str(), "0 hours 40 minutes");

    let safety = &report.courses()["safety"];
    assert_eq!(safety.course_title(), "Safety Basics");
    assert_eq!(safety.duration(), "0:40:00");
    assert!(!report.courses().contains_key("ethics"));
}

#[tokio::test]
async fn organization_rollup_only_counts_members() {
    let (engine, _) = engine();
    let members: HashSet<String> = ["ann".to_string()].into_iter().collect();
    let report = engine
        .registration()
        .organization_list_results(&members)
        .await
        .into_result()
        .unwrap();

    assert_eq!(report.registrations(), 1);
    assert_eq!(report.passed(), 1);
    assert_eq!(report.failed(), 0);
}

#[tokio::test]
async fn cohorts_bucket_learners_by_latest_access() {
    let (engine, _) = engine();
    let cohorts = engine
        .registration()
        .cohort_list_results()
        .await
        .into_result()
        .unwrap();

    assert_eq!(cohorts.len(), 2);
    let week19 = cohorts.cohort(2013, 19).unwrap();
    assert_eq!(week19.registrations.len(), 2);
    assert_eq!(week19.week_end.to_string(), "2013-05-12");
    // bob is back two days after the week, ann eighteen days after.
    assert_eq!(week19.retention.week1, 1);
    assert_eq!(week19.retention.week3, 1);

    let week21 = cohorts.cohort(2013, 21).unwrap();
    assert_eq!(week21.retention.total(), 0);
}

#[tokio::test]
async fn learner_detail_builds_modules_from_the_activity_tree() {
    let (engine, cloud) = engine();
    let learners = engine
        .registration()
        .full_registration_list_results(Some("cy"))
        .await
        .into_result()
        .unwrap();

    let url = &cloud.urls()[0];
    assert!(url.contains("resultsformat=full"));
    assert!(url.contains("learnerid=cy"));

    assert_eq!(learners.learners().len(), 1);
    let cy = learners.learner("cy").unwrap();
    assert_eq!(cy.name, "Cy Fox");

    let course = &cy.courses["safety"];
    assert_eq!(course.enrolled, "2 weeks ago");
    assert_eq!(course.attempts, 3);
    assert_eq!(course.modules.len(), 2);

    let intro = &course.modules["intro"];
    assert_eq!(intro.title, "Intro");
    assert_eq!(intro.progress, Some(1.0));
    assert!((intro.score.unwrap() - 0.9).abs() < 1e-9);
    assert_eq!(intro.time.to_string(), "0:05:00");

    let quiz = &course.modules["quiz"];
    assert_eq!(quiz.title, "Quiz");
    assert_eq!(quiz.progress, Some(0.25));
    assert!((quiz.score.unwrap() - 0.45).abs() < 1e-9);
    assert_eq!(quiz.time.to_string(), "1:02:03");
}

#[tokio::test]
async fn create_registration_sends_learner_fields() {
    let (engine, cloud) = engine();
    let created = engine
        .registration()
        .create_registration(&CreateRegistration {
            course_id: "safety".to_string(),
            registration_id: "r10".to_string(),
            learner_id: "eve".to_string(),
            first_name: "Eve".to_string(),
            last_name: "Moss".to_string(),
            email: Some("eve@example.com".to_string()),
            postback_url: Some(String::new()),
        })
        .await;
    assert_eq!(created.data(), Some(&true));

    let url = &cloud.urls()[0];
    assert!(url.contains("method=rustici.registration.createRegistration"));
    assert!(url.contains("courseid=safety"));
    assert!(url.contains("regid=r10"));
    assert!(url.contains("learnerid=eve"));
    assert!(url.contains("fname=Eve"));
    assert!(url.contains("lname=Moss"));
    assert!(url.contains("email=eve%40example.com"));
    assert!(!url.contains("postbackurl"));
}

#[tokio::test]
async fn report_snapshot_uses_one_list_and_the_engine_clock() {
    let (engine, cloud) = engine();
    let snapshot = engine
        .registration()
        .report_snapshot()
        .await
        .into_result()
        .unwrap();

    assert_eq!(cloud.urls().len(), 1);
    assert_eq!(snapshot.generated_at, engine.now());
    assert_eq!(snapshot.registrations.registrations(), 2);
    assert_eq!(snapshot.cohorts.len(), 2);

    let markdown = scormcloud_reporting::report::build_report(
        snapshot.generated_at,
        &snapshot.registrations,
        &snapshot.cohorts,
    );
    assert!(markdown.contains("Generated 2013-06-20 12:00 UTC"));
}

#[tokio::test]
async fn undecodable_document_notifies_subscribers() {
    let (engine, _) = engine_over(FakeCloud {
        hollow_account: true,
        ..FakeCloud::default()
    });
    let mut events = engine.subscribe();

    let response = engine.account().account_info().await;
    assert_eq!(response.status(), Status::Failed);
    assert_eq!(response.error(), Some(&ResponseError::MalformedResponse));

    match events.try_recv().unwrap() {
        ResponseEvent::InvalidResponse { url, error } => {
            assert!(url.contains("method=rustici.reporting.getAccountInfo"));
            assert_eq!(error, ResponseError::MalformedResponse);
        }
    }
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn service_errors_surface_and_notify_subscribers() {
    let (engine, _) = engine();
    let mut events = engine.subscribe();

    let response = engine.registration().delete_registration("r9", false).await;
    assert_eq!(response.status(), Status::Failed);
    assert_eq!(
        response.error(),
        Some(&ResponseError::ServiceError {
            code: "1".to_string(),
            message: "The regid specified is invalid".to_string(),
        })
    );

    match events.try_recv().unwrap() {
        ResponseEvent::InvalidResponse { url, error } => {
            assert!(url.contains("method=rustici.registration.deleteRegistration"));
            assert_eq!(error.kind(), "ServiceError");
        }
    }
}

#[tokio::test]
async fn transport_failures_become_failed_responses() {
    let (engine, _) = engine();
    let response = engine.registration().registration_result("r1").await;
    assert!(!response.is_ok());
    assert!(matches!(response.error(), Some(ResponseError::Transport(_))));
}

#[test]
fn launch_url_is_built_without_a_request() {
    let (engine, cloud) = engine();
    let url = engine.registration().launch_url(&LaunchOptions {
        registration_id: "r1".to_string(),
        ..LaunchOptions::default()
    });

    assert!(url.starts_with("https://cloud.scorm.com/api?"));
    assert!(url.contains("method=rustici.registration.launch"));
    assert!(url.contains("redirecturl=%2F"));
    assert!(url.contains("regid=r1"));
    assert!(cloud.urls().is_empty());
}
