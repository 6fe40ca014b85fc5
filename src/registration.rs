use std::collections::HashSet;

use crate::client::ServiceContext;
use crate::cohort::cohort_list_results;
use crate::decode;
use crate::detail::full_registration_list_results;
use crate::models::{
    CohortsReport, LearnersReport, RegistrationRecord, RegistrationReport, RegistrationResult,
    ReportSnapshot,
};
use crate::params::ParameterSet;
use crate::response::Response;
use crate::rollup::{organization_list_results, registration_list_results};

pub const CREATE_REGISTRATION: &str = "rustici.registration.createRegistration";
pub const REGISTRATION_EXISTS: &str = "rustici.registration.exists";
pub const DELETE_REGISTRATION: &str = "rustici.registration.deleteRegistration";
pub const GET_REGISTRATION_RESULT: &str = "rustici.registration.getRegistrationResult";
pub const GET_REGISTRATION_LIST: &str = "rustici.registration.getRegistrationList";
pub const LAUNCH: &str = "rustici.registration.launch";

#[derive(Debug, Clone, Default)]
pub struct CreateRegistration {
    pub course_id: String,
    pub registration_id: String,
    pub learner_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub postback_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub registration_id: String,
    /// Defaults to `/`
    pub redirect_on_exit_url: Option<String>,
    pub css_url: Option<String>,
    pub debug_log_pointer_url: Option<String>,
    pub course_tags: Option<String>,
    pub learner_tags: Option<String>,
    pub registration_tags: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultsFormat {
    #[default]
    Course,
    Full,
}

impl ResultsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultsFormat::Course => "course",
            ResultsFormat::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
    pub course_id: Option<String>,
    pub learner_id: Option<String>,
    pub format: ResultsFormat,
}

pub struct RegistrationService {
    context: ServiceContext,
}

impl RegistrationService {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    pub async fn create_registration(&self, opts: &CreateRegistration) -> Response<bool> {
        let parameters = ParameterSet::new()
            .with("method", CREATE_REGISTRATION)
            .with("courseid", &opts.course_id)
            .with("regid", &opts.registration_id)
            .with("learnerid", &opts.learner_id)
            .with("fname", &opts.first_name)
            .with("lname", &opts.last_name)
            .with("email", opts.email.clone())
            .with("postbackurl", opts.postback_url.clone());
        self.context.call(&parameters, decode::success_marker).await
    }

    /// `None` when the service gave no answer either way.
    pub async fn registration_exists(&self, registration_id: &str) -> Response<Option<bool>> {
        let parameters = ParameterSet::new()
            .with("method", REGISTRATION_EXISTS)
            .with("regid", registration_id);
        self.context.call(&parameters, decode::exists_result).await
    }

    /// Deletes the registration, or only its latest instance.
    pub async fn delete_registration(
        &self,
        registration_id: &str,
        instance_only: bool,
    ) -> Response<bool> {
        let parameters = ParameterSet::new()
            .with("method", DELETE_REGISTRATION)
            .with("regid", registration_id)
            .with("instanceid", instance_only.then_some("latest"));
        self.context.call(&parameters, decode::success_marker).await
    }

    pub async fn registration_result(&self, registration_id: &str) -> Response<RegistrationResult> {
        self.result(registration_id, ResultsFormat::Course).await
    }

    /// Same as [`Self::registration_result`] with the activity tree.
    pub async fn full_registration_result(
        &self,
        registration_id: &str,
    ) -> Response<RegistrationResult> {
        self.result(registration_id, ResultsFormat::Full).await
    }

    async fn result(&self, registration_id: &str, format: ResultsFormat) -> Response<RegistrationResult> {
        let parameters = ParameterSet::new()
            .with("method", GET_REGISTRATION_RESULT)
            .with("regid", registration_id)
            .with("resultsformat", format.as_str())
            .with("dataformat", "xml");
        self.context.call(&parameters, decode::registration_result).await
    }

    pub async fn registration_list(
        &self,
        filter: &RegistrationFilter,
    ) -> Response<Vec<RegistrationRecord>> {
        let parameters = ParameterSet::new()
            .with("method", GET_REGISTRATION_LIST)
            .with("resultsformat", filter.format.as_str())
            .with("coursefilter", filter.course_id.clone())
            .with("learnerid", filter.learner_id.clone());
        self.context.call(&parameters, decode::registration_list).await
    }

    /// Signed launch URL; nothing is sent.
    pub fn launch_url(&self, opts: &LaunchOptions) -> String {
        let parameters = ParameterSet::new()
            .with("method", LAUNCH)
            .with("regid", &opts.registration_id)
            .with(
                "redirecturl",
                opts.redirect_on_exit_url.as_deref().unwrap_or("/"),
            )
            .with("cssurl", opts.css_url.clone())
            .with("saveDebugLogPointerUrl", opts.debug_log_pointer_url.clone())
            .with("courseTags", opts.course_tags.clone())
            .with("learnerTags", opts.learner_tags.clone())
            .with("registrationTags", opts.registration_tags.clone());
        self.context.request(&parameters).request_url()
    }

    /// Per-course rollup over every registration.
    pub async fn registration_list_results(&self) -> Response<RegistrationReport> {
        let response = self.registration_list(&RegistrationFilter::default()).await;
        let now = self.context.now();
        response.map(|records| registration_list_results(&records, now))
    }

    /// Per-course rollup over the given learners only.
    pub async fn organization_list_results(
        &self,
        learners: &HashSet<String>,
    ) -> Response<RegistrationReport> {
        let response = self.registration_list(&RegistrationFilter::default()).await;
        let now = self.context.now();
        response.map(|records| organization_list_results(&records, learners, now))
    }

    /// Progress by learner and course, optionally for one learner.
    pub async fn full_registration_list_results(
        &self,
        learner_id: Option<&str>,
    ) -> Response<LearnersReport> {
        let filter = RegistrationFilter {
            learner_id: learner_id.map(str::to_string),
            format: ResultsFormat::Full,
            ..RegistrationFilter::default()
        };
        let response = self.registration_list(&filter).await;
        let now = self.context.now();
        response.map(|records| full_registration_list_results(&records, learner_id, now))
    }

    /// Weekly enrollment cohorts with retention buckets.
    pub async fn cohort_list_results(&self) -> Response<CohortsReport> {
        self.registration_list(&RegistrationFilter::default())
            .await
            .map(|records| cohort_list_results(&records))
    }

    /// Course rollup and cohorts from a single registration list, stamped
    /// with the instant used for the activity window.
    pub async fn report_snapshot(&self) -> Response<ReportSnapshot> {
        let response = self.registration_list(&RegistrationFilter::default()).await;
        let now = self.context.now();
        response.map(|records| ReportSnapshot {
            generated_at: now,
            registrations: registration_list_results(&records, now),
            cohorts: cohort_list_results(&records),
        })
    }
}
