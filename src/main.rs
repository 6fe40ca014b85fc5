use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

use scormcloud_reporting::registration::{CreateRegistration, LaunchOptions};
use scormcloud_reporting::{report, Configuration, Response, ScormEngineService};

#[derive(Parser)]
#[command(name = "scormcloud-report")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Registration reporting against the SCORM Cloud API", long_about = None)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show account details and registration usage
    Account,
    /// Check whether a registration exists
    Exists { registration_id: String },
    /// Register a learner for a course
    Create {
        #[arg(long)]
        course_id: String,
        #[arg(long)]
        learner_id: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Generated when omitted
        #[arg(long)]
        registration_id: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Delete a registration
    Delete {
        registration_id: String,
        /// Only remove the latest instance
        #[arg(long)]
        instance_only: bool,
    },
    /// Show the result of one registration
    Result {
        registration_id: String,
        /// Include the activity tree
        #[arg(long)]
        full: bool,
    },
    /// Print a signed launch URL
    LaunchUrl {
        registration_id: String,
        #[arg(long)]
        redirect_url: Option<String>,
    },
    /// Per-course rollup
    Courses {
        /// Restrict to these learners (repeatable)
        #[arg(long = "learner")]
        learners: Vec<String>,
        /// Also write the rollup as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Learner progress by course and module
    Learners {
        #[arg(long)]
        learner: Option<String>,
    },
    /// Weekly cohort retention
    Cohorts,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn data<T>(response: Response<T>, what: &str) -> anyhow::Result<T> {
    response
        .into_result()
        .with_context(|| format!("failed to fetch {what}"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let configuration = Configuration::from_env()
        .context("SCORM_SERVICE_URL, SCORM_APP_ID and SCORM_SECRET_KEY must be set")?;
    let engine = ScormEngineService::new(configuration).context("failed to build HTTP client")?;
    let registrations = engine.registration();

    match cli.command {
        Commands::Account => {
            let info = data(engine.account().account_info().await, "account info")?;
            if cli.json {
                print_json(&info)?;
            } else {
                println!(
                    "{} {} <{}> at {} ({} account)",
                    info.first_name(),
                    info.last_name(),
                    info.email(),
                    info.company(),
                    info.account_type()
                );
                match info.remaining_registrations() {
                    Some(remaining) => println!("{remaining} registrations remaining."),
                    None => println!("No registration limit reported."),
                }
            }
        }
        Commands::Exists { registration_id } => {
            match data(registrations.registration_exists(&registration_id).await, "registration")? {
                Some(true) => println!("Registration {registration_id} exists."),
                Some(false) => println!("Registration {registration_id} does not exist."),
                None => println!("The service did not say whether {registration_id} exists."),
            }
        }
        Commands::Create {
            course_id,
            learner_id,
            first_name,
            last_name,
            registration_id,
            email,
        } => {
            let registration_id = registration_id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let opts = CreateRegistration {
                course_id,
                registration_id: registration_id.clone(),
                learner_id,
                first_name,
                last_name,
                email,
                postback_url: None,
            };
            if data(registrations.create_registration(&opts).await, "registration")? {
                println!("Created registration {registration_id}.");
            } else {
                anyhow::bail!("service did not confirm registration {registration_id}");
            }
        }
        Commands::Delete {
            registration_id,
            instance_only,
        } => {
            let deleted = data(
                registrations
                    .delete_registration(&registration_id, instance_only)
                    .await,
                "registration",
            )?;
            if deleted {
                println!("Deleted registration {registration_id}.");
            } else {
                anyhow::bail!("service did not confirm deleting {registration_id}");
            }
        }
        Commands::Result {
            registration_id,
            full,
        } => {
            let response = if full {
                registrations.full_registration_result(&registration_id).await
            } else {
                registrations.registration_result(&registration_id).await
            };
            let result = data(response, "registration result")?;
            if cli.json {
                print_json(&result)?;
            } else {
                println!(
                    "{}: {:?}/{:?}, score {}, {} seconds",
                    result.registration_id(),
                    result.complete(),
                    result.success(),
                    result
                        .score()
                        .map_or_else(|| "unknown".to_string(), |score| score.to_string()),
                    result.total_time()
                );
            }
        }
        Commands::LaunchUrl {
            registration_id,
            redirect_url,
        } => {
            println!(
                "{}",
                registrations.launch_url(&LaunchOptions {
                    registration_id,
                    redirect_on_exit_url: redirect_url,
                    ..LaunchOptions::default()
                })
            );
        }
        Commands::Courses { learners, csv } => {
            let response = if learners.is_empty() {
                registrations.registration_list_results().await
            } else {
                let learners: HashSet<String> = learners.into_iter().collect();
                registrations.organization_list_results(&learners).await
            };
            let rollup = data(response, "registration list")?;

            if let Some(path) = csv {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                report::write_course_csv(file, &rollup)?;
                tracing::info!(path = %path.display(), "wrote course rollup");
            }

            if cli.json {
                print_json(&rollup)?;
            } else if rollup.courses().is_empty() {
                println!("No launched registrations found.");
            } else {
                println!(
                    "{} registrations, {} learners ({} active), {}",
                    rollup.registrations(),
                    rollup.total_learners(),
                    rollup.active_learners(),
                    rollup.time_str()
                );
                for course in report::courses_by_registrations(&rollup) {
                    println!(
                        "- {} ({}): {} registrations, {} passed, {} failed, time {}",
                        course.course_title(),
                        course.course_id(),
                        course.registrations(),
                        course.passed(),
                        course.failed(),
                        course.duration()
                    );
                }
            }
        }
        Commands::Learners { learner } => {
            let learners = data(
                registrations
                    .full_registration_list_results(learner.as_deref())
                    .await,
                "registration list",
            )?;
            if cli.json {
                print_json(&learners)?;
            } else {
                print!("{}", report::build_learner_listing(&learners));
            }
        }
        Commands::Cohorts => {
            let cohorts = data(registrations.cohort_list_results().await, "registration list")?;
            if cli.json {
                print_json(&cohorts)?;
            } else if cohorts.is_empty() {
                println!("No cohorts found.");
            } else {
                for cohort in cohorts.cohorts() {
                    println!(
                        "{}-W{:02} ({} to {}): {} registrations, retention {:?}",
                        cohort.year,
                        cohort.week,
                        cohort.week_start,
                        cohort.week_end,
                        cohort.registrations.len(),
                        cohort.retention.as_array()
                    );
                }
            }
        }
        Commands::Report { out } => {
            let snapshot = data(registrations.report_snapshot().await, "registration list")?;
            let markdown = report::build_report(
                snapshot.generated_at,
                &snapshot.registrations,
                &snapshot.cohorts,
            );
            std::fs::write(&out, markdown)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
