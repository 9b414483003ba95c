use std::fmt::Display;

use campusmart_core::config::AppConfig;
use campusmart_db::{connect_with_config, migrations, ping};
use serde::Serialize;

use crate::commands::{load_config, CommandResult, Failure};

const CONFIGURATION: &str = "configuration";
const DATABASE: &str = "database";
const SCHEMA: &str = "schema";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Verdict {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct Finding {
    name: &'static str,
    status: Verdict,
    details: String,
}

impl Finding {
    fn pass(name: &'static str, details: impl Display) -> Self {
        Self { name, status: Verdict::Pass, details: details.to_string() }
    }

    fn fail(name: &'static str, details: impl Display) -> Self {
        Self { name, status: Verdict::Fail, details: details.to_string() }
    }

    fn skipped(name: &'static str, because: &str) -> Self {
        Self { name, status: Verdict::Skipped, details: format!("skipped: {because}") }
    }
}

#[derive(Debug, Serialize)]
struct Diagnosis {
    overall_status: Verdict,
    summary: &'static str,
    checks: Vec<Finding>,
}

impl Diagnosis {
    fn new(checks: Vec<Finding>) -> Self {
        if checks.iter().all(|finding| finding.status == Verdict::Pass) {
            Self { overall_status: Verdict::Pass, summary: "doctor: marketplace is ready", checks }
        } else {
            Self {
                overall_status: Verdict::Fail,
                summary: "doctor: marketplace is not ready",
                checks,
            }
        }
    }

    fn exit_code(&self) -> u8 {
        u8::from(self.overall_status != Verdict::Pass)
    }

    fn to_text(&self) -> String {
        let mut text = self.summary.to_string();
        for finding in &self.checks {
            let marker = match finding.status {
                Verdict::Pass => "ok",
                Verdict::Fail => "fail",
                Verdict::Skipped => "skip",
            };
            text.push_str(&format!("\n- [{marker}] {}: {}", finding.name, finding.details));
        }
        text
    }
}

/// Checks, in order, that config loads, the database answers and no migration is outstanding.
/// A failed check skips the ones after it.
pub fn run(json_output: bool) -> CommandResult {
    let diagnosis = Diagnosis::new(diagnose());
    let exit_code = diagnosis.exit_code();

    if !json_output {
        return CommandResult { exit_code, output: diagnosis.to_text() };
    }
    match serde_json::to_string_pretty(&diagnosis) {
        Ok(output) => CommandResult { exit_code, output },
        Err(error) => {
            let message = format!("doctor serialization failed: {error}");
            CommandResult::failure("doctor", Failure::new("serialization", 3, message))
        }
    }
}

fn diagnose() -> Vec<Finding> {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => {
            return vec![
                Finding::fail(CONFIGURATION, failure.message),
                Finding::skipped(DATABASE, "configuration did not load"),
                Finding::skipped(SCHEMA, "configuration did not load"),
            ]
        }
    };

    let mut findings = vec![Finding::pass(CONFIGURATION, "configuration loaded and validated")];
    findings.extend(database_findings(&config));
    findings
}

fn database_findings(config: &AppConfig) -> [Finding; 2] {
    let not_answering = |details: String| {
        [Finding::fail(DATABASE, details), Finding::skipped(SCHEMA, "database did not answer")]
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return not_answering(format!("failed to initialize async runtime: {error}")),
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => return not_answering(format!("failed to connect: {error}")),
        };
        let findings = match ping(&pool).await {
            Ok(()) => [
                Finding::pass(DATABASE, format_args!("connected using `{}`", config.database.url)),
                schema_finding(migrations::pending(&pool).await),
            ],
            Err(error) => not_answering(format!("database did not answer: {error}")),
        };
        pool.close().await;
        findings
    })
}

fn schema_finding<E: Display>(pending: Result<Vec<i64>, E>) -> Finding {
    match pending {
        Ok(versions) if versions.is_empty() => Finding::pass(SCHEMA, "all migrations applied"),
        Ok(versions) => {
            let listed: Vec<String> = versions.iter().map(i64::to_string).collect();
            Finding::fail(
                SCHEMA,
                format_args!("pending migrations {}; run `campusmart migrate`", listed.join(", ")),
            )
        }
        Err(error) => {
            Finding::fail(SCHEMA, format_args!("could not read migration history: {error}"))
        }
    }
}
