// crates/planguard-cli/src/main.rs
// ============================================================================
// Module: Planguard CLI Entry Point
// Description: Flag surface and run orchestration for plan preflight.
// Purpose: Extract would-be requests from a plan and validate them.
// Dependencies: clap, planguard-arm, planguard-core, planguard-plugin
// ============================================================================

//! ## Overview
//! The CLI reads a Terraform plan (JSON directly, or via
//! `terraform show -json` for binary plan files), spawns the azurerm
//! provider, runs the extraction pipeline, and submits the captured requests
//! to the validation endpoint. Validation failures are reported and the
//! process still exits zero so CI can parse the output; only initialisation
//! failures abort the run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use planguard_arm::ArmClient;
use planguard_arm::ResourceManagerAccount;
use planguard_arm::check_policy_restrictions;
use planguard_arm::default_credential;
use planguard_arm::preflight_in_batch;
use planguard_core::InterceptClient;
use planguard_core::PlaceholderRegistry;
use planguard_core::Plan;
use planguard_core::RequestModel;
use planguard_core::ZERO_SUBSCRIPTION_ID;
use planguard_core::export_payloads;
use planguard_plugin::PluginProvider;
use planguard_plugin::PluginProviderConfig;
use planguard_plugin::find_provider_binary;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Flags
// ============================================================================

/// Preflight validation of Terraform plans against Azure Resource Manager.
#[derive(Debug, Parser)]
#[command(name = "planguard", version, about)]
struct Cli {
    /// Path to a Terraform plan file (binary or `terraform show -json` output).
    #[arg(short = 'i', long = "plan")]
    plan: PathBuf,

    /// Enable verbose logging.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Emit logs as JSON.
    #[arg(short = 'j', long = "json")]
    json: bool,

    /// Generate request models without calling the validation endpoint.
    #[arg(long = "skip-preflight")]
    skip_preflight: bool,

    /// Also check captured requests against policy restrictions.
    #[arg(long = "policy-check")]
    policy_check: bool,

    /// Max concurrent preflight requests.
    #[arg(short = 'c', long = "concurrency", default_value_t = 8)]
    concurrency: usize,

    /// Provider binary override; defaults to the plan's provider mirror.
    #[arg(long = "provider")]
    provider: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal initialisation errors; anything here aborts the run.
#[derive(Debug, Error)]
enum CliError {
    /// The plan file could not be read or converted.
    #[error("reading plan file: {0}")]
    Plan(String),
    /// No provider binary could be located.
    #[error(
        "no provider binary found; run `terraform init` next to the plan or set \
         PLANGUARD_PROVIDER_PATH"
    )]
    ProviderMissing,
    /// Provider boot or configuration failed.
    #[error("initialising provider: {0}")]
    Provider(String),
    /// Placeholder registry construction failed.
    #[error("building placeholder registry: {0}")]
    Registry(String),
    /// Pipeline setup failed.
    #[error("running extraction pipeline: {0}")]
    Pipeline(String),
    /// ARM client construction failed.
    #[error("building resource manager client: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Installs the log subscriber: verbose maps to debug, `-j` to JSON output.
fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let plan = load_plan(&cli.plan)?;
    let plan_dir = cli
        .plan
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let account = ResourceManagerAccount::new();
    let subscription_id = account.subscription_id();
    if subscription_id.is_none() {
        tracing::warn!(
            "no subscription ID found; set one in the Azure CLI or via ARM_SUBSCRIPTION_ID"
        );
    }

    let provider_path = cli
        .provider
        .clone()
        .or_else(|| find_provider_binary(plan_dir))
        .ok_or(CliError::ProviderMissing)?;
    tracing::info!(provider = %provider_path.display(), "spawning provider");
    let provider = PluginProvider::spawn(PluginProviderConfig::new(provider_path))
        .map_err(|err| CliError::Provider(err.to_string()))?;

    let client = InterceptClient::new(Arc::new(provider), subscription_id.as_deref())
        .map_err(|err| CliError::Provider(err.to_string()))?;
    let registry = PlaceholderRegistry::load(subscription_id.as_deref())
        .map_err(|err| CliError::Registry(err.to_string()))?;

    tracing::info!("generating request bodies");
    let models = export_payloads(&plan, &client, &registry)
        .map_err(|err| CliError::Pipeline(err.to_string()))?;
    report_models(&models);

    if cli.skip_preflight {
        tracing::info!("skipping preflight check");
        return Ok(());
    }

    let concurrency = cli.concurrency.max(1);
    tracing::info!(concurrency, "sending preflight requests");
    let arm = ArmClient::new(default_credential()).map_err(|err| CliError::Client(err.to_string()))?;

    let succeeded: Vec<RequestModel> = models
        .iter()
        .filter(|model| model.failed.is_none())
        .cloned()
        .collect();
    let errors = preflight_in_batch(&arm, &succeeded, concurrency);
    if errors.is_empty() {
        tracing::info!("preflight check passed");
    } else {
        tracing::info!(count = errors.len(), "preflight errors");
        for error in &errors {
            tracing::error!("{error}");
        }
    }

    if cli.policy_check {
        let subscription = subscription_id.unwrap_or_else(|| ZERO_SUBSCRIPTION_ID.to_string());
        for model in &succeeded {
            match check_policy_restrictions(&arm, &model.url, &model.body, &subscription) {
                Ok(_) => tracing::info!(address = %model.address, "policy check passed"),
                Err(err) => tracing::error!(address = %model.address, "{err}"),
            }
        }
    }

    Ok(())
}

// ============================================================================
// SECTION: Plan Loading
// ============================================================================

/// Reads a plan: JSON files directly, anything else through
/// `terraform show -json` in the plan's directory.
fn load_plan(path: &Path) -> Result<Plan, CliError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let text = if is_json {
        fs::read_to_string(path).map_err(|err| CliError::Plan(err.to_string()))?
    } else {
        show_plan_json(path)?
    };
    Plan::from_json(&text).map_err(|err| CliError::Plan(err.to_string()))
}

/// Converts a binary plan file with the terraform executable from `PATH`.
fn show_plan_json(path: &Path) -> Result<String, CliError> {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| CliError::Plan(format!("{} has no file name", path.display())))?;
    tracing::info!(plan = %path.display(), "reading terraform plan file");
    let output = Command::new("terraform")
        .arg("show")
        .arg("-json")
        .arg(file_name)
        .current_dir(directory)
        .output()
        .map_err(|err| CliError::Plan(format!("launching terraform: {err}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CliError::Plan(format!(
            "terraform show failed: {}",
            stderr.trim()
        )));
    }
    String::from_utf8(output.stdout).map_err(|err| CliError::Plan(err.to_string()))
}

// ============================================================================
// SECTION: Reporting
// ============================================================================

/// Logs the per-address outcome and the run summary.
fn report_models(models: &[RequestModel]) {
    let mut failed = 0_usize;
    for model in models {
        match &model.failed {
            Some(case) => {
                failed += 1;
                tracing::info!(address = %model.address, "failed");
                tracing::debug!(address = %model.address, detail = %case.detail, "extraction failed");
            }
            None => {
                tracing::info!(address = %model.address, "success");
                tracing::debug!(address = %model.address, url = %model.url, body = %format_json(&model.body), "request model");
            }
        }
    }
    tracing::info!(
        total = models.len(),
        success = models.len() - failed,
        failed,
        "terraform resources processed"
    );
}

/// Pretty-prints JSON text, returning the input when it does not parse.
fn format_json(input: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(input) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| input.to_string()),
        Err(_) => input.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;
    use super::format_json;

    #[test]
    fn parses_the_flag_surface() {
        let cli = Cli::parse_from([
            "planguard",
            "-i",
            "plan.tfplan",
            "-v",
            "-j",
            "--skip-preflight",
            "-c",
            "4",
        ]);
        assert_eq!(cli.plan.to_str(), Some("plan.tfplan"));
        assert!(cli.verbose);
        assert!(cli.json);
        assert!(cli.skip_preflight);
        assert!(!cli.policy_check);
        assert_eq!(cli.concurrency, 4);
    }

    #[test]
    fn concurrency_defaults_to_eight() {
        let cli = Cli::parse_from(["planguard", "-i", "plan.tfplan"]);
        assert_eq!(cli.concurrency, 8);
    }

    #[test]
    fn format_json_tolerates_non_json_input() {
        assert_eq!(format_json("not json"), "not json");
        assert_eq!(format_json("{\"a\":1}"), "{\n  \"a\": 1\n}");
    }
}
