use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use rabit_cijobs::status::{self, JobStatus};
use rabit_cijobs::{
    BuildRange, CiJobsClient, Credentials, HistoryParams, JsonObject, PollParams,
    QuickDeployParams, RollbackDetailsParams, RollbackHistoryParams, RollbackManifest,
    RollbackParams, TriggerParams, UpdateParams,
};

use crate::config::{Config, OutputFormat};
use crate::output::{self, WaitProgress};

#[derive(Parser)]
#[command(name = "rabit")]
#[command(author, version, about = "AutoRABIT CI jobs client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./rabit.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// AutoRABIT instance URL
    #[arg(short, long, global = true, env = "RABIT_URL")]
    url: Option<String>,

    /// AutoRABIT API token
    #[arg(short, long, global = true, env = "RABIT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Args)]
struct WaitArgs {
    /// Keep polling while the build is in progress
    #[arg(short, long, default_value_t = false)]
    wait: bool,

    /// Seconds between polls
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the build history of a CI job
    History {
        #[arg(short, long)]
        job: String,

        #[arg(long, requires = "to", conflicts_with = "build")]
        from: Option<u64>,

        #[arg(long, requires = "from", conflicts_with = "build")]
        to: Option<u64>,

        /// Single build to fetch
        #[arg(short, long)]
        build: Option<u64>,
    },
    /// Poll the status of a build (latest when no build is given)
    Poll {
        #[arg(short, long)]
        job: String,

        #[arg(short, long)]
        build: Option<u64>,

        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Trigger a build of a CI job
    Trigger {
        #[arg(short, long)]
        job: String,

        /// Build label
        #[arg(long, default_value = rabit_cijobs::descriptor::DEFAULT_TRIGGER_TITLE)]
        title: String,

        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Quick deploy a validated build
    QuickDeploy {
        #[arg(short, long)]
        job: String,

        #[arg(short, long)]
        build: Option<u64>,
    },
    /// Update the baseline revision of a CI job
    Update {
        #[arg(short, long)]
        job: String,

        #[arg(short, long)]
        revision: String,
    },
    /// Trigger a rollback of a deployed build
    Rollback {
        #[arg(short, long)]
        job: String,

        #[arg(short, long)]
        build: u64,

        /// Only validate the rollback deployment
        #[arg(long, default_value_t = false)]
        validate: bool,

        /// JSON file with constructiveChanges / destructiveChangesPre / destructiveChangesPost
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },
    /// Fetch rollback details of a build
    RollbackDetails {
        #[arg(short, long)]
        job: String,

        #[arg(short, long)]
        build: Option<u64>,
    },
    /// Fetch the rollback iterations of a build
    RollbackHistory {
        #[arg(short, long)]
        job: String,

        #[arg(short, long)]
        build: u64,
    },
}

impl Cli {
    fn build_client(&self, config: &Config) -> Result<CiJobsClient> {
        let url = self
            .url
            .as_deref()
            .or(config.instance.url.as_deref())
            .context("No AutoRABIT URL: pass --url, set RABIT_URL or add instance.url to the config")?;
        let token = self
            .token
            .as_deref()
            .or(config.instance.token.as_deref())
            .context("No AutoRABIT token: pass --token, set RABIT_TOKEN or add instance.token to the config")?;
        let timeout = Duration::from_secs(self.timeout.unwrap_or(config.client.timeout_secs));

        let credentials = Credentials::new(url, token)?;
        Ok(CiJobsClient::with_timeout(credentials, timeout)?)
    }

    async fn wait_for_build(
        client: &CiJobsClient,
        job: &str,
        build: Option<u64>,
        mut response: JsonObject,
        interval: u64,
    ) -> Result<JsonObject> {
        let build = build.or_else(|| status::cycle_number(&response));
        let progress = WaitProgress::start(job, build);
        let mut polls = 0;

        while JobStatus::from_body(&response).is_some_and(|s| s.is_running()) {
            tokio::time::sleep(Duration::from_secs(interval)).await;
            polls += 1;
            progress.tick(polls);

            let mut params = PollParams::new(job);
            if let Some(build) = build {
                params = params.build(build);
            }
            response = client.poll(params).await?;
        }

        progress.finish(JobStatus::from_body(&response).as_ref());
        Ok(response)
    }

    async fn run_command(&self, client: &CiJobsClient) -> Result<JsonObject> {
        let response = match &self.command {
            Commands::History {
                job,
                from,
                to,
                build,
            } => {
                let range = match (from, to, build) {
                    (_, _, Some(build)) => BuildRange::single(*build),
                    (Some(from), Some(to), None) => BuildRange::between(*from, *to)?,
                    _ => BuildRange::all(),
                };
                info!("Fetching history for CI job: {job}");
                client.history(HistoryParams::new(job).range(range)).await?
            }
            Commands::Poll { job, build, wait } => {
                let mut params = PollParams::new(job);
                if let Some(build) = build {
                    params = params.build(*build);
                }
                let response = client.poll(params).await?;
                if wait.wait {
                    Self::wait_for_build(client, job, *build, response, wait.interval).await?
                } else {
                    response
                }
            }
            Commands::Trigger { job, title, wait } => {
                info!("Triggering CI job: {job}");
                let response = client
                    .trigger(TriggerParams::new(job).title(title))
                    .await?;
                if let Some(status) = JobStatus::from_body(&response).filter(|s| !s.is_ok()) {
                    warn!("Trigger of {job} reported status {status}");
                }
                if wait.wait {
                    Self::wait_for_build(client, job, None, response, wait.interval).await?
                } else {
                    response
                }
            }
            Commands::QuickDeploy { job, build } => {
                let mut params = QuickDeployParams::new(job);
                if let Some(build) = build {
                    params = params.build(*build);
                }
                let response = client.quick_deploy(params).await?;
                if !status::quick_deploy_accepted(&response) {
                    warn!("Quick deploy of {job} was not initiated");
                }
                response
            }
            Commands::Update { job, revision } => {
                let response = client.update(UpdateParams::new(job, revision)).await?;
                if JobStatus::from_body(&response) != Some(JobStatus::Success) {
                    warn!("Baseline revision of {job} was not updated");
                }
                response
            }
            Commands::Rollback {
                job,
                build,
                validate,
                manifest,
            } => {
                let manifest = match manifest {
                    Some(path) => load_manifest(path)?,
                    None => RollbackManifest::default(),
                };
                info!("Triggering rollback of {job}_{build}");
                client
                    .rollback(
                        RollbackParams::new(job, *build)
                            .validate_only(*validate)
                            .manifest(manifest),
                    )
                    .await?
            }
            Commands::RollbackDetails { job, build } => {
                let mut params = RollbackDetailsParams::new(job);
                if let Some(build) = build {
                    params = params.build(*build);
                }
                client.rollback_details(params).await?
            }
            Commands::RollbackHistory { job, build } => {
                client
                    .rollback_history(RollbackHistoryParams::new(job, *build))
                    .await?
            }
        };
        Ok(response)
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let client = self.build_client(&config)?;

        let response = self.run_command(&client).await?;

        let format = self.format.unwrap_or(config.output.format);
        let pretty = self.pretty || config.output.pretty;
        let rendered = output::render(&response, format, pretty)?;
        output::emit(&rendered, self.output.as_deref())
    }
}

/// Reads a rollback manifest, either a bare manifest object or a full
/// `rollback-details` response.
fn load_manifest(path: &Path) -> Result<RollbackManifest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
    let Some(object) = value.as_object() else {
        bail!("Manifest must be a JSON object: {}", path.display());
    };
    Ok(RollbackManifest::from_details(object))
}
