pub mod autofill;
pub mod db;
pub mod fake_data;
pub mod service;
pub mod settings;
pub mod store;
mod utils;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use clap::{builder::BoolishValueParser, ArgAction, Args, Parser, Subcommand};
use serde_json::{json, Value};

use autofill::ScreenStructure;
use db::Database;
use fake_data::{random_seed, FakeDataBuilder};
use service::AutofillService;
use settings::{LoggingLevel, PreferencesStore};
use store::{AutofillRepository, JsonDatasetStore, PackageVerificationStore};

#[derive(Debug, Parser)]
#[command(
    name = "autofill-service",
    version,
    about = "Answers autofill fill and save requests for screen snapshots"
)]
pub struct Cli {
    /// Keep datasets in SQLite instead of the JSON key-value file.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub sqlite: bool,

    /// Directory holding preferences, datasets and trusted signatures.
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct RequestArgs {
    /// Screen snapshot as JSON.
    pub snapshot: PathBuf,
    /// Signing certificate of the requesting package.
    pub certificate: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Answer a fill request.
    Fill(RequestArgs),
    /// Store the values shown on a screen.
    Save(RequestArgs),
    /// Generate fake datasets from the field type catalog (always SQLite).
    Seed { seed: Option<u32> },
    /// Forget saved datasets and trusted packages.
    Clear,
    /// Change a preference.
    #[command(subcommand)]
    Set(Preference),
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Preference {
    ResponseAuth {
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        enabled: bool,
    },
    DatasetAuth {
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        enabled: bool,
    },
    LoggingLevel {
        #[arg(value_enum)]
        level: LoggingLevel,
    },
}

fn apply_preference(preferences: &PreferencesStore, preference: Preference) -> Result<()> {
    match preference {
        Preference::ResponseAuth { enabled } => preferences.set_response_auth(enabled),
        Preference::DatasetAuth { enabled } => preferences.set_dataset_auth(enabled),
        Preference::LoggingLevel { level } => preferences.set_logging_level(level),
    }
}

fn read_request(snapshot: &Path, certificate: &Path) -> Result<(ScreenStructure, Vec<Vec<u8>>)> {
    let raw = fs::read_to_string(snapshot)
        .with_context(|| format!("failed to read snapshot {}", snapshot.display()))?;
    let structure = ScreenStructure::from_json(&raw)?;
    let certificate = fs::read(certificate)
        .with_context(|| format!("failed to read certificate {}", certificate.display()))?;
    Ok((structure, vec![certificate]))
}

/// Executes one command against the stores under the data directory and
/// returns the JSON to print.
pub async fn execute(cli: Cli) -> Result<Value> {
    let data_dir = &cli.data_dir;
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let preferences = Arc::new(PreferencesStore::new(data_dir.join("preferences.json"))?);
    log::set_max_level(preferences.logging_level().level_filter());

    if let Command::Set(preference) = cli.command {
        apply_preference(&preferences, preference)?;
        return Ok(serde_json::to_value(preferences.snapshot())?);
    }

    let use_sqlite = cli.sqlite || matches!(cli.command, Command::Seed { .. });
    let database = if use_sqlite {
        Some(Database::open(data_dir.join("autofill.sqlite3"))?)
    } else {
        None
    };
    let repository: Arc<dyn AutofillRepository> = match &database {
        Some(database) => Arc::new(database.clone()),
        None => Arc::new(JsonDatasetStore::open(data_dir.join("datasets.json"))?),
    };
    let verification = Arc::new(PackageVerificationStore::open(
        data_dir.join("package_signatures.json"),
    )?);
    let service = AutofillService::new(repository, preferences, verification);

    let output = match cli.command {
        Command::Fill(request) => {
            let (structure, signatures) = read_request(&request.snapshot, &request.certificate)?;
            let response = service.on_fill_request(&structure, &signatures).await?;
            serde_json::to_value(response)?
        }
        Command::Save(request) => {
            let (structure, signatures) = read_request(&request.snapshot, &request.certificate)?;
            let name = service.on_save_request(&structure, &signatures).await?;
            json!({ "datasetName": name })
        }
        Command::Seed { seed } => {
            let database = database.ok_or_else(|| anyhow!("seeding needs the sqlite store"))?;
            let seed = seed.unwrap_or_else(random_seed);
            let builder = FakeDataBuilder::new(database.get_field_types().await?);
            let collections =
                builder.build_collections_by_partition(database.dataset_number().await?, seed);
            let names = database
                .save_named_collections("fake".to_string(), collections)
                .await?;
            json!({ "seed": seed, "datasets": names })
        }
        Command::Clear => {
            service.clear().await?;
            json!({ "cleared": true })
        }
        Command::Set(_) => Value::Null,
    };

    Ok(output)
}

/// Logger that lets every record through. The effective level comes from the
/// logging preference via `log::set_max_level`.
fn logger_builder() -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Trace);
    builder
}

pub fn run() {
    // RUST_LOG narrows module filters on top of the preference
    logger_builder().parse_default_env().init();

    let cli = Cli::parse();
    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
        .and_then(|runtime| runtime.block_on(execute(cli)));

    match result {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                log::error!("Failed to render output: {err}");
                std::process::exit(1);
            }
        },
        Err(err) => {
            log::error!("{err:#}");
            std::process::exit(1);
        }
    }
}
