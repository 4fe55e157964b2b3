use std::path::{Path, PathBuf};

mod map;
mod report;
mod resolve;
mod status;
mod terminal;
mod validate;

use anyhow::Context;
use clap::ArgAction;
use map::Map;
use report::Report;
use resolve::Resolve;
use status::Status;
use studioplan::{
    mapping::GroupByType, storage, Detector, EffortTable, ExtractionFilters, MapDocument,
};
use validate::Validate;

/// The map document, relative to the planning root.
const MAP_FILE: &str = "feature_user_story_map.toml";
/// The feature-detection patterns, relative to the planning root.
const DETECT_FILE: &str = "feature-mapping.json";
/// The effort table, relative to the planning root.
const METRICS_FILE: &str = "time_metrics.json";
/// Optional client-side record filters, relative to the planning root.
const FILTERS_FILE: &str = "extraction_filters.json";

/// Loads the component pool from the extraction files in `root`.
///
/// Record filters are applied when `extraction_filters.json` exists.
fn load_pool(root: &Path) -> anyhow::Result<Vec<studioplan::Component>> {
    let filters_path = root.join(FILTERS_FILE);
    let filters = if filters_path.exists() {
        ExtractionFilters::load(&filters_path)?
    } else {
        ExtractionFilters::default()
    };
    Ok(storage::load_pool(root, &filters)?)
}

/// Loads the map document, or `None` when the file does not exist.
fn load_map(root: &Path) -> anyhow::Result<Option<MapDocument>> {
    let path = root.join(MAP_FILE);
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(MapDocument::load(&path)?))
}

/// Loads the feature detector; no patterns file means every component
/// groups by model.
fn load_detector(root: &Path) -> anyhow::Result<Detector> {
    let path = root.join(DETECT_FILE);
    if !path.exists() {
        return Ok(Detector::empty());
    }
    Ok(Detector::load(&path)?)
}

/// Loads the effort table.
fn load_effort(root: &Path) -> anyhow::Result<EffortTable> {
    let path = root.join(METRICS_FILE);
    EffortTable::load(&path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Runs the full planning pipeline: pool → features → user stories.
fn build_plan(
    root: &Path,
) -> anyhow::Result<Vec<(studioplan::Feature, Vec<studioplan::UserStory>)>> {
    let pool = load_pool(root)?;
    let detector = load_detector(root)?;
    let document = load_map(root)?.unwrap_or_default();
    let table = load_effort(root)?;
    let fallback = GroupByType::new(&table);

    Ok(detector
        .detect(&pool)
        .into_iter()
        .map(|feature| {
            let stories =
                studioplan::mapping::build_user_stories(&feature, &document, &table, &fallback);
            (feature, stories)
        })
        .collect())
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the planning root (extraction output and config files)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show extraction pool status (default)
    Status(Status),

    /// Validate the map document against the extraction pool
    Validate(Validate),

    /// Resolve a component reference against the extraction pool
    Resolve(Resolve),

    /// Build user stories for the detected features
    Map(Map),

    /// Render the implementation overview report
    Report(Report),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(&root)?,
            Self::Validate(command) => command.run(&root)?,
            Self::Resolve(command) => command.run(&root)?,
            Self::Map(command) => command.run(&root)?,
            Self::Report(command) => command.run(&root)?,
        }
        Ok(())
    }
}

/// Output format shared by the tabular subcommands.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}
