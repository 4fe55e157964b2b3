use std::path::Path;

use clap::Parser;
use studioplan::{mapping, storage, EffortTable, MapDocument};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Validate the map document, its freshness, and the effort table")]
pub struct Validate {
    /// Types of checks to run (can be specified multiple times)
    #[arg(long, value_name = "TYPE")]
    check: Vec<CheckType>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum, PartialEq, Eq)]
enum CheckType {
    /// Check the map document structure (stories, components, deprecation)
    Document,
    /// Check the map was generated against the current extraction
    Freshness,
    /// Check the effort table loads and is complete
    Metrics,
    /// Run all checks
    All,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}

#[derive(Debug, Default)]
struct ValidationResult {
    document_issues: Vec<String>,
    freshness_issues: Vec<String>,
    metrics_issues: Vec<String>,
    /// Checks that could not run because their inputs were absent.
    skipped: Vec<String>,
}

impl ValidationResult {
    fn total(&self) -> usize {
        self.document_issues.len() + self.freshness_issues.len() + self.metrics_issues.len()
    }
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let map_path = root.join(super::MAP_FILE);
        if !map_path.exists() {
            anyhow::bail!("No map document found at {}", map_path.display());
        }
        let document = MapDocument::load(&map_path)?;

        // Determine which checks to run
        let checks = if self.check.is_empty() || self.check.contains(&CheckType::All) {
            vec![CheckType::Document, CheckType::Freshness, CheckType::Metrics]
        } else {
            self.check.clone()
        };

        let mut result = ValidationResult::default();

        for check in &checks {
            match check {
                CheckType::Document => Self::check_document(&document, &mut result),
                CheckType::Freshness => Self::check_freshness(root, &document, &mut result)?,
                CheckType::Metrics => Self::check_metrics(root, &mut result),
                CheckType::All => unreachable!("All should have been expanded"),
            }
        }

        match self.output {
            OutputFormat::Table => self.output_table(&document, &result),
            OutputFormat::Json => Self::output_json(&result)?,
            OutputFormat::Summary => println!("issues={}", result.total()),
        }

        if result.total() > 0 {
            std::process::exit(2);
        }

        Ok(())
    }

    fn check_document(document: &MapDocument, result: &mut ValidationResult) {
        result.document_issues.extend(
            mapping::validate(document)
                .iter()
                .map(ToString::to_string),
        );
    }

    fn check_freshness(
        root: &Path,
        document: &MapDocument,
        result: &mut ValidationResult,
    ) -> anyhow::Result<()> {
        let pool = super::load_pool(root)?;
        if pool.is_empty() {
            result
                .skipped
                .push("freshness: no extraction output to compare against".to_string());
            return Ok(());
        }

        if document.metadata.fingerprint.is_none() {
            result
                .skipped
                .push("freshness: map predates fingerprinting".to_string());
            return Ok(());
        }

        let fingerprint = storage::fingerprint(&pool);
        if let Some(warning) = mapping::check_freshness(document, &fingerprint) {
            result.freshness_issues.push(warning.to_string());
        }
        Ok(())
    }

    fn check_metrics(root: &Path, result: &mut ValidationResult) {
        // A broken or incomplete table is reported like any other finding so
        // the remaining checks still run.
        if let Err(err) = EffortTable::load(&root.join(super::METRICS_FILE)) {
            result.metrics_issues.push(err.to_string());
        }
    }

    fn output_table(&self, document: &MapDocument, result: &ValidationResult) {
        if self.quiet {
            return;
        }

        println!("Validating map document...\n");

        let feature_count = document.features().count();
        if result.document_issues.is_empty() {
            println!("✓ Document:   {feature_count} features, all well-formed");
        } else {
            println!(
                "{}",
                format!("✗ Document:   {} issues found", result.document_issues.len()).warning()
            );
            for issue in &result.document_issues {
                println!("    • {issue}");
            }
        }

        if result.freshness_issues.is_empty() {
            println!("✓ Freshness:  Map matches the current extraction");
        } else {
            println!("{}", "✗ Freshness:  Map is stale".warning());
            for issue in &result.freshness_issues {
                println!("    • {issue}");
            }
        }

        if result.metrics_issues.is_empty() {
            println!("✓ Metrics:    Effort table is complete");
        } else {
            println!(
                "{}",
                format!("✗ Metrics:    {} issues found", result.metrics_issues.len()).warning()
            );
            for issue in &result.metrics_issues {
                println!("    • {issue}");
            }
        }

        for skipped in &result.skipped {
            println!("{}", format!("- Skipped {skipped}").dim());
        }

        let total = result.total();
        if total == 0 {
            println!("\n{}", "Map is healthy (0 issues)".success());
        } else {
            println!("\n{}", format!("Summary: {total} issues found").warning());
        }
    }

    fn output_json(result: &ValidationResult) -> anyhow::Result<()> {
        use serde_json::json;

        let output = json!({
            "status": if result.total() == 0 { "healthy" } else { "issues_found" },
            "issues": {
                "document": result.document_issues,
                "freshness": result.freshness_issues,
                "metrics": result.metrics_issues,
            },
            "skipped": result.skipped,
            "summary": { "total_issues": result.total() },
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
