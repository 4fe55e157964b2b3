use std::{collections::BTreeMap, path::Path, process};

use clap::Parser;
use studioplan::{mapping, storage, Complexity, ComponentType};
use tracing::instrument;

use super::{
    terminal::{is_narrow, Colorize},
    OutputFormat,
};

#[derive(Debug, Parser, Default)]
#[command(about = "Show component counts and map freshness")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let pool = super::load_pool(root)?;

        if pool.is_empty() {
            println!(
                "No extraction output found in {}. Expected files like custom_fields_output.json.",
                root.display()
            );
            return Ok(());
        }

        let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
        let mut by_complexity: BTreeMap<&str, usize> = BTreeMap::new();
        for component in &pool {
            *by_type.entry(component.component_type.label()).or_insert(0) += 1;
            *by_complexity.entry(component.complexity.as_str()).or_insert(0) += 1;
        }
        let total = pool.len();

        let fingerprint = storage::fingerprint(&pool);
        let document = super::load_map(root)?;
        let staleness = document
            .as_ref()
            .and_then(|doc| mapping::check_freshness(doc, &fingerprint));

        match self.output {
            OutputFormat::Json => {
                Self::output_json(
                    &by_type,
                    &by_complexity,
                    total,
                    &fingerprint,
                    document.is_some(),
                    staleness.as_ref(),
                )?;
            }
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(total, document.is_some(), staleness.is_some());
                } else {
                    Self::output_table(
                        &by_type,
                        &by_complexity,
                        total,
                        &fingerprint,
                        document.is_some(),
                        staleness.as_ref(),
                    );
                }
            }
        }

        // Exit with a non-zero code when the map needs regenerating.
        if staleness.is_some() {
            process::exit(2);
        }

        Ok(())
    }

    fn output_json(
        by_type: &BTreeMap<&str, usize>,
        by_complexity: &BTreeMap<&str, usize>,
        total: usize,
        fingerprint: &str,
        map_present: bool,
        staleness: Option<&mapping::MapWarning>,
    ) -> anyhow::Result<()> {
        use serde_json::json;

        let output = json!({
            "components": {
                "by_type": by_type,
                "by_complexity": by_complexity,
                "total": total,
            },
            "fingerprint": fingerprint,
            "map": {
                "present": map_present,
                "stale": staleness.is_some(),
            }
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(total: usize, map_present: bool, stale: bool) {
        println!("total={total} map={map_present} stale={stale}");
    }

    fn output_table(
        by_type: &BTreeMap<&str, usize>,
        by_complexity: &BTreeMap<&str, usize>,
        total: usize,
        fingerprint: &str,
        map_present: bool,
        staleness: Option<&mapping::MapWarning>,
    ) {
        let narrow = is_narrow();

        println!("Extracted components");
        println!("{}", "────────────────────".dim());

        if narrow {
            // Stacked output for narrow terminals
            for (label, count) in by_type {
                println!("{label}: {count}");
            }
            println!("Total: {total}");
        } else {
            println!("{:<16} Count", "Type");
            for (label, count) in by_type {
                println!("{label:<16} {count}");
            }
            println!("Total            {total}");
        }

        println!();
        let complexity_line: Vec<String> = Complexity::ALL
            .into_iter()
            .map(|level| {
                let count = by_complexity.get(level.as_str()).copied().unwrap_or(0);
                format!("{level}: {count}")
            })
            .collect();
        println!("Complexity: {}", complexity_line.join(", "));

        println!();
        println!("Pool fingerprint: {}", &fingerprint[..12.min(fingerprint.len())]);

        println!();
        if !map_present {
            println!("Map document: none ({})", super::MAP_FILE.dim());
        } else if let Some(warning) = staleness {
            println!("Map document: {} ⚠️", "stale".warning());
            println!("{}", warning.to_string().dim());
            println!("{}", "Regenerate the map from the current extraction.".dim());
        } else {
            println!("Map document: {} ✅", "current".success());
        }

        // Surface any type missing from the extraction entirely.
        let missing: Vec<&str> = ComponentType::ALL
            .into_iter()
            .map(ComponentType::label)
            .filter(|label| !by_type.contains_key(label))
            .collect();
        if !missing.is_empty() {
            println!();
            println!(
                "{}",
                format!("No {} components in this extraction.", missing.join(", ")).dim()
            );
        }
    }
}
