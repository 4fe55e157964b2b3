use std::path::Path;

use clap::Parser;
use studioplan::{resolve, Component};
use tracing::instrument;

use super::{terminal::Colorize, OutputFormat};

#[derive(Debug, Parser)]
#[command(about = "Resolve a component reference against the extraction pool")]
pub struct Resolve {
    /// The reference to resolve, e.g. 'field.sale_order.x_credit_limit'
    reference: String,

    /// Maximum number of suggestions when the reference does not resolve
    #[arg(long, default_value_t = 3)]
    suggestions: usize,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Resolve {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let pool = super::load_pool(root)?;
        if pool.is_empty() {
            anyhow::bail!("No extraction output found in {}", root.display());
        }

        if let Some(found) = resolve::resolve(&self.reference, &pool) {
            match self.output {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(found)?);
                }
                OutputFormat::Table => {
                    println!("{}", "Resolved ✅".success());
                    print_component(found);
                }
            }
            return Ok(());
        }

        let suggestions = resolve::suggest(&self.reference, &pool, self.suggestions);

        match self.output {
            OutputFormat::Json => {
                use serde_json::json;
                let output = json!({
                    "reference": self.reference,
                    "resolved": false,
                    "suggestions": suggestions,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!(
                    "{}",
                    format!("'{}' did not resolve ⚠️", self.reference).warning()
                );
                if suggestions.is_empty() {
                    println!("{}", "No similar components of that type exist.".dim());
                } else {
                    println!("\nDid you mean:");
                    for component in suggestions {
                        let display = if component.display_name.is_empty() {
                            &component.name
                        } else {
                            &component.display_name
                        };
                        println!(
                            "  • {}.{}.{} ({})",
                            component.component_type,
                            component.model,
                            display,
                            component.name
                        );
                    }
                }
            }
        }

        // Exit 2 so scripts can tell "unresolved" apart from hard failures.
        std::process::exit(2);
    }
}

fn print_component(component: &Component) {
    println!("  Id:          {}", component.id);
    println!("  Name:        {}", component.name);
    if !component.display_name.is_empty() && component.display_name != component.name {
        println!("  Display:     {}", component.display_name);
    }
    println!("  Type:        {}", component.component_type.label());
    println!(
        "  Model:       {}",
        if component.model.is_empty() {
            "(none)"
        } else {
            &component.model
        }
    );
    println!("  Complexity:  {}", component.complexity);
    if let Some(path) = &component.file_path {
        println!("  Source:      {}", path.display());
    }
}
