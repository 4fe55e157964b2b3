use std::path::Path;

use clap::Parser;
use studioplan::{Feature, UserStory};
use tracing::instrument;

use super::{terminal::Colorize, OutputFormat};

#[derive(Debug, Parser)]
#[command(about = "Group the extraction pool into features and build user stories")]
pub struct Map {
    /// Limit output to a single feature
    #[arg(long, value_name = "NAME")]
    feature: Option<String>,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Map {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut plan = super::build_plan(root)?;

        if let Some(wanted) = &self.feature {
            plan.retain(|(feature, _)| feature.name.as_str() == wanted.as_str());
            if plan.is_empty() {
                anyhow::bail!("No feature named '{wanted}' was detected");
            }
        }

        match self.output {
            OutputFormat::Json => Self::output_json(&plan)?,
            OutputFormat::Table => Self::output_table(&plan),
        }

        Ok(())
    }

    fn output_json(plan: &[(Feature, Vec<UserStory>)]) -> anyhow::Result<()> {
        use serde_json::json;

        let features: Vec<_> = plan
            .iter()
            .map(|(feature, stories)| {
                let stories: Vec<_> = stories
                    .iter()
                    .map(|story| {
                        json!({
                            "title": story.title,
                            "description": story.description,
                            "estimated_hours": story.estimated_hours,
                            "components": story.components.iter().collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                let hours: f64 = stories
                    .iter()
                    .filter_map(|s| s["estimated_hours"].as_f64())
                    .sum();
                json!({
                    "name": feature.name.as_str(),
                    "description": feature.description,
                    "component_count": feature.components.len(),
                    "estimated_hours": hours,
                    "user_stories": stories,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json!({ "features": features }))?);
        Ok(())
    }

    fn output_table(plan: &[(Feature, Vec<UserStory>)]) {
        if plan.is_empty() {
            println!("No features detected (empty extraction pool).");
            return;
        }

        let mut grand_total = 0.0_f64;

        for (feature, stories) in plan {
            let feature_hours: f64 = stories.iter().map(|s| s.estimated_hours).sum();
            grand_total += feature_hours;

            println!(
                "{} ({} components, {feature_hours:.1} h)",
                feature.name,
                feature.components.len()
            );
            for (index, story) in stories.iter().enumerate() {
                let prefix = if index == stories.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "{prefix} {} {}",
                    story.title,
                    format!("({} components, {:.1} h)", story.component_count(), story.estimated_hours)
                        .dim()
                );
            }
            println!();
        }

        println!(
            "{}",
            format!("Total: {} feature(s), {grand_total:.1} hours", plan.len()).success()
        );
    }
}
