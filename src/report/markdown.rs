//! Markdown implementation overview.
//!
//! Renders the planning result — features, their user stories, and the
//! components behind them — as a Markdown document suitable for checking
//! into a project repository or pasting into a task tracker.

use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::domain::{Feature, UserStory};

/// Renders the implementation overview.
///
/// Output is deterministic for a given input; the caller supplies the
/// generation timestamp.
#[must_use]
pub fn render_overview(
    features: &[(Feature, Vec<UserStory>)],
    generated_at: NaiveDateTime,
) -> String {
    let component_total: usize = features.iter().map(|(f, _)| f.components.len()).sum();
    let hour_total: f64 = features
        .iter()
        .flat_map(|(_, stories)| stories.iter())
        .map(|story| story.estimated_hours)
        .sum();

    let mut out = String::new();
    let _ = writeln!(out, "# Implementation Overview");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Generated: {}",
        generated_at.format("%Y-%m-%d %H:%M")
    );
    let _ = writeln!(
        out,
        "Scope: {component_total} component(s) across {} feature(s)",
        features.len()
    );
    let _ = writeln!(out, "Total estimated effort: {hour_total:.1} hours");

    for (feature, stories) in features {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {}", feature.name);
        if !feature.description.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", feature.description);
        }

        let models: Vec<&str> = feature.affected_models().into_iter().collect();
        if !models.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Affected models: {}", models.join(", "));
        }

        for story in stories {
            render_story(&mut out, story);
        }

        let feature_hours: f64 = stories.iter().map(|story| story.estimated_hours).sum();
        let _ = writeln!(out);
        let _ = writeln!(out, "**Feature total: {feature_hours:.1} hours**");
    }

    out
}

fn render_story(out: &mut String, story: &UserStory) {
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "### {} ({:.1} h)",
        story.title, story.estimated_hours
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", story.description);
    let _ = writeln!(out);
    let _ = writeln!(out, "| Component | Type | Model | Complexity |");
    let _ = writeln!(out, "| --- | --- | --- | --- |");

    for component in &story.components {
        let name = if component.display_name.is_empty() {
            &component.name
        } else {
            &component.display_name
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            name,
            component.component_type.label(),
            if component.model.is_empty() {
                "—"
            } else {
                &component.model
            },
            component.complexity,
        );
    }
}
