use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Render the implementation overview as Markdown")]
pub struct Report {
    /// Write the report to a file instead of stdout
    #[arg(long, short, value_name = "PATH")]
    out: Option<PathBuf>,
}

impl Report {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let plan = super::build_plan(root)?;
        let rendered =
            studioplan::report::render_overview(&plan, chrono::Local::now().naive_local());

        match self.out {
            Some(path) => {
                std::fs::write(&path, &rendered)?;
                println!(
                    "{}",
                    format!("Wrote implementation overview to {}", path.display()).success()
                );
            }
            None => print!("{rendered}"),
        }

        Ok(())
    }
}
