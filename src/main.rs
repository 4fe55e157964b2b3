//! `splan` — project planning for Odoo Studio customizations.

mod cli;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
