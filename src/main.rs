use anyhow::Context;
use clap::Parser;
use log::info;

use infrakit::{
    config::{Cli, Command, Config},
    pipeline::run,
    schema::{render_table, CELL_SITE_SCHEMA, COVERAGE_SCHEMA, POI_SCHEMA, TRANSMISSION_NODE_SCHEMA},
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_module(env!("CARGO_CRATE_NAME"), cli.log_level.into())
        .parse_default_env()
        .init();

    match cli.command.clone().unwrap_or(Command::Run) {
        Command::Schema => {
            for (title, schema) in [
                ("Point of interest", &POI_SCHEMA[..]),
                ("Cell site", &CELL_SITE_SCHEMA[..]),
                ("Transmission node", &TRANSMISSION_NODE_SCHEMA[..]),
                ("Mobile coverage", &COVERAGE_SCHEMA[..]),
            ] {
                println!("{}", render_table(title, schema));
            }
        }
        Command::Run => {
            let config = Config::from_cli(&cli).context("loading configuration")?;
            let report = run(&config).with_context(|| format!("processing {}", config.country))?;
            info!(
                "{}: {} schools, {} cell sites, {} nodes, {} coverage areas",
                report.iso3, report.schools, report.cell_sites, report.nodes, report.coverage_areas
            );
            for file in report.files {
                println!("{}", file.display());
            }
        }
    }

    Ok(())
}
