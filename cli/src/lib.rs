//! `labinv` command line front end.
//!
//! ## Commands
//!
//! - `labinv agarose bottle add|list`, `labinv agarose solution prepare|list|show`
//! - `labinv water batch add|list`, `labinv water filter add|list`
//! - `labinv pls bottle add|list`, `labinv pls aliquot add|list`
//! - `labinv dish create|show|list|check|status|terminate`
//! - `labinv export survival`
//! - `labinv validate`
//! - `labinv config show`
//!
//! Exit codes: 0 on success, 1 when an operation or validation fails, 2 on
//! usage errors.

pub mod dish_cmd;
pub mod export_cmd;
pub mod logging;
pub mod material_cmd;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use labinv_store::config::{AppConfig, ConfigLoader};
use labinv_store::{FileStatus, Lab};

use crate::dish_cmd::DishCli;
use crate::export_cmd::ExportCli;
use crate::material_cmd::{AgaroseCli, PlsCli, WaterCli};

/// Laboratory materials and fish-dish inventory.
#[derive(Debug, Parser)]
#[command(name = "labinv", version, about)]
pub struct Cli {
    /// Configuration file. Defaults to ./labinv.toml, then
    /// ~/.config/labinv/config.toml, then ~/.labinv.toml.
    #[arg(long = "config", short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON.
    #[arg(long = "json", short = 'j', global = true)]
    pub json: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Agarose bottles and solutions.
    Agarose(AgaroseCli),
    /// Fish water batches and filtered water.
    Water(WaterCli),
    /// Poly-L-serine bottles and aliquots.
    Pls(PlsCli),
    /// Fish dishes and their quality checks.
    Dish(DishCli),
    /// Survivability reports.
    Export(ExportCli),
    /// Check every data file against its schema.
    Validate,
    /// Inspect the effective configuration.
    Config(ConfigCli),
}

#[derive(Debug, Parser)]
pub struct ConfigCli {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Print the merged configuration (defaults, file, environment).
    Show,
}

/// Shared state handed to every subcommand.
pub struct Context {
    pub lab: Lab,
    pub json: bool,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<ExitCode> {
        let config = load_config(self.config.as_deref())?;
        let _guard = logging::init(&config.logging, self.verbose)?;

        if let Command::Config(ConfigCli {
            command: ConfigSubcommand::Show,
        }) = &self.command
        {
            show_config(&config, self.json)?;
            return Ok(ExitCode::SUCCESS);
        }

        let ctx = Context {
            lab: Lab::open(&config)?,
            json: self.json,
        };
        match self.command {
            Command::Agarose(cli) => cli.run(&ctx)?,
            Command::Water(cli) => cli.run(&ctx)?,
            Command::Pls(cli) => cli.run(&ctx)?,
            Command::Dish(cli) => cli.run(&ctx)?,
            Command::Export(cli) => cli.run(&ctx)?,
            Command::Validate => return validate(&ctx),
            Command::Config(_) => {}
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => ConfigLoader::new().with_file(path).load()?,
        None => ConfigLoader::load_default()?,
    };
    Ok(config)
}

fn show_config(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    if json {
        output::print_json(config)
    } else {
        let storage = &config.storage;
        let prep = &config.preparation;
        println!("[storage]");
        println!("material_data_dir = {}", storage.material_data_dir.display());
        println!("dish_data_dir     = {}", storage.dish_data_dir.display());
        println!("backups           = {}", storage.backups);
        println!();
        println!("[preparation]");
        println!("prepared_by             = {}", prep.prepared_by);
        println!("agarose_location        = {}", prep.agarose_location);
        println!("agarose_container       = {}", prep.agarose_container);
        println!("agarose_expiration_days = {}", prep.agarose_expiration_days);
        println!("filtered_water_location = {}", prep.filtered_water_location);
        println!("pls_location            = {}", prep.pls_location);
        println!("pls_container           = {}", prep.pls_container);
        println!();
        println!("[logging]");
        println!("level = {}", config.logging.level);
        if let Some(file) = &config.logging.file {
            println!("file  = {}", file.display());
        }
        Ok(())
    }
}

fn validate(ctx: &Context) -> anyhow::Result<ExitCode> {
    let report = ctx.lab.validate_all()?;
    if ctx.json {
        output::print_json(&report)?;
    } else {
        for file in &report.files {
            match &file.status {
                FileStatus::Ok { records } => {
                    println!("ok       {} ({records} records)", file.path.display());
                }
                FileStatus::Missing => println!("missing  {}", file.path.display()),
                FileStatus::Invalid { problems } => {
                    println!("INVALID  {}", file.path.display());
                    for problem in problems {
                        println!("    - {problem}");
                    }
                }
            }
        }
        println!(
            "{} file(s) checked, {} invalid",
            report.files.len(),
            report.invalid_count()
        );
    }
    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
