//! Survivability export.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use labinv_store::export::{DEFAULT_DETAILED_REPORT, DEFAULT_SUMMARY_REPORT};
use labinv_store::{ExportKind, ExportPaths};

use crate::Context;
use crate::output;

#[derive(Debug, Parser)]
pub struct ExportCli {
    #[command(subcommand)]
    pub command: ExportSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ExportSubcommand {
    /// Write survivability CSV reports from the dish files.
    Survival(SurvivalArgs),
}

#[derive(Debug, Parser)]
pub struct SurvivalArgs {
    /// Write only the summary grouped by cross, genotype and dof.
    #[arg(long = "summary", conflicts_with = "both")]
    pub summary: bool,

    /// Write both the detailed report and the summary.
    #[arg(long = "both")]
    pub both: bool,

    /// Detailed report path.
    #[arg(long = "output", short = 'o', default_value = DEFAULT_DETAILED_REPORT)]
    pub output: PathBuf,

    /// Summary report path.
    #[arg(long = "summary-output", default_value = DEFAULT_SUMMARY_REPORT)]
    pub summary_output: PathBuf,

    /// Read dish files from this directory instead of the configured one.
    #[arg(long = "dishes-dir")]
    pub dishes_dir: Option<PathBuf>,
}

impl SurvivalArgs {
    fn kind(&self) -> ExportKind {
        if self.both {
            ExportKind::Both
        } else if self.summary {
            ExportKind::Summary
        } else {
            ExportKind::Detailed
        }
    }
}

impl ExportCli {
    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        match self.command {
            ExportSubcommand::Survival(args) => cmd_survival(ctx, args),
        }
    }
}

fn cmd_survival(ctx: &Context, args: SurvivalArgs) -> anyhow::Result<()> {
    let kind = args.kind();
    let paths = ExportPaths {
        detailed: args.output,
        summary: args.summary_output,
    };
    let summary = ctx
        .lab
        .export_survivability(kind, &paths, args.dishes_dir.as_deref())?;
    if ctx.json {
        return output::print_json(&summary);
    }
    for report in &summary.reports {
        println!(
            "Wrote {} rows to {} ({} dish files)",
            report.rows,
            report.path.display(),
            summary.dishes
        );
    }
    Ok(())
}
