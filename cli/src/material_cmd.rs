//! Material subcommands: agarose, fish water and poly-L-serine.

use clap::{Parser, Subcommand};
use labinv_model::{
    AgaroseBottle, AliquotRequest, FilterRequest, LabDate, PolyLSerineBottle, SolutionRequest,
};

use crate::Context;
use crate::output::{self, opt};

// ─────────────────────────────────────────────────────────────────────────────
// Agarose
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
pub struct AgaroseCli {
    #[command(subcommand)]
    pub command: AgaroseSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum AgaroseSubcommand {
    /// Bottles of agarose powder.
    Bottle(AgaroseBottleCli),
    /// Prepared agarose solutions.
    Solution(SolutionCli),
}

#[derive(Debug, Parser)]
pub struct AgaroseBottleCli {
    #[command(subcommand)]
    pub command: AgaroseBottleSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum AgaroseBottleSubcommand {
    /// Register a new bottle.
    Add(AgaroseBottleAddArgs),
    /// List bottles.
    List,
}

#[derive(Debug, Parser)]
pub struct AgaroseBottleAddArgs {
    /// Bottle id.
    pub id: String,

    #[arg(long = "source-number")]
    pub source_number: String,

    #[arg(long = "manufacturer")]
    pub manufacturer: String,

    /// Date received (YYYYMMDD or YYYY-MM-DD).
    #[arg(long = "received")]
    pub date_received: LabDate,

    /// Expiration date (YYYYMMDD or YYYY-MM-DD).
    #[arg(long = "expires")]
    pub expiration_date: LabDate,

    #[arg(long = "location")]
    pub storage_location: String,

    #[arg(long = "notes")]
    pub notes: Option<String>,
}

#[derive(Debug, Parser)]
pub struct SolutionCli {
    #[command(subcommand)]
    pub command: SolutionSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum SolutionSubcommand {
    /// Prepare a solution from an agarose bottle and fish water.
    Prepare(SolutionPrepareArgs),
    /// List solutions.
    List,
    /// Show one solution.
    Show {
        /// Solution id (e.g. AGSOL_20250314).
        id: String,
    },
}

#[derive(Debug, Parser)]
pub struct SolutionPrepareArgs {
    /// Agarose bottle id.
    #[arg(long = "bottle")]
    pub agarose_bottle_id: String,

    /// Fish water batch or filtered water id.
    #[arg(long = "water")]
    pub fish_water_batch_id: String,

    /// Concentration as a fraction (0.02 = 2%).
    #[arg(long = "concentration", default_value_t = 0.02)]
    pub concentration: f64,

    /// Volume prepared, in mL.
    #[arg(long = "volume", default_value_t = 100.0)]
    pub volume_ml: f64,

    #[arg(long = "prepared-by")]
    pub prepared_by: Option<String>,

    #[arg(long = "notes")]
    pub notes: Option<String>,
}

impl AgaroseCli {
    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        match self.command {
            AgaroseSubcommand::Bottle(cli) => match cli.command {
                AgaroseBottleSubcommand::Add(args) => cmd_agarose_bottle_add(ctx, args),
                AgaroseBottleSubcommand::List => cmd_agarose_bottle_list(ctx),
            },
            AgaroseSubcommand::Solution(cli) => match cli.command {
                SolutionSubcommand::Prepare(args) => cmd_solution_prepare(ctx, args),
                SolutionSubcommand::List => cmd_solution_list(ctx),
                SolutionSubcommand::Show { id } => cmd_solution_show(ctx, &id),
            },
        }
    }
}

fn cmd_agarose_bottle_add(ctx: &Context, args: AgaroseBottleAddArgs) -> anyhow::Result<()> {
    let bottle = AgaroseBottle {
        source_number: args.source_number,
        manufacturer: args.manufacturer,
        date_received: args.date_received,
        expiration_date: args.expiration_date,
        storage_location: args.storage_location,
        notes: args.notes,
    };
    let id = args.id.trim().to_string();
    ctx.lab.add_agarose_bottle(&id, bottle.clone())?;
    if ctx.json {
        return output::print_records(&[(id, bottle)]);
    }
    println!("Added agarose bottle {id}");
    Ok(())
}

fn cmd_agarose_bottle_list(ctx: &Context) -> anyhow::Result<()> {
    let bottles = ctx.lab.agarose_bottles()?;
    if ctx.json {
        return output::print_records(&bottles);
    }
    if bottles.is_empty() {
        println!("No agarose bottles");
    }
    for (id, b) in &bottles {
        println!(
            "{id:<16} {:<12} {:<14} received {} expires {} @ {}",
            b.source_number, b.manufacturer, b.date_received, b.expiration_date, b.storage_location
        );
    }
    Ok(())
}

fn cmd_solution_prepare(ctx: &Context, args: SolutionPrepareArgs) -> anyhow::Result<()> {
    let request = SolutionRequest {
        concentration: args.concentration,
        agarose_bottle_id: args.agarose_bottle_id,
        fish_water_batch_id: args.fish_water_batch_id,
        volume_ml: args.volume_ml,
        prepared_by: args.prepared_by,
        notes: args.notes,
    };
    let (id, solution) = ctx.lab.prepare_agarose_solution(&request)?;
    if ctx.json {
        return output::print_records(&[(id, solution)]);
    }
    println!(
        "Prepared {id}: {}% agarose, {} mL, expires {}",
        solution.concentration * 100.0,
        solution.volume_prepared_ml,
        solution
            .storage
            .expiration
            .map_or_else(|| "-".to_string(), |d| d.to_string())
    );
    Ok(())
}

fn cmd_solution_list(ctx: &Context) -> anyhow::Result<()> {
    let solutions = ctx.lab.agarose_solutions()?;
    if ctx.json {
        return output::print_records(&solutions);
    }
    if solutions.is_empty() {
        println!("No agarose solutions");
    }
    for (id, s) in &solutions {
        println!(
            "{id:<20} {:<6} {:>6} mL  bottle {:<12} water {:<20} by {}",
            s.concentration, s.volume_prepared_ml, s.agarose_bottle_id, s.fish_water_batch_id, s.prepared_by
        );
    }
    Ok(())
}

fn cmd_solution_show(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let solution = ctx.lab.agarose_solution(id)?;
    if ctx.json {
        return output::print_json(&solution);
    }
    println!("id:            {id}");
    println!("concentration: {}", solution.concentration);
    println!("prepared:      {} by {}", solution.date_prepared, solution.prepared_by);
    println!("bottle:        {}", solution.agarose_bottle_id);
    println!("water:         {}", solution.fish_water_batch_id);
    println!("volume:        {} mL", solution.volume_prepared_ml);
    println!(
        "storage:       {} ({})",
        solution.storage.location,
        opt(solution.storage.container.as_deref())
    );
    if let Some(expiration) = solution.storage.expiration {
        println!("expires:       {expiration}");
    }
    println!("inspection:    {}", solution.quality_checks.visual_inspection);
    println!("notes:         {}", opt(solution.notes.as_deref()));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Fish water
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
pub struct WaterCli {
    #[command(subcommand)]
    pub command: WaterSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum WaterSubcommand {
    /// Batches drawn from the facility system.
    Batch(BatchCli),
    /// Filtered water derived from a batch.
    Filter(FilterCli),
}

#[derive(Debug, Parser)]
pub struct BatchCli {
    #[command(subcommand)]
    pub command: BatchSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum BatchSubcommand {
    /// Register a batch.
    Add(BatchAddArgs),
    /// List batches.
    List,
}

#[derive(Debug, Parser)]
pub struct BatchAddArgs {
    /// Batch id.
    pub id: String,

    /// Preparation date (YYYYMMDD or YYYY-MM-DD). Defaults to today.
    #[arg(long = "date")]
    pub date: Option<String>,

    #[arg(long = "notes")]
    pub notes: Option<String>,
}

#[derive(Debug, Parser)]
pub struct FilterCli {
    #[command(subcommand)]
    pub command: FilterSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum FilterSubcommand {
    /// Filter water from a batch.
    Add(FilterAddArgs),
    /// List filtered water.
    List,
}

#[derive(Debug, Parser)]
pub struct FilterAddArgs {
    /// Source batch id.
    #[arg(long = "source")]
    pub source_batch_id: String,

    /// Volume prepared, in mL.
    #[arg(long = "volume", default_value_t = 250.0)]
    pub volume_ml: f64,

    /// Filter pore size in micrometers.
    #[arg(long = "filter-size", default_value_t = 20)]
    pub filter_size_um: u32,

    #[arg(long = "prepared-by")]
    pub prepared_by: Option<String>,

    #[arg(long = "notes")]
    pub notes: Option<String>,
}

impl WaterCli {
    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        match self.command {
            WaterSubcommand::Batch(cli) => match cli.command {
                BatchSubcommand::Add(args) => cmd_batch_add(ctx, &args),
                BatchSubcommand::List => cmd_batch_list(ctx),
            },
            WaterSubcommand::Filter(cli) => match cli.command {
                FilterSubcommand::Add(args) => cmd_filter_add(ctx, args),
                FilterSubcommand::List => cmd_filter_list(ctx),
            },
        }
    }
}

fn cmd_batch_add(ctx: &Context, args: &BatchAddArgs) -> anyhow::Result<()> {
    let date = match &args.date {
        Some(date) => date.clone(),
        None => ctx.lab.today().to_string(),
    };
    let batch = ctx
        .lab
        .add_fish_water_batch(&args.id, &date, args.notes.as_deref())?;
    let id = args.id.trim().to_string();
    if ctx.json {
        return output::print_records(&[(id, batch)]);
    }
    println!("Added fish water batch {id} ({})", batch.preparation_date);
    Ok(())
}

fn cmd_batch_list(ctx: &Context) -> anyhow::Result<()> {
    let batches = ctx.lab.fish_water_batches()?;
    if ctx.json {
        return output::print_records(&batches);
    }
    if batches.is_empty() {
        println!("No fish water batches");
    }
    for (id, b) in &batches {
        println!(
            "{id:<16} {} {:<16} {}",
            b.preparation_date,
            b.source,
            opt(b.notes.as_deref())
        );
    }
    Ok(())
}

fn cmd_filter_add(ctx: &Context, args: FilterAddArgs) -> anyhow::Result<()> {
    let request = FilterRequest {
        source_batch_id: args.source_batch_id,
        volume_ml: args.volume_ml,
        filter_size_um: args.filter_size_um,
        prepared_by: args.prepared_by,
        notes: args.notes,
    };
    let (id, derivative) = ctx.lab.add_filtered_water(&request)?;
    if ctx.json {
        return output::print_records(&[(id, derivative)]);
    }
    println!(
        "Filtered {id}: {} mL from {} through {}",
        derivative.volume_prepared_ml, derivative.source_batch_id, derivative.processing.filter_size
    );
    Ok(())
}

fn cmd_filter_list(ctx: &Context) -> anyhow::Result<()> {
    let waters = ctx.lab.filtered_waters()?;
    if ctx.json {
        return output::print_records(&waters);
    }
    if waters.is_empty() {
        println!("No filtered water");
    }
    for (id, w) in &waters {
        println!(
            "{id:<24} {} from {:<12} {:>6} mL {:<6} by {}",
            w.date_prepared,
            w.source_batch_id,
            w.volume_prepared_ml,
            w.processing.filter_size,
            w.prepared_by
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Poly-L-serine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
pub struct PlsCli {
    #[command(subcommand)]
    pub command: PlsSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum PlsSubcommand {
    /// Poly-L-serine stock bottles.
    Bottle(PlsBottleCli),
    /// Aliquots split off a bottle.
    Aliquot(AliquotCli),
}

#[derive(Debug, Parser)]
pub struct PlsBottleCli {
    #[command(subcommand)]
    pub command: PlsBottleSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum PlsBottleSubcommand {
    /// Register a bottle.
    Add(PlsBottleAddArgs),
    /// List bottles.
    List,
}

#[derive(Debug, Parser)]
pub struct PlsBottleAddArgs {
    /// Bottle id.
    pub id: String,

    #[arg(long = "manufacturer")]
    pub manufacturer: String,

    /// Date received (YYYYMMDD or YYYY-MM-DD).
    #[arg(long = "received")]
    pub date_received: Option<LabDate>,

    /// Expiration date (YYYYMMDD or YYYY-MM-DD).
    #[arg(long = "expires")]
    pub expiration_date: LabDate,

    #[arg(long = "location")]
    pub storage_location: String,

    #[arg(long = "notes")]
    pub notes: Option<String>,
}

#[derive(Debug, Parser)]
pub struct AliquotCli {
    #[command(subcommand)]
    pub command: AliquotSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum AliquotSubcommand {
    /// Split an aliquot off a bottle.
    Add(AliquotAddArgs),
    /// List aliquots.
    List,
}

#[derive(Debug, Parser)]
pub struct AliquotAddArgs {
    /// Source bottle id.
    #[arg(long = "bottle")]
    pub source_bottle_id: String,

    /// Volume of the aliquot.
    #[arg(long = "volume", default_value_t = 50.0)]
    pub volume: f64,

    #[arg(long = "prepared-by")]
    pub prepared_by: Option<String>,

    #[arg(long = "notes")]
    pub notes: Option<String>,
}

impl PlsCli {
    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        match self.command {
            PlsSubcommand::Bottle(cli) => match cli.command {
                PlsBottleSubcommand::Add(args) => cmd_pls_bottle_add(ctx, args),
                PlsBottleSubcommand::List => cmd_pls_bottle_list(ctx),
            },
            PlsSubcommand::Aliquot(cli) => match cli.command {
                AliquotSubcommand::Add(args) => cmd_aliquot_add(ctx, args),
                AliquotSubcommand::List => cmd_aliquot_list(ctx),
            },
        }
    }
}

fn cmd_pls_bottle_add(ctx: &Context, args: PlsBottleAddArgs) -> anyhow::Result<()> {
    let bottle = PolyLSerineBottle {
        manufacturer: args.manufacturer,
        date_received: args.date_received,
        expiration_date: args.expiration_date,
        storage_location: args.storage_location,
        notes: args.notes,
    };
    let id = args.id.trim().to_string();
    ctx.lab.add_pls_bottle(&id, bottle.clone())?;
    if ctx.json {
        return output::print_records(&[(id, bottle)]);
    }
    println!("Added poly-l-serine bottle {id}");
    Ok(())
}

fn cmd_pls_bottle_list(ctx: &Context) -> anyhow::Result<()> {
    let bottles = ctx.lab.pls_bottles()?;
    if ctx.json {
        return output::print_records(&bottles);
    }
    if bottles.is_empty() {
        println!("No poly-l-serine bottles");
    }
    for (id, b) in &bottles {
        let received = b.date_received.map(|d| d.to_string());
        println!(
            "{id:<16} {:<14} received {} expires {} @ {}",
            b.manufacturer,
            opt(received.as_deref()),
            b.expiration_date,
            b.storage_location
        );
    }
    Ok(())
}

fn cmd_aliquot_add(ctx: &Context, args: AliquotAddArgs) -> anyhow::Result<()> {
    let request = AliquotRequest {
        source_bottle_id: args.source_bottle_id,
        volume: args.volume,
        prepared_by: args.prepared_by,
        notes: args.notes,
    };
    let (id, aliquot) = ctx.lab.add_pls_aliquot(&request)?;
    if ctx.json {
        return output::print_records(&[(id, aliquot)]);
    }
    let expires = aliquot.storage.expiration_date.map(|d| d.to_string());
    println!(
        "Aliquoted {id}: {} from {}, expires {}",
        aliquot.volume_prepared,
        aliquot.source_bottle_id,
        opt(expires.as_deref())
    );
    Ok(())
}

fn cmd_aliquot_list(ctx: &Context) -> anyhow::Result<()> {
    let aliquots = ctx.lab.pls_aliquots()?;
    if ctx.json {
        return output::print_records(&aliquots);
    }
    if aliquots.is_empty() {
        println!("No poly-l-serine aliquots");
    }
    for (id, a) in &aliquots {
        println!(
            "{id:<24} {} from {:<12} {:>6} @ {} by {}",
            a.date_prepared,
            a.source_bottle_id,
            a.volume_prepared,
            a.storage.location,
            a.prepared_by
        );
    }
    Ok(())
}
