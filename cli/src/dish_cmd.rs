//! Fish dish subcommands.

use clap::{Parser, Subcommand};
use labinv_model::{
    CheckEntry, CheckTime, DishQuery, DishStatus, FishDish, LabDate, NewDish, QualityCheck, Sex,
    SortKey, StatusFilter,
};
use serde::Serialize;

use crate::Context;
use crate::output::{self, opt};

#[derive(Debug, Parser)]
pub struct DishCli {
    #[command(subcommand)]
    pub command: DishSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum DishSubcommand {
    /// Create a dish; its id is `{cross}_{number}`.
    Create(DishCreateArgs),
    /// Show one dish with its quality checks.
    Show {
        /// Dish id (e.g. CR7_2).
        id: String,
    },
    /// List, search and sort dishes.
    List(DishListArgs),
    /// Record a quality check.
    Check(DishCheckArgs),
    /// Set a dish active or inactive.
    Status(DishStatusArgs),
    /// Mark a dish inactive with a reason.
    Terminate(DishTerminateArgs),
}

#[derive(Debug, Parser)]
pub struct DishCreateArgs {
    #[arg(long = "cross")]
    pub cross_id: String,

    #[arg(long = "number", short = 'n', default_value_t = 1)]
    pub dish_number: u32,

    #[arg(long = "genotype")]
    pub genotype: String,

    #[arg(long = "responsible")]
    pub responsible: String,

    /// Date of fertilization. Defaults to today.
    #[arg(long = "dof")]
    pub dof: Option<LabDate>,

    /// M, F or unknown.
    #[arg(long = "sex", default_value = "unknown")]
    pub sex: Sex,

    #[arg(long = "species")]
    pub species: Option<String>,

    #[arg(long = "count", default_value_t = 1)]
    pub fish_count: u32,

    /// Parent id; repeat for each parent.
    #[arg(long = "parent")]
    pub parents: Vec<String>,

    /// Water temperature in °C.
    #[arg(long = "temperature", default_value_t = 28.5)]
    pub temperature: f64,

    #[arg(long = "light-duration", default_value = "14:10")]
    pub light_duration: String,

    #[arg(long = "dawn-dusk", default_value = "8:00")]
    pub dawn_dusk: String,

    #[arg(long = "room", default_value = "2E.282")]
    pub room: String,

    #[arg(long = "in-beaker")]
    pub in_beaker: bool,

    /// Total water volume, in mL.
    #[arg(long = "vol-water-total")]
    pub vol_water_total: Option<f64>,
}

#[derive(Debug, Parser)]
pub struct DishListArgs {
    /// all, active or inactive.
    #[arg(long = "status", default_value = "all")]
    pub status: StatusFilter,

    /// Free text matched against ids, genotype, responsible, room, parents
    /// and check notes.
    #[arg(long = "search", short = 's')]
    pub search: Option<String>,

    #[arg(long = "case-sensitive")]
    pub case_sensitive: bool,

    /// dish_id, date_created, genotype, responsible, status, room,
    /// fish_count or dof.
    #[arg(long = "sort", default_value = "dish_id")]
    pub sort: SortKey,

    #[arg(long = "desc")]
    pub descending: bool,
}

#[derive(Debug, Parser)]
pub struct DishCheckArgs {
    /// Dish id.
    pub id: String,

    /// Check time as YYYYMMDDhh:mm:ss. Defaults to now.
    #[arg(long = "time")]
    pub check_time: Option<CheckTime>,

    #[arg(long = "fed")]
    pub fed: bool,

    #[arg(long = "feed-type", requires = "fed")]
    pub feed_type: Option<String>,

    #[arg(long = "water-changed")]
    pub water_changed: bool,

    /// Volume of water changed, in mL.
    #[arg(long = "vol-water-changed", requires = "water_changed")]
    pub vol_water_changed: Option<f64>,

    /// Fish found dead at this check.
    #[arg(long = "dead", default_value_t = 0)]
    pub num_dead: u32,

    #[arg(long = "notes")]
    pub notes: Option<String>,
}

#[derive(Debug, Parser)]
pub struct DishStatusArgs {
    /// Dish id.
    pub id: String,

    /// active or inactive.
    pub status: DishStatus,

    /// Termination date when deactivating. Defaults to today.
    #[arg(long = "date")]
    pub date: Option<LabDate>,

    #[arg(long = "reason")]
    pub reason: Option<String>,
}

#[derive(Debug, Parser)]
pub struct DishTerminateArgs {
    /// Dish id.
    pub id: String,

    #[arg(long = "reason")]
    pub reason: String,

    /// Defaults to today.
    #[arg(long = "date")]
    pub date: Option<LabDate>,
}

impl DishCli {
    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        match self.command {
            DishSubcommand::Create(args) => cmd_create(ctx, args),
            DishSubcommand::Show { id } => cmd_show(ctx, &id),
            DishSubcommand::List(args) => cmd_list(ctx, args),
            DishSubcommand::Check(args) => cmd_check(ctx, args),
            DishSubcommand::Status(args) => {
                let dish = ctx.lab.update_dish_status(
                    &args.id,
                    args.status,
                    args.date,
                    args.reason.as_deref(),
                )?;
                print_status_change(ctx, &dish)
            }
            DishSubcommand::Terminate(args) => {
                let dish = ctx.lab.terminate_dish(&args.id, &args.reason, args.date)?;
                print_status_change(ctx, &dish)
            }
        }
    }
}

fn cmd_create(ctx: &Context, args: DishCreateArgs) -> anyhow::Result<()> {
    let mut new = NewDish::new(args.cross_id, args.dish_number, args.genotype, args.responsible);
    new.dof = args.dof;
    new.sex = args.sex;
    if let Some(species) = args.species {
        new.species = species;
    }
    new.fish_count = args.fish_count;
    new.parents = args.parents;
    new.temperature = args.temperature;
    new.light_duration = args.light_duration;
    new.dawn_dusk = args.dawn_dusk;
    new.room = args.room;
    new.in_beaker = args.in_beaker;
    new.vol_water_total = args.vol_water_total;

    let dish = ctx.lab.create_dish(new)?;
    if ctx.json {
        return output::print_json(&dish);
    }
    println!(
        "Created dish {} ({} fish, dof {}) -> {}",
        dish.dish_id,
        dish.fish_count,
        dish.dof,
        ctx.lab.dish_dir().join(dish.file_name()).display()
    );
    Ok(())
}

fn cmd_show(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let dish = ctx.lab.dish(id)?;
    if ctx.json {
        return output::print_json(&dish);
    }
    println!("dish:        {}", dish.dish_id);
    println!("status:      {}", dish.status);
    if let Some(date) = dish.termination_date {
        println!(
            "terminated:  {date} ({})",
            opt(dish.termination_reason.as_deref())
        );
    }
    println!("cross:       {}", dish.cross_id);
    println!("genotype:    {}", dish.genotype);
    println!("sex:         {}", dish.sex);
    println!("species:     {}", dish.species);
    println!("responsible: {}", dish.responsible);
    println!("created:     {}", dish.date_created);
    println!("dof:         {}", dish.dof);
    println!(
        "fish:        {} alive of {}",
        dish.remaining_fish(),
        dish.fish_count
    );
    if !dish.breeding.parents.is_empty() {
        println!("parents:     {}", dish.breeding.parents.join(", "));
    }
    let enclosure = &dish.enclosure;
    println!(
        "enclosure:   {} °C, light {} / dawn {}, room {}{}",
        enclosure.temperature,
        enclosure.light_cycle.light_duration,
        enclosure.light_cycle.dawn_dusk,
        enclosure.room,
        if enclosure.in_beaker { ", in beaker" } else { "" }
    );
    println!("checks:");
    for (key, entry) in &dish.quality_checks {
        match entry {
            CheckEntry::Record(check) => {
                let mut parts = Vec::new();
                if check.fed {
                    parts.push(format!("fed {}", opt(check.feed_type.as_deref())));
                }
                if check.water_changed {
                    let volume = check.vol_water_changed.map(|v| format!(" {v} mL"));
                    parts.push(format!("water changed{}", volume.unwrap_or_default()));
                }
                if check.num_dead > 0 {
                    parts.push(format!("{} dead", check.num_dead));
                }
                if let Some(notes) = &check.notes {
                    parts.push(notes.clone());
                }
                println!("  {key}  {}", parts.join("; "));
            }
            CheckEntry::Note(note) => println!("  {key}  {note}"),
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ListOutput<'a> {
    dishes: &'a [FishDish],
    skipped: Vec<SkippedOutput>,
}

#[derive(Serialize)]
struct SkippedOutput {
    path: String,
    reason: String,
}

fn cmd_list(ctx: &Context, args: DishListArgs) -> anyhow::Result<()> {
    let query = DishQuery {
        status: args.status,
        search: args.search,
        case_sensitive: args.case_sensitive,
        sort: args.sort,
        descending: args.descending,
    };
    let scan = ctx.lab.dishes(&query)?;

    if ctx.json {
        return output::print_json(&ListOutput {
            dishes: &scan.dishes,
            skipped: scan
                .skipped
                .iter()
                .map(|s| SkippedOutput {
                    path: s.path.display().to_string(),
                    reason: s.reason.clone(),
                })
                .collect(),
        });
    }

    if scan.dishes.is_empty() {
        println!("No dishes");
    }
    for dish in &scan.dishes {
        let last = dish.last_check_date().map(|d| d.to_string());
        println!(
            "{:<14} {:<8} {:<14} {:<12} dof {} {:>4}/{:<4} last check {}",
            dish.dish_id,
            dish.status,
            dish.genotype,
            dish.responsible,
            dish.dof,
            dish.remaining_fish(),
            dish.fish_count,
            opt(last.as_deref())
        );
    }
    for skipped in &scan.skipped {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    Ok(())
}

fn cmd_check(ctx: &Context, args: DishCheckArgs) -> anyhow::Result<()> {
    let check = QualityCheck {
        fed: args.fed,
        feed_type: args.feed_type,
        water_changed: args.water_changed,
        vol_water_changed: args.vol_water_changed,
        num_dead: args.num_dead,
        notes: args.notes,
        ..QualityCheck::at(args.check_time.unwrap_or_else(CheckTime::now))
    };
    let at = check.check_time;
    let dish = ctx.lab.record_quality_check(&args.id, check)?;
    if ctx.json {
        return output::print_json(&dish);
    }
    println!(
        "Recorded check {at} on {}: {} of {} fish remaining",
        dish.dish_id,
        dish.remaining_fish(),
        dish.fish_count
    );
    Ok(())
}

fn print_status_change(ctx: &Context, dish: &FishDish) -> anyhow::Result<()> {
    if ctx.json {
        return output::print_json(dish);
    }
    match dish.termination_date {
        Some(date) => println!(
            "Dish {} is {} since {date} ({})",
            dish.dish_id,
            dish.status,
            opt(dish.termination_reason.as_deref())
        ),
        None => println!("Dish {} is {}", dish.dish_id, dish.status),
    }
    Ok(())
}
