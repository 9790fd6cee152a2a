//! Revenue Proration CLI
//!
//! Prorates a line-item CSV into monthly allocations, or prints period
//! summaries of the resulting revenue.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use revenue_proration::aggregate::{
    category_totals, filter_by_category, fiscal_quarter_totals, fiscal_year_totals, monthly_totals,
    sum_allocations,
};
use revenue_proration::item::load_line_items;
use revenue_proration::proration::AllocationSummary;
use revenue_proration::{
    AllocationStore, FiscalCalendar, MonthlyAllocation, ProductType, ProrationConfig,
    ProrationEngine, RemainderPolicy,
};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Period {
    Month,
    Quarter,
    Year,
}

#[derive(Args, Debug)]
struct ProrationArgs {
    /// Round monthly amounts to this many decimal places (0 for JPY)
    #[arg(long)]
    scale: Option<u32>,

    /// Leave rounding drift in place instead of adjusting the final month
    #[arg(long)]
    no_reconcile: bool,
}

impl ProrationArgs {
    fn config(&self) -> ProrationConfig {
        ProrationConfig {
            remainder: if self.no_reconcile {
                RemainderPolicy::None
            } else {
                RemainderPolicy::LastMonth
            },
            amount_scale: self.scale,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the monthly allocations of every line item
    Prorate {
        /// Line-item CSV (id,productName,type,startDate,endDate,amount)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        #[command(flatten)]
        proration: ProrationArgs,
    },

    /// Print revenue totals per period
    Summary {
        /// Line-item CSV (id,productName,type,startDate,endDate,amount)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = Period::Month)]
        by: Period,

        /// Only count LICENSE or SERVICE allocations
        #[arg(long)]
        category: Option<ProductType>,

        /// First month of the fiscal year
        #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(u32).range(1..=12))]
        fiscal_start: u32,

        #[command(flatten)]
        proration: ProrationArgs,
    },
}

#[derive(Parser, Debug)]
#[command(name = "revenue_proration", version, about = "Monthly revenue proration for contract line items")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Prorate { input, output, format, proration } => {
            let allocations = prorate_file(&input, proration.config())?;

            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    File::create(path).with_context(|| format!("creating {}", path.display()))?,
                ),
                None => Box::new(io::stdout()),
            };
            write_allocations(writer, &allocations, format)?;

            if let Some(path) = output {
                log::info!("wrote {} allocations to {}", allocations.len(), path.display());
            }
        }
        Command::Summary { input, by, category, fiscal_start, proration } => {
            let allocations = prorate_file(&input, proration.config())?;
            let selected: Vec<&MonthlyAllocation> = match category {
                Some(c) => filter_by_category(&allocations, c),
                None => allocations.iter().collect(),
            };
            print_summary(&selected, by, &FiscalCalendar::new(fiscal_start)?)?;
        }
    }

    Ok(())
}

fn prorate_file(input: &Path, config: ProrationConfig) -> anyhow::Result<Vec<MonthlyAllocation>> {
    let items = load_line_items(input)
        .with_context(|| format!("loading line items from {}", input.display()))?;
    log::info!("loaded {} line items from {}", items.len(), input.display());

    let store = AllocationStore::new(ProrationEngine::new(config));
    store.regenerate_all(&items).context("prorating line items")?;
    Ok(store.all())
}

fn write_allocations<W: Write>(
    writer: W,
    allocations: &[MonthlyAllocation],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(writer);
            for alloc in allocations {
                csv_writer.serialize(alloc)?;
            }
            csv_writer.flush()?;
        }
        OutputFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, allocations)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn print_summary(
    allocations: &[&MonthlyAllocation],
    by: Period,
    calendar: &FiscalCalendar,
) -> anyhow::Result<()> {
    let rows: Vec<(String, Decimal)> = match by {
        Period::Month => monthly_totals(allocations.iter().copied())?
            .into_iter()
            .map(|(ym, total)| (ym.to_string(), total))
            .collect(),
        Period::Quarter => fiscal_quarter_totals(allocations.iter().copied(), calendar)?
            .into_iter()
            .map(|(q, total)| (q.to_string(), total))
            .collect(),
        Period::Year => fiscal_year_totals(allocations.iter().copied(), calendar)?
            .into_iter()
            .map(|(fy, total)| (format!("FY{}", fy), total))
            .collect(),
    };

    println!("{:<12} {:>20}", "Period", "Revenue");
    println!("{}", "-".repeat(33));
    for (period, total) in &rows {
        println!("{:<12} {:>20}", period, total.round_dp(2));
    }
    println!("{}", "-".repeat(33));

    let summary = AllocationSummary::from_allocations(allocations.iter().copied())?;
    for (category, total) in category_totals(allocations.iter().copied())? {
        println!("{:<12} {:>20}", category, total.round_dp(2));
    }
    println!("{:<12} {:>20}", "Total", sum_allocations(allocations.iter().copied())?.round_dp(2));
    println!("\n{} allocations, {} applied days", summary.record_count, summary.applied_days);
    Ok(())
}
