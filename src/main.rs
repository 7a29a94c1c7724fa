mod cbs;
mod cmd;
mod core;
mod input;
mod report;

use clap::{Parser, Subcommand};
use cmd::{compute::ComputeCommand, cpi::CpiCommand, sale::SaleCommand, schema::SchemaCommand};

#[derive(Parser, Debug)]
#[command(version, author, about = "Israeli Capital Gains Tax calculator for employee stock sales")]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute every consumption/sale pair in a directory
    Compute(ComputeCommand),
    /// Compute a single sale from explicit files
    Sale(SaleCommand),
    /// Show or download the CPI table, or the adjustment factor between two dates
    Cpi(CpiCommand),
    /// Print expected input formats
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let opts = Opts::parse();
    match opts.command {
        Command::Compute(compute) => compute.exec(),
        Command::Sale(sale) => sale.exec(),
        Command::Cpi(cpi) => cpi.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
