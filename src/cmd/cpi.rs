//! CPI command - inspect the index table and adjustment factors, or download the table

use crate::cbs;
use crate::cmd::{read_cpi, CpiConventionArg};
use crate::core::{CpiAdjuster, CpiPeriod, CpiTable};
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct CpiCommand {
    #[command(subcommand)]
    action: CpiAction,
}

#[derive(Subcommand, Debug)]
enum CpiAction {
    /// List the table, or the adjustment factor between two dates
    Show(ShowArgs),
    /// Download monthly CPI values from the Central Bureau of Statistics
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// CSV file of monthly CPI values (columns: period,value)
    #[arg(short, long)]
    cpi: PathBuf,

    /// Acquisition date (YYYY-MM-DD); with --to, prints the adjustment factor
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Sale date (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// Which monthly index applies to a date
    #[arg(long, value_enum, default_value_t = CpiConventionArg::Preceding)]
    cpi_convention: CpiConventionArg,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// First period (YYYY-MM)
    #[arg(long)]
    from: CpiPeriod,

    /// Last period (YYYY-MM)
    #[arg(long)]
    to: CpiPeriod,

    /// Write the period,value CSV here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Tabled, Serialize)]
struct CpiRow {
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Index")]
    value: String,
}

impl CpiCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match &self.action {
            CpiAction::Show(show) => show.exec(),
            CpiAction::Fetch(fetch) => fetch.exec(),
        }
    }
}

impl FetchArgs {
    fn exec(&self) -> anyhow::Result<()> {
        if self.from > self.to {
            anyhow::bail!("--from {} is after --to {}", self.from, self.to);
        }
        let table = cbs::fetch_cpi(self.from, self.to)?;

        match &self.output {
            Some(path) => {
                let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
                table.write_csv(BufWriter::new(file))?;
                println!("Wrote {} CPI periods to {}", table.len(), path.display());
            }
            None => table.write_csv(std::io::stdout().lock())?,
        }
        Ok(())
    }
}

impl ShowArgs {
    fn exec(&self) -> anyhow::Result<()> {
        let table = read_cpi(&self.cpi)?;
        match (self.from, self.to) {
            (Some(from), Some(to)) => self.print_adjustment(&table, from, to),
            _ => self.print_table(&table),
        }
    }

    fn print_adjustment(&self, table: &CpiTable, from: NaiveDate, to: NaiveDate) -> anyhow::Result<()> {
        let adjuster = CpiAdjuster::new(table, self.cpi_convention.into());
        let adjustment = adjuster.adjustment(from, to)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&adjustment)?);
            return Ok(());
        }

        println!(
            "{} ({}) \u{2192} {} ({})",
            from, adjustment.from_period, to, adjustment.to_period
        );
        println!("Adjustment factor: {}", adjustment.factor.round_dp(6));
        Ok(())
    }

    fn print_table(&self, table: &CpiTable) -> anyhow::Result<()> {
        let rows: Vec<CpiRow> = table
            .iter()
            .map(|(period, value)| CpiRow {
                period: period.to_string(),
                value: value.normalize().to_string(),
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        Ok(())
    }
}
