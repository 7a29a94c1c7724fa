pub mod compute;
pub mod cpi;
pub mod display;
pub mod sale;
pub mod schema;

use crate::core::{
    CpiConvention, CpiTable, EngineOptions, TaxPolicy, DEFAULT_QUANTITY_TOLERANCE, DEFAULT_TAX_RATE,
};
use anyhow::Context;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Options shared by every command that runs the engine
#[derive(Args, Debug)]
pub struct EngineArgs {
    /// CSV file of monthly CPI values (columns: period,value)
    #[arg(short, long)]
    cpi: PathBuf,

    /// Tax rate applied to real gains
    #[arg(short, long, default_value_t = DEFAULT_TAX_RATE)]
    tax_rate: Decimal,

    /// Which monthly index applies to a date
    #[arg(long, value_enum, default_value_t = CpiConventionArg::Preceding)]
    cpi_convention: CpiConventionArg,

    /// Allowed difference between lot quantities and the sale quantity
    #[arg(long, default_value_t = DEFAULT_QUANTITY_TOLERANCE)]
    tolerance: Decimal,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum CpiConventionArg {
    /// Index of the month before the date (the index known at the date)
    #[default]
    Preceding,
    /// Index of the date's own month
    SameMonth,
}

impl From<CpiConventionArg> for CpiConvention {
    fn from(arg: CpiConventionArg) -> Self {
        match arg {
            CpiConventionArg::Preceding => CpiConvention::Preceding,
            CpiConventionArg::SameMonth => CpiConvention::SameMonth,
        }
    }
}

impl EngineArgs {
    pub fn cpi_table(&self) -> anyhow::Result<CpiTable> {
        read_cpi(&self.cpi)
    }

    pub fn convention(&self) -> CpiConvention {
        self.cpi_convention.into()
    }

    pub fn options(&self) -> anyhow::Result<EngineOptions> {
        let policy = TaxPolicy::flat(self.tax_rate)
            .with_context(|| format!("tax rate must be between 0 and 1, got {}", self.tax_rate))?;
        if self.tolerance < Decimal::ZERO {
            anyhow::bail!("tolerance must not be negative, got {}", self.tolerance);
        }
        Ok(EngineOptions {
            policy,
            tolerance: self.tolerance,
        })
    }
}

pub fn read_cpi(path: &Path) -> anyhow::Result<CpiTable> {
    let file = File::open(path).with_context(|| format!("opening CPI file {}", path.display()))?;
    let table = CpiTable::read_csv(BufReader::new(file))
        .with_context(|| format!("reading CPI file {}", path.display()))?;
    if table.is_empty() {
        anyhow::bail!("CPI file {} has no values", path.display());
    }
    Ok(table)
}
