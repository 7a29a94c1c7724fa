//! Consumer Price Index lookups and the inflation adjustment factor

use super::error::TaxError;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// A monthly CPI publication period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CpiPeriod {
    year: i32,
    month: u32,
}

impl CpiPeriod {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(CpiPeriod { year, month })
    }

    /// The period a calendar date falls in
    pub fn of(date: NaiveDate) -> Self {
        CpiPeriod {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            CpiPeriod {
                year: self.year - 1,
                month: 12,
            }
        } else {
            CpiPeriod {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for CpiPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for CpiPeriod {
    type Err = String;

    /// Accepts `2025-07`, `2025-07-01` and the SDMX style `2025M07`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (year, rest) = s
            .split_once('-')
            .or_else(|| s.split_once('M'))
            .ok_or_else(|| format!("invalid CPI period '{}'", s))?;
        let month = rest.split('-').next().unwrap_or_default();
        let year = year
            .parse::<i32>()
            .map_err(|_| format!("invalid year in CPI period '{}'", s))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| format!("invalid month in CPI period '{}'", s))?;
        CpiPeriod::new(year, month).ok_or_else(|| format!("month out of range in CPI period '{}'", s))
    }
}

impl TryFrom<String> for CpiPeriod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CpiPeriod> for String {
    fn from(period: CpiPeriod) -> Self {
        period.to_string()
    }
}

/// Which monthly index applies to a given date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CpiConvention {
    /// The index known at the date: the previous month's publication
    #[default]
    Preceding,
    /// The index of the date's own month
    SameMonth,
}

impl CpiConvention {
    pub fn period_for(&self, date: NaiveDate) -> CpiPeriod {
        match self {
            CpiConvention::Preceding => CpiPeriod::of(date).previous(),
            CpiConvention::SameMonth => CpiPeriod::of(date),
        }
    }
}

/// Read-only source of published index values
pub trait CpiSource {
    fn index(&self, period: CpiPeriod) -> Option<Decimal>;
}

/// In-memory CPI table keyed by month
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpiTable {
    values: BTreeMap<CpiPeriod, Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CpiRecord {
    period: String,
    value: Decimal,
}

impl CpiTable {
    pub fn insert(&mut self, period: CpiPeriod, value: Decimal) {
        self.values.insert(period, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CpiPeriod, &Decimal)> {
        self.values.iter()
    }

    /// Read a `period,value` CSV
    pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<CpiTable> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut table = CpiTable::default();
        for (row, record) in rdr.deserialize::<CpiRecord>().enumerate() {
            let record = record?;
            let period: CpiPeriod = record
                .period
                .parse()
                .map_err(|e: String| anyhow::anyhow!("CPI row {}: {}", row + 1, e))?;
            if table.values.insert(period, record.value).is_some() {
                anyhow::bail!("CPI row {}: duplicate period {}", row + 1, period);
            }
        }
        log::debug!("Loaded {} CPI periods", table.len());
        Ok(table)
    }

    /// Write the `period,value` CSV that `read_csv` reads
    pub fn write_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for (period, value) in &self.values {
            wtr.serialize(CpiRecord {
                period: period.to_string(),
                value: *value,
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl FromIterator<(CpiPeriod, Decimal)> for CpiTable {
    fn from_iter<T: IntoIterator<Item = (CpiPeriod, Decimal)>>(iter: T) -> Self {
        CpiTable {
            values: iter.into_iter().collect(),
        }
    }
}

impl CpiSource for CpiTable {
    fn index(&self, period: CpiPeriod) -> Option<Decimal> {
        self.values.get(&period).copied()
    }
}

/// Inflation adjustment between two dates, with the periods used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Adjustment {
    pub from_period: CpiPeriod,
    pub to_period: CpiPeriod,
    pub factor: Decimal,
}

/// Computes `CPI(to) / CPI(from)` against an explicit index source
pub struct CpiAdjuster<'a, S: CpiSource + ?Sized> {
    source: &'a S,
    convention: CpiConvention,
}

impl<'a, S: CpiSource + ?Sized> CpiAdjuster<'a, S> {
    pub fn new(source: &'a S, convention: CpiConvention) -> Self {
        CpiAdjuster { source, convention }
    }

    pub fn convention(&self) -> CpiConvention {
        self.convention
    }

    pub fn adjustment(&self, from: NaiveDate, to: NaiveDate) -> Result<Adjustment, TaxError> {
        let from_period = self.convention.period_for(from);
        let to_period = self.convention.period_for(to);

        if from_period == to_period {
            return Ok(Adjustment {
                from_period,
                to_period,
                factor: Decimal::ONE,
            });
        }

        let from_index = self.lookup(from_period)?;
        let to_index = self.lookup(to_period)?;
        let factor = to_index
            .checked_div(from_index)
            .ok_or_else(|| TaxError::invalid_index(from_period, from_index))?;
        log::trace!(
            "CPI {} = {}, CPI {} = {}, factor = {}",
            from_period,
            from_index,
            to_period,
            to_index,
            factor
        );

        Ok(Adjustment {
            from_period,
            to_period,
            factor,
        })
    }

    pub fn factor(&self, from: NaiveDate, to: NaiveDate) -> Result<Decimal, TaxError> {
        self.adjustment(from, to).map(|a| a.factor)
    }

    fn lookup(&self, period: CpiPeriod) -> Result<Decimal, TaxError> {
        match self.source.index(period) {
            Some(value) if value > Decimal::ZERO => Ok(value),
            Some(value) => Err(TaxError::invalid_index(period, value)),
            None => Err(TaxError::missing_index(period)),
        }
    }
}
