//! Console rendering of sale reports

use crate::core::{BatchReport, LotResult, SaleOutcome, SaleReport, TaxError};
use crate::report::money;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Debug, Clone, Tabled)]
pub struct LotRow {
    #[tabled(rename = "#")]
    pub lot: String,
    #[tabled(rename = "Acquired")]
    pub acquired: String,
    #[tabled(rename = "Quantity")]
    pub quantity: String,
    #[tabled(rename = "Price")]
    pub price: String,
    #[tabled(rename = "CPI")]
    pub cpi: String,
    #[tabled(rename = "Factor")]
    pub factor: String,
    #[tabled(rename = "Adj. Cost")]
    pub adjusted_cost: String,
    #[tabled(rename = "Proceeds")]
    pub proceeds: String,
    #[tabled(rename = "Fees")]
    pub fees: String,
    #[tabled(rename = "Real Gain")]
    pub real_gain: String,
    #[tabled(rename = "Tax")]
    pub tax: String,
}

impl From<&LotResult> for LotRow {
    fn from(l: &LotResult) -> Self {
        LotRow {
            lot: format!("#{}", l.index + 1),
            acquired: l.acquisition_date.format("%Y-%m-%d").to_string(),
            quantity: format_quantity(l.quantity),
            price: format_ils(l.acquisition_price),
            cpi: format!("{} → {}", l.cpi_from, l.cpi_to),
            factor: format!("{:.4}", l.adjustment_factor),
            adjusted_cost: format_ils(l.adjusted_cost_basis),
            proceeds: format_ils(l.proceeds_share),
            fees: format_ils(l.fee_share),
            real_gain: format_ils_signed(l.real_gain),
            tax: format_ils(l.tax_owed),
        }
    }
}

pub fn print_sale(outcome: &SaleOutcome, report: &SaleReport) {
    let s = &report.summary;
    println!();
    println!(
        "SALE {} (settled {}) - {}",
        outcome.key,
        s.sale_date.format("%Y-%m-%d"),
        outcome.sources.join(", ")
    );

    let rows: Vec<LotRow> = report.lots.iter().map(LotRow::from).collect();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    println!(
        "  Quantity: {} @ {} | Proceeds: {} | Adjusted cost: {}",
        format_quantity(s.total_quantity),
        format_ils(s.sale_price_per_unit),
        format_ils(s.nominal_proceeds),
        format_ils(s.total_adjusted_cost)
    );
    println!(
        "  Real gain: {} | Tax owed: {} | Fees: {} | Net: {}",
        format_ils_signed(s.total_real_gain),
        format_ils(s.total_tax_owed),
        format_ils(s.total_fees),
        format_ils_signed(s.net_proceeds)
    );
}

pub fn print_failure(outcome: &SaleOutcome, error: &TaxError) {
    println!();
    println!("SALE {} FAILED [{}] - {}", outcome.key, error.kind(), outcome.sources.join(", "));
    println!("  {}", error);
}

pub fn print_batch_totals(batch: &BatchReport) {
    let computed = batch.outcomes.len() - batch.failure_count();
    println!();
    println!("TOTALS ({} of {} sales computed)", computed, batch.outcomes.len());
    println!(
        "  Real gain: {} | Tax owed: {} | Fees: {}",
        format_ils_signed(batch.total_real_gain()),
        format_ils(batch.total_tax_owed()),
        format_ils(batch.total_fees())
    );
    if batch.failure_count() > 0 {
        println!("  \u{26A0} {} sale(s) failed, see above", batch.failure_count());
    }
}

/// JSON view of a batch run
#[derive(Debug, Serialize)]
pub struct BatchJson<'a> {
    pub sales: Vec<SaleJson<'a>>,
    pub total_real_gain: String,
    pub total_tax_owed: String,
    pub total_fees: String,
    pub failures: usize,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaleJson<'a> {
    Computed {
        key: &'a str,
        sources: &'a [String],
        report: &'a SaleReport,
    },
    Failed {
        key: &'a str,
        sources: &'a [String],
        error: &'static str,
        message: String,
    },
}

impl<'a> From<&'a BatchReport> for BatchJson<'a> {
    fn from(batch: &'a BatchReport) -> Self {
        let sales = batch
            .outcomes
            .iter()
            .map(|o| match &o.result {
                Ok(report) => SaleJson::Computed {
                    key: &o.key,
                    sources: &o.sources,
                    report,
                },
                Err(e) => SaleJson::Failed {
                    key: &o.key,
                    sources: &o.sources,
                    error: e.kind(),
                    message: e.to_string(),
                },
            })
            .collect();

        BatchJson {
            sales,
            total_real_gain: money(batch.total_real_gain()),
            total_tax_owed: money(batch.total_tax_owed()),
            total_fees: money(batch.total_fees()),
            failures: batch.failure_count(),
        }
    }
}

/// Print a batch as tables or JSON
pub fn print_batch(batch: &BatchReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&BatchJson::from(batch))?);
        return Ok(());
    }

    if batch.outcomes.is_empty() {
        println!("No sales found");
        return Ok(());
    }
    for outcome in &batch.outcomes {
        match &outcome.result {
            Ok(report) => print_sale(outcome, report),
            Err(e) => print_failure(outcome, e),
        }
    }
    print_batch_totals(batch);
    Ok(())
}

pub fn format_ils(amount: Decimal) -> String {
    format!("₪{}", money(amount))
}

pub fn format_ils_signed(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-₪{}", money(amount.abs()))
    } else {
        format_ils(amount)
    }
}

pub fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
