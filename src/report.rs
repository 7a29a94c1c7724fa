//! CSV output: one lot file and one summary file per sale
//!
//! Money is rounded to 2 decimal places here and nowhere earlier, half a
//! cent rounding away from zero as on a tax return.

use crate::core::{LotResult, SaleReport, SaleSummary};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const FACTOR_DP: u32 = 6;

#[derive(Debug, Serialize)]
pub struct LotCsvRecord {
    pub lot: usize,
    pub quantity: String,
    pub acquisition_date: String,
    pub acquisition_price_ils: String,
    pub currency_note: String,
    pub cpi_from: String,
    pub cpi_to: String,
    pub adjustment_factor: String,
    pub adjusted_cost_basis_ils: String,
    pub proceeds_share_ils: String,
    pub fee_share_ils: String,
    pub real_gain_ils: String,
    pub tax_rate: String,
    pub tax_owed_ils: String,
}

impl From<&LotResult> for LotCsvRecord {
    fn from(l: &LotResult) -> Self {
        LotCsvRecord {
            lot: l.index + 1,
            quantity: l.quantity.normalize().to_string(),
            acquisition_date: l.acquisition_date.format("%Y-%m-%d").to_string(),
            acquisition_price_ils: money(l.acquisition_price),
            currency_note: l.currency_note.clone().unwrap_or_default(),
            cpi_from: l.cpi_from.to_string(),
            cpi_to: l.cpi_to.to_string(),
            adjustment_factor: l.adjustment_factor.round_dp(FACTOR_DP).to_string(),
            adjusted_cost_basis_ils: money(l.adjusted_cost_basis),
            proceeds_share_ils: money(l.proceeds_share),
            fee_share_ils: money(l.fee_share),
            real_gain_ils: money(l.real_gain),
            tax_rate: l.tax_rate.normalize().to_string(),
            tax_owed_ils: money(l.tax_owed),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryCsvRecord {
    pub sale_date: String,
    pub lots: usize,
    pub quantity: String,
    pub sale_price_ils: String,
    pub nominal_proceeds_ils: String,
    pub adjusted_cost_ils: String,
    pub total_real_gain_ils: String,
    pub total_tax_owed_ils: String,
    pub total_fees_ils: String,
    pub net_proceeds_ils: String,
}

impl From<&SaleSummary> for SummaryCsvRecord {
    fn from(s: &SaleSummary) -> Self {
        SummaryCsvRecord {
            sale_date: s.sale_date.format("%Y-%m-%d").to_string(),
            lots: s.lot_count,
            quantity: s.total_quantity.normalize().to_string(),
            sale_price_ils: money(s.sale_price_per_unit),
            nominal_proceeds_ils: money(s.nominal_proceeds),
            adjusted_cost_ils: money(s.total_adjusted_cost),
            total_real_gain_ils: money(s.total_real_gain),
            total_tax_owed_ils: money(s.total_tax_owed),
            total_fees_ils: money(s.total_fees),
            net_proceeds_ils: money(s.net_proceeds),
        }
    }
}

/// Output rounding for money
pub fn money(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

pub fn write_csv<I, R, W>(records: I, writer: W) -> anyhow::Result<()>
where
    I: IntoIterator<Item = R>,
    R: Serialize,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records.into_iter() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_lots_csv<W: Write>(report: &SaleReport, writer: W) -> anyhow::Result<()> {
    write_csv(report.lots.iter().map(LotCsvRecord::from), writer)
}

pub fn write_summary_csv<W: Write>(report: &SaleReport, writer: W) -> anyhow::Result<()> {
    write_csv([SummaryCsvRecord::from(&report.summary)], writer)
}

/// Write `<stem>_with_calc.csv` and `<stem>_summary.csv` into `dir`
pub fn write_sale_files(dir: &Path, stem: &str, report: &SaleReport) -> anyhow::Result<Vec<PathBuf>> {
    let lots_path = dir.join(format!("{}_with_calc.csv", stem));
    let summary_path = dir.join(format!("{}_summary.csv", stem));

    write_lots_csv(report, File::create(&lots_path)?)?;
    write_summary_csv(report, File::create(&summary_path)?)?;
    log::info!("Wrote {} and {}", lots_path.display(), summary_path.display());

    Ok(vec![lots_path, summary_path])
}

/// Remove the files `write_sale_files` would write for `stem`, if present
pub fn remove_sale_files(dir: &Path, stem: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for suffix in ["with_calc", "summary"] {
        let path = dir.join(format!("{}_{}.csv", stem, suffix));
        if path.exists() {
            std::fs::remove_file(&path)?;
            removed.push(path);
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{calculate_sale, AcquisitionLot, CpiAdjuster, CpiConvention, CpiTable, EngineOptions, SaleEvent};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn report() -> SaleReport {
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let cpi: CpiTable = [
            ("2022-12".parse().unwrap(), dec!(100)),
            ("2024-05".parse().unwrap(), dec!(105)),
        ]
        .into_iter()
        .collect();
        let sale = SaleEvent {
            sale_date: date("2024-06-10"),
            sale_price_per_unit: dec!(15),
            total_quantity_sold: dec!(3),
            fees: dec!(10),
            lots: vec![
                AcquisitionLot::new(dec!(1), dec!(10), date("2023-01-05")),
                AcquisitionLot::new(dec!(2), dec!(10), date("2023-01-05")),
            ],
        };
        let adjuster = CpiAdjuster::new(&cpi, CpiConvention::Preceding);
        calculate_sale(&sale, &adjuster, &EngineOptions::default()).unwrap()
    }

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(money(dec!(3.333333)), "3.33");
        assert_eq!(money(dec!(107.5)), "107.50");
        assert_eq!(money(dec!(-200)), "-200.00");
    }

    #[test]
    fn money_rounds_half_cent_up() {
        assert_eq!(money(dec!(0.125)), "0.13");
        assert_eq!(money(dec!(0.875)), "0.88");
        assert_eq!(money(dec!(-0.125)), "-0.13");
        assert_eq!(money(dec!(0.124)), "0.12");
    }

    #[test]
    fn lots_csv_rows() {
        let mut out = Vec::new();
        write_lots_csv(&report(), &mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("lot,quantity,acquisition_date,acquisition_price_ils"));
        assert_eq!(
            lines[1],
            "1,1,2023-01-05,10.00,,2022-12,2024-05,1.05,10.50,15.00,3.33,1.17,0.25,0.29"
        );
        assert_eq!(
            lines[2],
            "2,2,2023-01-05,10.00,,2022-12,2024-05,1.05,21.00,30.00,6.67,2.33,0.25,0.58"
        );
    }

    #[test]
    fn summary_csv_row() {
        let mut out = Vec::new();
        write_summary_csv(&report(), &mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "2024-06-10,2,3,15.00,45.00,31.50,3.50,0.88,10.00,-6.50");
    }

    #[test]
    fn sale_files_written() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_sale_files(dir.path(), "consumption_8_7_2025", &report()).unwrap();
        assert_eq!(paths[0], dir.path().join("consumption_8_7_2025_with_calc.csv"));
        assert!(paths.iter().all(|p| p.exists()));

        let removed = remove_sale_files(dir.path(), "consumption_8_7_2025").unwrap();
        assert_eq!(removed, paths);
        assert!(paths.iter().all(|p| !p.exists()));
        assert!(remove_sale_files(dir.path(), "consumption_8_7_2025").unwrap().is_empty());
    }
}
