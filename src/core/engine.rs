//! Real gain and tax per acquisition lot, aggregated per sale
//!
//! For each lot, in consumption order:
//! 1. adjusted cost = price * quantity * CPI factor (acquisition -> sale)
//! 2. proceeds share = quantity * sale price
//! 3. fee share = fees * quantity / quantity sold (last lot takes the remainder)
//! 4. real gain = proceeds share - adjusted cost - fee share
//! 5. tax = max(0, real gain) * rate

use super::cpi::{CpiAdjuster, CpiPeriod, CpiSource};
use super::error::TaxError;
use super::policy::TaxPolicy;
use super::sale::{SaleEvent, DEFAULT_QUANTITY_TOLERANCE};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub policy: TaxPolicy,
    /// Allowed difference between lot total and declared sale quantity
    pub tolerance: Decimal,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            policy: TaxPolicy::default(),
            tolerance: DEFAULT_QUANTITY_TOLERANCE,
        }
    }
}

/// Computed figures for one consumed lot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotResult {
    /// Position in the consumption record (0-based)
    pub index: usize,
    pub quantity: Decimal,
    pub acquisition_date: NaiveDate,
    pub acquisition_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_note: Option<String>,
    pub cpi_from: CpiPeriod,
    pub cpi_to: CpiPeriod,
    pub adjustment_factor: Decimal,
    pub adjusted_cost_basis: Decimal,
    pub proceeds_share: Decimal,
    pub fee_share: Decimal,
    pub real_gain: Decimal,
    pub tax_rate: Decimal,
    pub tax_owed: Decimal,
}

/// Totals for one sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleSummary {
    pub sale_date: NaiveDate,
    pub lot_count: usize,
    pub total_quantity: Decimal,
    pub sale_price_per_unit: Decimal,
    pub nominal_proceeds: Decimal,
    pub total_adjusted_cost: Decimal,
    pub total_real_gain: Decimal,
    pub total_tax_owed: Decimal,
    pub total_fees: Decimal,
    pub net_proceeds: Decimal,
}

/// Full result for one sale: per-lot rows and the summary block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleReport {
    pub lots: Vec<LotResult>,
    pub summary: SaleSummary,
}

/// Compute per-lot real gains and tax for a single sale
pub fn calculate_sale<S: CpiSource + ?Sized>(
    sale: &SaleEvent,
    adjuster: &CpiAdjuster<'_, S>,
    options: &EngineOptions,
) -> Result<SaleReport, TaxError> {
    sale.validate(options.tolerance)?;

    let last = sale.lots.len() - 1;
    let mut fees_allocated = Decimal::ZERO;
    let mut lots = Vec::with_capacity(sale.lots.len());

    for (index, lot) in sale.lots.iter().enumerate() {
        let adjustment = adjuster
            .adjustment(lot.acquisition_date, sale.sale_date)
            .map_err(|e| e.for_lot(index, sale.sale_date))?;
        let overflow = |what: &str| too_large(Some(index), what);

        let adjusted_cost_basis = lot
            .cost()
            .and_then(|cost| cost.checked_mul(adjustment.factor))
            .ok_or_else(|| overflow("adjusted cost"))?;
        let proceeds_share = lot
            .quantity
            .checked_mul(sale.sale_price_per_unit)
            .ok_or_else(|| overflow("proceeds"))?;
        let fee_share = if index == last {
            sale.fees.checked_sub(fees_allocated)
        } else {
            sale.fees
                .checked_mul(lot.quantity)
                .and_then(|f| f.checked_div(sale.total_quantity_sold))
        }
        .ok_or_else(|| overflow("fee share"))?;
        fees_allocated = fees_allocated
            .checked_add(fee_share)
            .ok_or_else(|| overflow("fee share"))?;

        let real_gain = proceeds_share
            .checked_sub(adjusted_cost_basis)
            .and_then(|g| g.checked_sub(fee_share))
            .ok_or_else(|| overflow("real gain"))?;
        let tax_rate = options.policy.rate_for(lot, sale);
        let tax_owed = real_gain
            .max(Decimal::ZERO)
            .checked_mul(tax_rate)
            .ok_or_else(|| overflow("tax"))?;

        log::debug!(
            "Sale {} lot #{}: qty={}, acquired={}, factor={} ({} -> {}), cost={}, proceeds={}, fee={}, gain={}, tax={}",
            sale.sale_date,
            index + 1,
            lot.quantity,
            lot.acquisition_date,
            adjustment.factor,
            adjustment.from_period,
            adjustment.to_period,
            adjusted_cost_basis,
            proceeds_share,
            fee_share,
            real_gain,
            tax_owed
        );

        lots.push(LotResult {
            index,
            quantity: lot.quantity,
            acquisition_date: lot.acquisition_date,
            acquisition_price: lot.acquisition_price,
            currency_note: lot.currency_note.clone(),
            cpi_from: adjustment.from_period,
            cpi_to: adjustment.to_period,
            adjustment_factor: adjustment.factor,
            adjusted_cost_basis,
            proceeds_share,
            fee_share,
            real_gain,
            tax_rate,
            tax_owed,
        });
    }

    let totals = |what: &str| too_large(None, what);
    let total_real_gain = checked_sum(lots.iter().map(|l| l.real_gain)).ok_or_else(|| totals("total real gain"))?;
    let summary = SaleSummary {
        sale_date: sale.sale_date,
        lot_count: lots.len(),
        total_quantity: sale.total_quantity_sold,
        sale_price_per_unit: sale.sale_price_per_unit,
        nominal_proceeds: sale.nominal_proceeds().ok_or_else(|| totals("nominal proceeds"))?,
        total_adjusted_cost: checked_sum(lots.iter().map(|l| l.adjusted_cost_basis))
            .ok_or_else(|| totals("total adjusted cost"))?,
        total_real_gain,
        total_tax_owed: checked_sum(lots.iter().map(|l| l.tax_owed)).ok_or_else(|| totals("total tax"))?,
        total_fees: sale.fees,
        net_proceeds: total_real_gain
            .checked_sub(sale.fees)
            .ok_or_else(|| totals("net proceeds"))?,
    };

    log::info!(
        "Sale {}: {} lots, real gain {}, tax {}",
        summary.sale_date,
        summary.lot_count,
        summary.total_real_gain,
        summary.total_tax_owed
    );

    Ok(SaleReport { lots, summary })
}

fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, v| total.checked_add(v))
}

fn too_large(index: Option<usize>, what: &str) -> TaxError {
    TaxError::InvalidLot {
        index,
        reason: format!("{} is too large to compute", what),
    }
}
