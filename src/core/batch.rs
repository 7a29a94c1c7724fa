use super::cpi::{CpiAdjuster, CpiSource};
use super::engine::{calculate_sale, EngineOptions, SaleReport};
use super::error::TaxError;
use super::sale::SaleEvent;
use rust_decimal::Decimal;

/// One sale as handed over by the input layer, parsed or not
#[derive(Debug, Clone)]
pub struct SaleInput {
    /// Pairing key, usually the sale date as it appears in the file names
    pub key: String,
    /// Files the sale was read from
    pub sources: Vec<String>,
    pub sale: Result<SaleEvent, TaxError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleOutcome {
    pub key: String,
    pub sources: Vec<String>,
    pub result: Result<SaleReport, TaxError>,
}

/// Independent per-sale results for a whole run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<SaleOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&SaleOutcome, &SaleReport)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|r| (o, r)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&SaleOutcome, &TaxError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn total_real_gain(&self) -> Decimal {
        self.succeeded()
            .map(|(_, r)| r.summary.total_real_gain)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn total_tax_owed(&self) -> Decimal {
        self.succeeded()
            .map(|(_, r)| r.summary.total_tax_owed)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn total_fees(&self) -> Decimal {
        self.succeeded()
            .map(|(_, r)| r.summary.total_fees)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}

/// Run every sale through the engine; a failure is kept with its sale and
/// never stops the others
pub fn calculate_batch<I, S>(inputs: I, adjuster: &CpiAdjuster<'_, S>, options: &EngineOptions) -> BatchReport
where
    I: IntoIterator<Item = SaleInput>,
    S: CpiSource + ?Sized,
{
    let outcomes = inputs
        .into_iter()
        .map(|input| {
            let result = input
                .sale
                .and_then(|sale| calculate_sale(&sale, adjuster, options));
            if let Err(ref e) = result {
                log::error!("Sale {} ({}): {}", input.key, input.sources.join(", "), e);
            }
            SaleOutcome {
                key: input.key,
                sources: input.sources,
                result,
            }
        })
        .collect();

    BatchReport { outcomes }
}
