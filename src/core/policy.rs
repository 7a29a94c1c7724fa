use super::sale::{AcquisitionLot, SaleEvent};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Statutory flat rate on real capital gains from securities
pub const DEFAULT_TAX_RATE: Decimal = dec!(0.25);

/// Tax rate applied to each lot's real gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxPolicy {
    rate: Decimal,
}

impl TaxPolicy {
    /// Flat rate, which must lie in `[0, 1]`
    pub fn flat(rate: Decimal) -> Option<Self> {
        (rate >= Decimal::ZERO && rate <= Decimal::ONE).then_some(TaxPolicy { rate })
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    // Single hook for rates that depend on the lot or sale.
    pub fn rate_for(&self, _lot: &AcquisitionLot, _sale: &SaleEvent) -> Decimal {
        self.rate
    }
}

impl Default for TaxPolicy {
    fn default() -> Self {
        TaxPolicy {
            rate: DEFAULT_TAX_RATE,
        }
    }
}
