use super::error::TaxError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Default tolerance when comparing lot totals to the declared sale quantity
pub const DEFAULT_QUANTITY_TOLERANCE: Decimal = dec!(0.0001);

/// A batch of shares acquired at one price and date, consumed by a sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquisitionLot {
    pub quantity: Decimal,
    /// Cost per unit in ILS
    pub acquisition_price: Decimal,
    pub acquisition_date: NaiveDate,
    /// Original currency and rate, when the price was converted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_note: Option<String>,
}

impl AcquisitionLot {
    pub fn new(quantity: Decimal, acquisition_price: Decimal, acquisition_date: NaiveDate) -> Self {
        AcquisitionLot {
            quantity,
            acquisition_price,
            acquisition_date,
            currency_note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.currency_note = Some(note.into());
        self
    }

    /// Unadjusted cost of the whole lot, `None` on overflow
    pub fn cost(&self) -> Option<Decimal> {
        self.acquisition_price.checked_mul(self.quantity)
    }
}

/// A single sale together with the lots it consumed, in consumption order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleEvent {
    pub sale_date: NaiveDate,
    /// Price per unit in ILS
    pub sale_price_per_unit: Decimal,
    pub total_quantity_sold: Decimal,
    /// Total transaction fees in ILS
    pub fees: Decimal,
    pub lots: Vec<AcquisitionLot>,
}

impl SaleEvent {
    pub fn nominal_proceeds(&self) -> Option<Decimal> {
        self.total_quantity_sold.checked_mul(self.sale_price_per_unit)
    }

    pub fn lots_quantity(&self) -> Option<Decimal> {
        self.lots
            .iter()
            .try_fold(Decimal::ZERO, |total, l| total.checked_add(l.quantity))
    }

    /// Check the sale and its lots before any computation
    pub fn validate(&self, tolerance: Decimal) -> Result<(), TaxError> {
        if self.lots.is_empty() {
            return Err(TaxError::InvalidLot {
                index: None,
                reason: "sale has no acquisition lots".to_string(),
            });
        }
        if self.total_quantity_sold <= Decimal::ZERO {
            return Err(TaxError::InvalidLot {
                index: None,
                reason: format!(
                    "sale quantity must be positive, got {}",
                    self.total_quantity_sold
                ),
            });
        }
        if self.sale_price_per_unit < Decimal::ZERO || self.fees < Decimal::ZERO {
            return Err(TaxError::InvalidLot {
                index: None,
                reason: "sale price and fees must not be negative".to_string(),
            });
        }

        for (index, lot) in self.lots.iter().enumerate() {
            if lot.quantity <= Decimal::ZERO {
                return Err(TaxError::invalid_lot(
                    index,
                    format!("quantity must be positive, got {}", lot.quantity),
                ));
            }
            if lot.acquisition_price < Decimal::ZERO {
                return Err(TaxError::invalid_lot(
                    index,
                    format!(
                        "acquisition price must not be negative, got {}",
                        lot.acquisition_price
                    ),
                ));
            }
            if lot.acquisition_date > self.sale_date {
                return Err(TaxError::invalid_lot(
                    index,
                    format!(
                        "acquired {} after the sale on {}",
                        lot.acquisition_date, self.sale_date
                    ),
                ));
            }
        }

        let lots_total = self.lots_quantity().ok_or_else(|| TaxError::InvalidLot {
            index: None,
            reason: "lot quantities are too large to add up".to_string(),
        })?;
        if (lots_total - self.total_quantity_sold).abs() > tolerance {
            return Err(TaxError::QuantityMismatch {
                lots_total,
                declared: self.total_quantity_sold,
            });
        }
        Ok(())
    }
}
