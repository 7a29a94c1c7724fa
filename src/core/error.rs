use super::cpi::CpiPeriod;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Failure computing a single sale. Always fatal for that sale only.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TaxError {
    #[error("missing CPI index value for {period}{}", lot_context(.lot, .sale_date))]
    MissingIndexData {
        period: CpiPeriod,
        /// Lot (0-based) whose adjustment needed the period
        lot: Option<usize>,
        sale_date: Option<NaiveDate>,
    },
    #[error("CPI index value for {period} must be positive, got {value}{}", lot_context(.lot, .sale_date))]
    InvalidIndexValue {
        period: CpiPeriod,
        value: Decimal,
        lot: Option<usize>,
        sale_date: Option<NaiveDate>,
    },
    #[error("lot quantities sum to {lots_total} but the sale declares {declared}")]
    QuantityMismatch { lots_total: Decimal, declared: Decimal },
    #[error("invalid lot{}: {reason}", .index.map(|i| format!(" #{}", i + 1)).unwrap_or_default())]
    InvalidLot { index: Option<usize>, reason: String },
    #[error("malformed input in {source_name}: {message}")]
    MalformedInput { source_name: String, message: String },
}

impl TaxError {
    pub fn missing_index(period: CpiPeriod) -> Self {
        TaxError::MissingIndexData {
            period,
            lot: None,
            sale_date: None,
        }
    }

    pub fn invalid_index(period: CpiPeriod, value: Decimal) -> Self {
        TaxError::InvalidIndexValue {
            period,
            value,
            lot: None,
            sale_date: None,
        }
    }

    /// Attach the lot and sale an index lookup was made for
    pub fn for_lot(self, index: usize, date: NaiveDate) -> Self {
        match self {
            TaxError::MissingIndexData { period, .. } => TaxError::MissingIndexData {
                period,
                lot: Some(index),
                sale_date: Some(date),
            },
            TaxError::InvalidIndexValue { period, value, .. } => TaxError::InvalidIndexValue {
                period,
                value,
                lot: Some(index),
                sale_date: Some(date),
            },
            other => other,
        }
    }

    pub fn invalid_lot(index: usize, reason: impl Into<String>) -> Self {
        TaxError::InvalidLot {
            index: Some(index),
            reason: reason.into(),
        }
    }

    pub fn malformed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        TaxError::MalformedInput {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Short machine-friendly name used in batch reports
    pub fn kind(&self) -> &'static str {
        match self {
            TaxError::MissingIndexData { .. } | TaxError::InvalidIndexValue { .. } => {
                "MissingIndexData"
            }
            TaxError::QuantityMismatch { .. } => "QuantityMismatch",
            TaxError::InvalidLot { .. } => "InvalidLot",
            TaxError::MalformedInput { .. } => "MalformedInput",
        }
    }
}

fn lot_context(lot: &Option<usize>, sale_date: &Option<NaiveDate>) -> String {
    match (lot, sale_date) {
        (Some(i), Some(d)) => format!(" (lot #{}, sale {})", i + 1, d),
        (Some(i), None) => format!(" (lot #{})", i + 1),
        (None, Some(d)) => format!(" (sale {})", d),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn invalid_lot_message_is_one_based() {
        let err = TaxError::invalid_lot(2, "quantity must be positive");
        assert_eq!(err.to_string(), "invalid lot #3: quantity must be positive");
    }

    #[test]
    fn invalid_lot_without_index() {
        let err = TaxError::InvalidLot {
            index: None,
            reason: "sale has no lots".to_string(),
        };
        assert_eq!(err.to_string(), "invalid lot: sale has no lots");
    }

    #[test]
    fn quantity_mismatch_carries_both_values() {
        let err = TaxError::QuantityMismatch {
            lots_total: dec!(90),
            declared: dec!(100),
        };
        assert_eq!(
            err.to_string(),
            "lot quantities sum to 90 but the sale declares 100"
        );
        assert_eq!(err.kind(), "QuantityMismatch");
    }

    #[test]
    fn missing_index_names_period() {
        let err = TaxError::missing_index(CpiPeriod::new(2023, 1).unwrap());
        assert_eq!(err.to_string(), "missing CPI index value for 2023-01");
    }

    #[test]
    fn index_errors_name_lot_and_sale() {
        let sale_date = chrono::NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let err = TaxError::missing_index(CpiPeriod::new(2020, 12).unwrap()).for_lot(2, sale_date);
        assert_eq!(
            err.to_string(),
            "missing CPI index value for 2020-12 (lot #3, sale 2024-06-10)"
        );

        let err = TaxError::invalid_index(CpiPeriod::new(2020, 12).unwrap(), dec!(0)).for_lot(0, sale_date);
        assert_eq!(
            err.to_string(),
            "CPI index value for 2020-12 must be positive, got 0 (lot #1, sale 2024-06-10)"
        );
        assert_eq!(err.kind(), "MissingIndexData");
    }

    #[test]
    fn for_lot_leaves_other_errors_alone() {
        let sale_date = chrono::NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let err = TaxError::malformed("sale.json", "bad");
        assert_eq!(err.clone().for_lot(1, sale_date), err);
    }
}
