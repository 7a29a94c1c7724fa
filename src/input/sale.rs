//! Sale records: JSON, or text already extracted from the broker's PDF

use super::parse_decimal;
use crate::core::price::is_local_currency;
use crate::core::{AcquisitionLot, Amount, ExchangeRate, SaleEvent, TaxError};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Quantity\s*-\s*Shares.*?([\d.,]+)\s*(?:€|EUR)").unwrap());
static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Quantity\s*-\s*Shares\s*:?\s*([\d.,]+)\s+[\d.,]+\s*(?:€|EUR)").unwrap()
});
static SETTLEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Settlement date:\s*(\d{1,2}\s+[A-Za-z]+\s+\d{4})").unwrap()
});
static FX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Foreign exchange.*?(\d+\.\d{5})").unwrap());
static ANY_FX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+\.\d{5})\b").unwrap());
static FEES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Total debits.*?(\d+\.\d{2})\s*(?:€|EUR)").unwrap());
static ANY_FEES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{1,2}\.\d{2})\b").unwrap());

/// Sale summary as provided by the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SaleRecord {
    /// Settlement date of the sale (YYYY-MM-DD)
    #[serde(alias = "sale_date")]
    pub settlement_date: NaiveDate,
    /// Sale price per share, in `currency`
    #[schemars(with = "f64")]
    pub price_per_unit: Decimal,
    /// Total shares sold; taken from the consumption file when absent
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub quantity: Option<Decimal>,
    /// Total transaction fees, in `currency`
    #[schemars(with = "f64")]
    pub fees: Decimal,
    /// Currency of price and fees (default ILS)
    #[serde(default)]
    pub currency: Option<String>,
    /// ILS per unit of `currency` on the settlement date
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub exchange_rate: Option<Decimal>,
}

impl SaleRecord {
    fn amount(&self, value: Decimal) -> Amount {
        Amount {
            value,
            currency: self.currency.clone(),
            exchange_rate: self.exchange_rate,
        }
    }

    /// Rate that lots in the sale currency fall back to
    pub fn exchange_rate(&self) -> Option<ExchangeRate> {
        match (&self.currency, self.exchange_rate) {
            (Some(currency), Some(rate)) if !is_local_currency(currency) => Some(ExchangeRate {
                currency: currency.to_uppercase(),
                rate,
            }),
            _ => None,
        }
    }

    /// Build the ILS sale event owning `lots`
    pub fn into_sale(self, lots: Vec<AcquisitionLot>, source_name: &str) -> Result<SaleEvent, TaxError> {
        let convert = |value: Decimal| {
            self.amount(value)
                .to_local(None)
                .map_err(|e| TaxError::malformed(source_name, e))
        };
        let sale_price_per_unit = convert(self.price_per_unit)?;
        let fees = convert(self.fees)?;

        let total_quantity_sold = match self.quantity {
            Some(quantity) => quantity,
            None => {
                let total = lots.iter().map(|l| l.quantity).sum();
                log::warn!(
                    "{}: no quantity in sale record, using consumption total {}",
                    source_name,
                    total
                );
                total
            }
        };

        Ok(SaleEvent {
            sale_date: self.settlement_date,
            sale_price_per_unit,
            total_quantity_sold,
            fees,
            lots,
        })
    }
}

pub fn parse_sale_json(data: &str, source_name: &str) -> Result<SaleRecord, TaxError> {
    serde_json::from_str(data).map_err(|e| TaxError::malformed(source_name, e.to_string()))
}

/// Parse a EUR trade confirmation from its extracted text
pub fn parse_sale_text(text: &str, source_name: &str) -> Result<SaleRecord, TaxError> {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };

    let price_per_unit = capture(&PRICE_RE).and_then(|p| parse_decimal(&p.replace(',', "")));
    let quantity = capture(&QUANTITY_RE).and_then(|q| parse_decimal(&q.replace(',', "")));
    let settlement_date = capture(&SETTLEMENT_RE)
        .and_then(|d| NaiveDate::parse_from_str(&d, "%d %b %Y").ok());
    let exchange_rate = capture(&FX_RE)
        .or_else(|| capture(&ANY_FX_RE))
        .and_then(|r| parse_decimal(&r));
    let fees = capture(&FEES_RE)
        .or_else(|| capture(&ANY_FEES_RE))
        .and_then(|f| parse_decimal(&f));

    match (price_per_unit, settlement_date, exchange_rate, fees) {
        (Some(price_per_unit), Some(settlement_date), Some(exchange_rate), Some(fees)) => {
            Ok(SaleRecord {
                settlement_date,
                price_per_unit,
                quantity,
                fees,
                currency: Some("EUR".to_string()),
                exchange_rate: Some(exchange_rate),
            })
        }
        _ => {
            let missing: Vec<&str> = [
                ("sale price", price_per_unit.is_none()),
                ("settlement date", settlement_date.is_none()),
                ("exchange rate", exchange_rate.is_none()),
                ("fees", fees.is_none()),
            ]
            .iter()
            .filter(|(_, absent)| *absent)
            .map(|(name, _)| *name)
            .collect();
            Err(TaxError::malformed(
                source_name,
                format!("could not find {}", missing.join(", ")),
            ))
        }
    }
}
