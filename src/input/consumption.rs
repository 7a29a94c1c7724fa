//! Consumption (cost basis) CSV: one row per acquisition lot
//!
//! Broker exports are `;`-separated with decimal commas and day-first dates,
//! e.g.
//!
//! ```text
//! Acquisition date;Consumption;Purchase price
//! 05/01/2023;100;10,00
//! ```

use super::{parse_date, parse_decimal};
use crate::core::{AcquisitionLot, Amount, ExchangeRate, TaxError};
use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;

const DATE_HEADERS: &[&str] = &["acquisition date", "acquisition_date", "date acquired", "date"];
const QUANTITY_HEADERS: &[&str] = &["consumption", "quantity", "shares"];
const PRICE_HEADERS: &[&str] = &[
    "purchase price",
    "purchase_price",
    "acquisition price",
    "acquisition_price",
    "price",
];
const CURRENCY_HEADERS: &[&str] = &["currency"];
const RATE_HEADERS: &[&str] = &["exchange rate", "exchange_rate", "fx rate", "fx_rate"];

/// A parsed consumption row, before currency conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionRecord {
    pub row: usize,
    pub acquisition_date: NaiveDate,
    pub quantity: Decimal,
    pub price: Amount,
}

impl ConsumptionRecord {
    /// Convert to an ILS-denominated lot, falling back to the sale's rate
    pub fn to_lot(
        &self,
        fallback: Option<&ExchangeRate>,
        source_name: &str,
    ) -> Result<AcquisitionLot, TaxError> {
        let price = self
            .price
            .to_local(fallback)
            .map_err(|e| TaxError::malformed(source_name, format!("row {}: {}", self.row, e)))?;
        let lot = AcquisitionLot::new(self.quantity, price, self.acquisition_date);

        if self.price.is_local() {
            Ok(lot)
        } else {
            let currency = self.price.currency.as_deref().unwrap_or_default();
            let rate = self
                .price
                .exchange_rate
                .or_else(|| fallback.map(|fx| fx.rate))
                .unwrap_or_default();
            Ok(lot.with_note(format!("{} {} @ {}", self.price.value, currency, rate)))
        }
    }
}

/// Parse the consumption CSV in `data`, keeping row order
pub fn parse_consumption(data: &str, source_name: &str) -> Result<Vec<ConsumptionRecord>, TaxError> {
    let delimiter = detect_delimiter(data);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| TaxError::malformed(source_name, e.to_string()))?
        .clone();
    let columns = Columns::locate(&headers, source_name)?;

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.map_err(|e| TaxError::malformed(source_name, e.to_string()))?;
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }
        records.push(columns.read(&row, line, source_name)?);
    }

    if records.is_empty() {
        return Err(TaxError::malformed(source_name, "no acquisition rows found"));
    }
    log::debug!("Read {} consumption rows from {}", records.len(), source_name);
    Ok(records)
}

fn detect_delimiter(data: &str) -> u8 {
    let header = data.lines().next().unwrap_or_default();
    if header.matches(';').count() > 0 {
        b';'
    } else if header.matches('\t').count() > 0 {
        b'\t'
    } else {
        b','
    }
}

struct Columns {
    date: usize,
    quantity: usize,
    price: usize,
    currency: Option<usize>,
    rate: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord, source_name: &str) -> Result<Self, TaxError> {
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim_start_matches('\u{feff}').trim().to_lowercase();
                names.contains(&h.as_str())
            })
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| {
                TaxError::malformed(
                    source_name,
                    format!("missing column '{}' (found: {})", names[0], headers.iter().collect::<Vec<_>>().join(", ")),
                )
            })
        };

        Ok(Columns {
            date: require(DATE_HEADERS)?,
            quantity: require(QUANTITY_HEADERS)?,
            price: require(PRICE_HEADERS)?,
            currency: find(CURRENCY_HEADERS),
            rate: find(RATE_HEADERS),
        })
    }

    fn read(&self, row: &StringRecord, line: usize, source_name: &str) -> Result<ConsumptionRecord, TaxError> {
        let field = |index: usize| row.get(index).unwrap_or_default();
        let bad = |what: &str, value: &str| {
            TaxError::malformed(source_name, format!("row {}: invalid {} '{}'", line, what, value))
        };

        let acquisition_date = parse_date(field(self.date)).ok_or_else(|| bad("acquisition date", field(self.date)))?;
        let quantity = parse_decimal(field(self.quantity)).ok_or_else(|| bad("quantity", field(self.quantity)))?;
        let value = parse_decimal(field(self.price)).ok_or_else(|| bad("purchase price", field(self.price)))?;

        let currency = self
            .currency
            .map(field)
            .filter(|c| !c.is_empty())
            .map(|c| c.to_uppercase());
        let exchange_rate = match self.rate.map(field).filter(|r| !r.is_empty()) {
            Some(r) => Some(parse_decimal(r).ok_or_else(|| bad("exchange rate", r))?),
            None => None,
        };

        Ok(ConsumptionRecord {
            row: line,
            acquisition_date,
            quantity,
            price: Amount {
                value,
                currency,
                exchange_rate,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn broker_export_format() {
        let data = "Acquisition date;Consumption;Purchase price\n\
                    05/01/2023;100;10,00\n\
                    20/03/2023;12,5;11,25\n";
        let records = parse_consumption(data, "consumption_8_7_2025.csv").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].acquisition_date, date("2023-01-05"));
        assert_eq!(records[0].quantity, dec!(100));
        assert_eq!(records[0].price, Amount::local(dec!(10.00)));
        assert_eq!(records[1].quantity, dec!(12.5));
        assert_eq!(records[1].price.value, dec!(11.25));
        assert_eq!(records[1].row, 3);
    }

    #[test]
    fn comma_separated_with_currency_columns() {
        let data = "Date,Quantity,Price,Currency,Exchange rate,Plan\n\
                    2023-01-05,10,9.50,eur,3.95123,ESPP\n\
                    2023-02-01,5,10.00,,,RSU\n";
        let records = parse_consumption(data, "c.csv").unwrap();
        assert_eq!(records[0].price.currency.as_deref(), Some("EUR"));
        assert_eq!(records[0].price.exchange_rate, Some(dec!(3.95123)));
        assert_eq!(records[1].price, Amount::local(dec!(10.00)));
    }

    #[test]
    fn blank_rows_skipped() {
        let data = "Acquisition date;Consumption;Purchase price\n05/01/2023;100;10,00\n;;\n";
        assert_eq!(parse_consumption(data, "c.csv").unwrap().len(), 1);
    }

    #[test]
    fn missing_column_reported() {
        let data = "Acquisition date;Purchase price\n05/01/2023;10,00\n";
        let err = parse_consumption(data, "c.csv").unwrap_err();
        assert_eq!(err.kind(), "MalformedInput");
        assert!(err.to_string().contains("missing column 'consumption'"));
    }

    #[test]
    fn bad_value_names_row() {
        let data = "Acquisition date;Consumption;Purchase price\n05/01/2023;abc;10,00\n";
        let err = parse_consumption(data, "c.csv").unwrap_err();
        assert!(err.to_string().contains("row 2: invalid quantity 'abc'"));
    }

    #[test]
    fn header_only_is_malformed() {
        let data = "Acquisition date;Consumption;Purchase price\n";
        assert!(parse_consumption(data, "c.csv").is_err());
    }

    #[test]
    fn foreign_lot_converted_with_sale_rate() {
        let record = ConsumptionRecord {
            row: 2,
            acquisition_date: date("2023-01-05"),
            quantity: dec!(10),
            price: Amount {
                value: dec!(9.50),
                currency: Some("EUR".to_string()),
                exchange_rate: None,
            },
        };
        let fx = ExchangeRate {
            currency: "EUR".to_string(),
            rate: dec!(4),
        };
        let lot = record.to_lot(Some(&fx), "c.csv").unwrap();
        assert_eq!(lot.acquisition_price, dec!(38.00));
        assert_eq!(lot.currency_note.as_deref(), Some("9.50 EUR @ 4"));

        let err = record.to_lot(None, "c.csv").unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }
}
