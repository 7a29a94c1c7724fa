pub mod consumption;
pub mod discovery;
pub mod sale;

use crate::core::{SaleInput, TaxError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use consumption::{parse_consumption, ConsumptionRecord};
pub use discovery::{discover, file_key, SaleFiles};
pub use sale::{parse_sale_json, parse_sale_text, SaleRecord};

/// Read a consumption file and its sale document into a sale ready for the engine
pub fn load_sale(files: &SaleFiles) -> SaleInput {
    let mut sources = vec![display_name(&files.consumption)];
    let sale = match &files.sale {
        Some(sale_path) => {
            sources.push(display_name(sale_path));
            read_sale(sale_path, &files.consumption)
        }
        None => Err(TaxError::malformed(
            display_name(&files.consumption),
            files.missing_sale_reason().unwrap_or_default(),
        )),
    };

    SaleInput {
        key: files.key.clone(),
        sources,
        sale,
    }
}

/// Read a sale document and a consumption CSV given explicitly
pub fn read_sale(sale_path: &Path, consumption_path: &Path) -> Result<crate::core::SaleEvent, TaxError> {
    let sale_name = display_name(sale_path);
    let consumption_name = display_name(consumption_path);

    let record = read_sale_record(sale_path)?;
    let fallback = record.exchange_rate();

    let data = read_to_string(consumption_path)?;
    let lots = parse_consumption(&data, &consumption_name)?
        .iter()
        .map(|r| r.to_lot(fallback.as_ref(), &consumption_name))
        .collect::<Result<Vec<_>, _>>()?;

    record.into_sale(lots, &sale_name)
}

/// Sale record by extension: `.json`, otherwise extracted text
pub fn read_sale_record(path: &Path) -> Result<SaleRecord, TaxError> {
    let name = display_name(path);
    let data = read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_sale_json(&data, &name),
        _ => parse_sale_text(&data, &name),
    }
}

fn read_to_string(path: &Path) -> Result<String, TaxError> {
    fs::read_to_string(path).map_err(|e| TaxError::malformed(display_name(path), e.to_string()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse a broker-formatted number: `1,234.56`, `1.234,56`, `12,5` or `12.5`
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '€' | '$' | '₪' | '\''))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if cleaned.matches(',').count() == 1 => cleaned.replace(',', "."),
        (Some(_), None) => cleaned.replace(',', ""),
        _ => cleaned,
    };
    Decimal::from_str(&normalized).ok()
}

/// Parse a day-first or ISO date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y", "%Y-%m-%d", "%d %b %Y"];
    let mut s = s.trim();
    if s.contains(':') {
        // drop the time component
        s = s.split([' ', 'T']).next().unwrap_or_default();
    }
    FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}
