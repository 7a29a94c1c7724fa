//! Monthly CPI from the Israel Central Bureau of Statistics SDMX API

use crate::core::{CpiPeriod, CpiTable};
use anyhow::Context;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rust_decimal::Decimal;
use std::str::FromStr;

const CPI_URL: &str = "https://apis.cbs.gov.il/sdmx/data/IMF/ECOFIN_CPI/1";

/// Download monthly CPI values for `from..=to`
pub fn fetch_cpi(from: CpiPeriod, to: CpiPeriod) -> anyhow::Result<CpiTable> {
    let response = ureq::get(CPI_URL)
        .query("startPeriod", &sdmx_period(from))
        .query("endPeriod", &sdmx_period(to))
        .query("format", "xml")
        .query("download", "false")
        .query("addNull", "false")
        .call()
        .with_context(|| format!("requesting CPI {} to {} from {}", from, to, CPI_URL))?;
    let body = response.into_string()?;

    let table: CpiTable = parse_sdmx(&body)?
        .iter()
        .filter(|(period, _)| (from..=to).contains(*period))
        .map(|(period, value)| (*period, *value))
        .collect();
    if table.is_empty() {
        anyhow::bail!("no CPI observations between {} and {}", from, to);
    }
    log::info!("{} CPI periods fetched", table.len());
    Ok(table)
}

fn sdmx_period(period: CpiPeriod) -> String {
    format!("{:02}-{}", period.month(), period.year())
}

/// Read every `Obs` element of an SDMX document, whatever its namespace
pub fn parse_sdmx(xml: &str) -> anyhow::Result<CpiTable> {
    let mut reader = Reader::from_str(xml);
    let mut table = CpiTable::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Obs" => {
                if let Some((period, value)) = observation(&e)? {
                    table.insert(period, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if table.is_empty() {
        anyhow::bail!("no CPI observations found in the SDMX response");
    }
    Ok(table)
}

fn observation(e: &BytesStart) -> anyhow::Result<Option<(CpiPeriod, Decimal)>> {
    let mut period = None;
    let mut value = None;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.local_name().as_ref() {
            b"TIME_PERIOD" | b"TIME" => period = Some(attr.unescape_value()?.into_owned()),
            b"OBS_VALUE" | b"OBS" => value = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }

    let (Some(period), Some(value)) = (period, value) else {
        return Ok(None);
    };
    let period = match CpiPeriod::from_str(&period) {
        Ok(period) => period,
        Err(e) => {
            log::debug!("Skipping observation: {}", e);
            return Ok(None);
        }
    };
    let value = Decimal::from_str(&value)
        .or_else(|_| Decimal::from_scientific(&value))
        .with_context(|| format!("CPI value '{}' for {}", value, period))?;
    Ok(Some((period, value)))
}
