use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Local reporting currency
pub const LOCAL_CURRENCY: &str = "ILS";

/// Conversion rate from a foreign currency into ILS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExchangeRate {
    /// Foreign currency code (e.g., "EUR")
    pub currency: String,
    /// ILS per one unit of `currency`
    #[schemars(with = "f64")]
    pub rate: Decimal,
}

/// Amount that is either ILS or a foreign currency with an optional rate
///
/// For ILS amounts: local = value
/// For foreign amounts: local = value * rate, where the rate comes from the
/// amount itself or, failing that, a fallback rate for the same currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Amount {
    #[schemars(with = "f64")]
    pub value: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub exchange_rate: Option<Decimal>,
}

impl Amount {
    pub fn local(value: Decimal) -> Self {
        Amount {
            value,
            currency: None,
            exchange_rate: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.currency.as_deref().is_none_or(is_local_currency)
    }

    /// Convert to ILS
    pub fn to_local(&self, fallback: Option<&ExchangeRate>) -> Result<Decimal, String> {
        if self.is_local() {
            return match self.exchange_rate {
                Some(rate) if rate != Decimal::ONE => Err(format!(
                    "exchange rate {} given for an amount already in {}",
                    rate, LOCAL_CURRENCY
                )),
                _ => Ok(self.value),
            };
        }

        let currency = self.currency.as_deref().unwrap_or_default();
        let rate = match (self.exchange_rate, fallback) {
            (Some(rate), _) => rate,
            (None, Some(fx)) if fx.currency.eq_ignore_ascii_case(currency) => fx.rate,
            _ => {
                return Err(format!(
                    "no exchange rate available to convert {} to {}",
                    currency, LOCAL_CURRENCY
                ))
            }
        };
        if rate <= Decimal::ZERO {
            return Err(format!("exchange rate for {} must be positive, got {}", currency, rate));
        }
        self.value.checked_mul(rate).ok_or_else(|| {
            format!(
                "{} {} at {} is too large to convert to {}",
                self.value, currency, rate, LOCAL_CURRENCY
            )
        })
    }
}

pub fn is_local_currency(code: &str) -> bool {
    let code = code.trim();
    code.is_empty()
        || code.eq_ignore_ascii_case(LOCAL_CURRENCY)
        || code.eq_ignore_ascii_case("NIS")
        || code == "₪"
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn foreign(value: Decimal, currency: &str, rate: Option<Decimal>) -> Amount {
        Amount {
            value,
            currency: Some(currency.to_string()),
            exchange_rate: rate,
        }
    }

    fn eur(rate: Decimal) -> ExchangeRate {
        ExchangeRate {
            currency: "EUR".to_string(),
            rate,
        }
    }

    #[test]
    fn local_amount_unchanged() {
        assert_eq!(Amount::local(dec!(12.5)).to_local(None), Ok(dec!(12.5)));
        let nis = foreign(dec!(7), "NIS", None);
        assert_eq!(nis.to_local(Some(&eur(dec!(4)))), Ok(dec!(7)));
    }

    #[test]
    fn foreign_amount_uses_own_rate() {
        let amount = foreign(dec!(10), "USD", Some(dec!(3.7)));
        assert_eq!(amount.to_local(Some(&eur(dec!(4)))), Ok(dec!(37.0)));
    }

    #[test]
    fn foreign_amount_falls_back_to_matching_currency() {
        let amount = foreign(dec!(10), "eur", None);
        assert_eq!(amount.to_local(Some(&eur(dec!(3.95)))), Ok(dec!(39.50)));
    }

    #[test]
    fn foreign_amount_without_any_rate_fails() {
        let amount = foreign(dec!(10), "USD", None);
        assert!(amount.to_local(Some(&eur(dec!(4)))).is_err());
        assert!(amount.to_local(None).is_err());
    }

    #[test]
    fn non_positive_rate_rejected() {
        let amount = foreign(dec!(10), "USD", Some(dec!(0)));
        assert!(amount.to_local(None).is_err());
    }

    #[test]
    fn local_amount_with_rate_rejected() {
        let amount = foreign(dec!(10), "ILS", Some(dec!(3.9)));
        assert!(amount.to_local(None).is_err());
    }

    #[test]
    fn overflowing_conversion_is_an_error() {
        let amount = foreign(Decimal::MAX, "EUR", Some(dec!(4)));
        let err = amount.to_local(None).unwrap_err();
        assert!(err.contains("too large to convert"));
    }
}
