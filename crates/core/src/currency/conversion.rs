//! Currency conversion through the shared USD pivot table.
//!
//! Every stored rate is "units of USD per unit of currency". Converting
//! between two non-USD currencies pivots through USD.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};

/// The pivot currency. It never needs a stored rate.
pub const USD: &str = "USD";

/// Number of decimal places stored for monetary amounts.
pub const AMOUNT_DECIMALS: u32 = 3;

/// In-memory view of the exchange-rate table (currency code -> rate to USD).
///
/// Conversions fall back to the *unconverted* amount when a rate is missing
/// or zero. Reporting keeps working while the rate table is incomplete; the
/// gap shows up in the numbers rather than as a failed request.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, Decimal>,
}

impl RateTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from (code, rate_to_usd) pairs.
    #[must_use]
    pub fn from_rates<I>(rates: I) -> Self
    where
        I: IntoIterator<Item = (String, Decimal)>,
    {
        Self {
            rates: rates.into_iter().collect(),
        }
    }

    /// Returns the USD rate for a currency, if one is usable.
    #[must_use]
    pub fn rate_to_usd(&self, code: &str) -> Option<Decimal> {
        if code == USD {
            return Some(Decimal::ONE);
        }
        self.rates.get(code).copied().filter(|rate| !rate.is_zero())
    }

    /// Converts an amount in `code` to USD.
    #[must_use]
    pub fn to_usd(&self, amount: Decimal, code: &str) -> Decimal {
        match self.rate_to_usd(code) {
            Some(rate) => amount * rate,
            None => {
                tracing::warn!(currency = code, "no usable exchange rate, amount left unconverted");
                amount
            }
        }
    }

    /// Converts a USD amount into `code`.
    #[must_use]
    pub fn from_usd(&self, usd_amount: Decimal, code: &str) -> Decimal {
        match self.rate_to_usd(code) {
            Some(rate) => usd_amount / rate,
            None => {
                tracing::warn!(currency = code, "no usable exchange rate, amount left unconverted");
                usd_amount
            }
        }
    }

    /// Converts between two currencies by pivoting through USD.
    ///
    /// Identity when the codes match.
    #[must_use]
    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Decimal {
        if from == to {
            return amount;
        }
        self.from_usd(self.to_usd(amount, from), to)
    }
}

/// Rounds a monetary amount to storage precision.
///
/// Uses banker's rounding (round half to even) to minimise cumulative errors.
#[must_use]
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_DECIMALS, RoundingStrategy::MidpointNearestEven)
}

/// Returns the display symbol for a currency code.
///
/// Unknown codes fall back to the code itself.
#[must_use]
pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "\u{20ac}",
        "GBP" => "\u{a3}",
        "JPY" | "CNY" => "\u{a5}",
        "INR" => "\u{20b9}",
        "AUD" => "A$",
        "CAD" => "C$",
        "SGD" => "S$",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn table() -> RateTable {
        RateTable::from_rates([
            ("INR".to_string(), dec!(0.012)),
            ("EUR".to_string(), dec!(1.10)),
            ("ZRO".to_string(), dec!(0)),
        ])
    }

    #[test]
    fn test_usd_is_the_pivot() {
        // No stored rate needed for USD
        assert_eq!(table().to_usd(dec!(100), "USD"), dec!(100));
        assert_eq!(table().from_usd(dec!(100), "USD"), dec!(100));
    }

    #[test]
    fn test_to_usd() {
        assert_eq!(table().to_usd(dec!(1000), "INR"), dec!(12.000));
    }

    #[test]
    fn test_from_usd() {
        assert_eq!(table().from_usd(dec!(12), "INR"), dec!(1000));
    }

    #[test]
    fn test_convert_identity() {
        assert_eq!(table().convert(dec!(42.5), "EUR", "EUR"), dec!(42.5));
    }

    #[test]
    fn test_convert_pivots_through_usd() {
        // 100 EUR -> 110 USD -> 110 / 0.012 INR
        let result = table().convert(dec!(100), "EUR", "INR");
        assert_eq!(result, dec!(110) / dec!(0.012));
    }

    #[test]
    fn test_missing_rate_falls_back_unconverted() {
        assert_eq!(table().to_usd(dec!(77), "CHF"), dec!(77));
        assert_eq!(table().from_usd(dec!(77), "CHF"), dec!(77));
    }

    #[test]
    fn test_zero_rate_guarded() {
        // A zero rate must never divide; fall back unconverted
        assert_eq!(table().from_usd(dec!(50), "ZRO"), dec!(50));
        assert_eq!(table().to_usd(dec!(50), "ZRO"), dec!(50));
    }

    #[test]
    fn test_round_amount_bankers() {
        assert_eq!(round_amount(dec!(1.2345)), dec!(1.234));
        assert_eq!(round_amount(dec!(1.2355)), dec!(1.236));
        assert_eq!(round_amount(dec!(1.2365)), dec!(1.236));
    }

    #[test]
    fn test_currency_symbol() {
        assert_eq!(currency_symbol("INR"), "\u{20b9}");
        assert_eq!(currency_symbol("USD"), "$");
        assert_eq!(currency_symbol("CHF"), "CHF");
    }

    proptest! {
        /// Round trip: converting to USD and back recovers the amount
        /// within rounding tolerance, for any non-zero rate.
        #[test]
        fn prop_currency_round_trip(
            amount_milli in 1i64..10_000_000i64,
            rate_ten_thousandths in 1i64..10_000_000i64,
        ) {
            let amount = Decimal::new(amount_milli, 3);
            let rate = Decimal::new(rate_ten_thousandths, 4);
            let table = RateTable::from_rates([("XXX".to_string(), rate)]);

            let round_trip = table.from_usd(table.to_usd(amount, "XXX"), "XXX");
            let tolerance = Decimal::new(1, 9);
            prop_assert!((round_trip - amount).abs() <= tolerance * amount.abs());
        }
    }
}
