//! Multi-currency handling via the shared USD pivot table.

pub mod conversion;

pub use conversion::{AMOUNT_DECIMALS, RateTable, USD, currency_symbol, round_amount};
