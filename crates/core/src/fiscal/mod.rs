//! April-to-March fiscal calendar.

pub mod calendar;

pub use calendar::{
    FISCAL_START_MONTH, Quarter, UnknownQuarter, fiscal_months, fiscal_year_bounds,
    fiscal_year_for, fiscal_year_of,
};
