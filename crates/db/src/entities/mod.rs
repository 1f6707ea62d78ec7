//! `SeaORM` entity definitions.

pub mod clusters;
pub mod exchange_rates;
pub mod forecasts;
pub mod projects;
pub mod users;
