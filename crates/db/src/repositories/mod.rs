//! Repository abstractions for data access.

pub mod dashboard;
pub mod exchange_rate;
pub mod forecast;
pub mod import;
pub mod project;

pub use dashboard::DashboardRepository;
pub use exchange_rate::ExchangeRateRepository;
pub use forecast::ForecastRepository;
pub use import::ImportRepository;
pub use project::ProjectRepository;
