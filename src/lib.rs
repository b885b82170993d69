/// climate_service: read-only JSON API over a climate observation dataset.
///
/// # Module structure
///
/// ```text
/// climate_service
/// ├── config    — service configuration loader (climate_service.toml + env)
/// ├── db        — PostgreSQL connection, DATABASE_URL handling, schema verification
/// ├── schema    — static description of the measurement / station tables
/// ├── store     — ClimateStore trait and its PostgreSQL implementation
/// ├── dates     — strict YYYY-MM-DD parsing and the trailing-year cutoff
/// ├── model     — row types and JSON response bodies
/// ├── endpoint  — routing, handlers and the tiny_http worker pool
/// └── fixtures (test only) — in-memory store and sample dataset
/// ```

pub mod config;
pub mod dates;
pub mod db;
pub mod endpoint;
pub mod model;
pub mod schema;
pub mod store;

#[cfg(test)]
mod fixtures;
