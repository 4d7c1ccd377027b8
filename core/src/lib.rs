//! Ingredient graph, food log and nutrition queries for `fat`.
//!
//! Records are parsed by [`script`], applied to a [`db::FoodLog`], and the
//! sealed [`db::FoodDb`] answers totals, daily means, time series and blame
//! queries.

pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod script;
pub mod service;
pub mod stats;
pub mod store;

pub use db::{FoodDb, FoodLog};
pub use error::{FoodError, FoodResult};
pub use stats::TimeSeries;
