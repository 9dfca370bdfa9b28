// src/services/mod.rs
pub mod dashboard;
pub mod import;
pub mod percent;
pub mod price_probe;
pub mod resolver;
pub mod simulation;
pub mod store;
