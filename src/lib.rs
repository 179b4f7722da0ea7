//! Lattice packing: crossed slotted combs forming a grid of cells, with an
//! optimizer that picks the comb pair, notch selections and outer shipping
//! box with the lowest cost per stored item.

pub mod api;
pub mod catalog;
pub mod config;
pub mod geometry;
pub mod model;
pub mod optimizer;
pub mod packaging;
pub mod session;
pub mod types;
