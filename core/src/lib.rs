//! Financing quote resolution for dealership inventory.
//!
//! Leaf to root:
//!   campaign    → vehicle age and new/used classification
//!   matcher     → rate/term/campaign rule selection per entity
//!   fee         → rule-table fee and reference code
//!   ranker      → ordering of computed offers
//!   resolver    → single quote request entry point
//!   inventory   → sequential bulk recompute over a dealership
//!
//! `amortization` is the standalone formula path used by the simulator.

pub mod amortization;
pub mod campaign;
pub mod clock;
pub mod config;
pub mod error;
pub mod fee;
pub mod inventory;
pub mod matcher;
pub mod model;
pub mod ranker;
pub mod resolver;
pub mod store;
pub mod types;
