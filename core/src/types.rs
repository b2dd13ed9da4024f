//! Shared primitive types used across the crate.

/// Primary key of a financial entity (bank/lender).
pub type EntityId = i64;

/// Primary key of a vehicle in dealership inventory.
pub type VehicleId = i64;

/// Primary key of a dealership.
pub type DealershipId = i64;

/// Identifier of one bulk recompute run.
pub type BatchId = String;
