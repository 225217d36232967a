//! Cost unit conversion
//!
//! Declarations express token costs per million tokens; the gateway stores
//! them per token.

const UNITS_PER_MILLION: f64 = 1_000_000.0;

/// Per-million cost to per-unit cost
pub fn to_per_unit(per_million: f64) -> f64 {
    per_million / UNITS_PER_MILLION
}

/// Per-unit cost to per-million cost
pub fn to_per_million(per_unit: f64) -> f64 {
    per_unit * UNITS_PER_MILLION
}
