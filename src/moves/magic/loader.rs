//! Startup entry point for sliding-piece attack tables.

use super::precompute::{MagicTableSeed, generate_magic_tables};
use super::structs::MagicTables;

/// Builds a fresh set of rook/bishop magic tables. Deterministic under the
/// `deterministic_magic` feature (fixed seed, reproducible timing across
/// runs); otherwise seeded from OS randomness.
pub fn load_magic_tables() -> MagicTables {
    let seed = if cfg!(feature = "deterministic_magic") {
        MagicTableSeed::Fixed(0xC0FF_EE15_5EED_0001)
    } else {
        MagicTableSeed::Random
    };

    generate_magic_tables(seed).expect("magic table generation must converge")
}
