//! Generates magic bitboard tables at process start. The engine has no bundled
//! data file: every run (re-)derives its own magics, deterministically when
//! `deterministic_magic` is enabled (useful for reproducible perft timing).

use super::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use super::search::find_magic_number_for_square;
use super::structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
use rand::{SeedableRng, rngs::StdRng};

pub enum MagicTableSeed {
    Fixed(u64),
    Random,
}

/// Walks each of the 4 rays in `deltas` from `square`, dropping the final
/// (board-edge) square of every ray: occupied or not, a piece there can't
/// block anything further, so it never needs a blocker-subset bit.
fn relevant_mask(square: usize, deltas: [(isize, isize); 4]) -> u64 {
    let rank0 = (square / 8) as isize;
    let file0 = (square % 8) as isize;
    let mut mask = 0u64;
    for (dr, df) in deltas {
        let mut rank = rank0 + dr;
        let mut file = file0 + df;
        let mut prev: Option<usize> = None;
        while (0..=7).contains(&rank) && (0..=7).contains(&file) {
            if let Some(p) = prev {
                mask |= 1u64 << p;
            }
            prev = Some((rank * 8 + file) as usize);
            rank += dr;
            file += df;
        }
    }
    mask
}

fn rook_relevant_mask(square: usize) -> u64 {
    relevant_mask(square, [(1, 0), (-1, 0), (0, 1), (0, -1)])
}

fn bishop_relevant_mask(square: usize) -> u64 {
    relevant_mask(square, [(1, 1), (-1, -1), (1, -1), (-1, 1)])
}

/// Enumerates every subset of `mask` (2^popcount(mask) of them) via the
/// standard `(subset - 1) & mask` descending-subset trick.
fn subsets_of(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1 << mask.count_ones());
    let mut subset = 0u64;
    loop {
        subsets.push(subset);
        if subset == mask {
            break;
        }
        subset = subset.wrapping_sub(mask) & mask;
    }
    subsets
}

fn build_entry(
    square: usize,
    mask: u64,
    attacks_fn: impl Fn(usize, u64) -> u64,
    rng: &mut StdRng,
) -> MagicEntry {
    let blockers = subsets_of(mask);
    let attacks: Vec<u64> = blockers.iter().map(|&b| attacks_fn(square, b)).collect();

    let shift = 64 - mask.count_ones();
    let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)
        .expect("magic search should always converge for a legitimate mask");

    let table_len = 1usize << mask.count_ones();
    let mut table = vec![0u64; table_len];
    for (&blocker, &attack) in blockers.iter().zip(attacks.iter()) {
        let idx = ((blocker.wrapping_mul(magic)) >> shift) as usize;
        table[idx] = attack;
    }

    MagicEntry {
        magic,
        shift,
        mask,
        table: table.into_boxed_slice(),
    }
}

pub fn generate_magic_tables(seed: MagicTableSeed) -> Result<MagicTables, String> {
    let mut rng = match seed {
        MagicTableSeed::Fixed(s) => StdRng::seed_from_u64(s),
        MagicTableSeed::Random => {
            #[cfg(feature = "deterministic_magic")]
            {
                StdRng::seed_from_u64(0x5974_4143_4847_5321)
            }
            #[cfg(not(feature = "deterministic_magic"))]
            {
                use rand::RngCore;
                let mut bytes = [0u8; 32];
                rand::rng().fill_bytes(&mut bytes);
                StdRng::from_seed(bytes)
            }
        }
    };

    let mut rook_entries = Vec::with_capacity(64);
    let mut bishop_entries = Vec::with_capacity(64);

    for sq in 0..64usize {
        rook_entries.push(build_entry(
            sq,
            rook_relevant_mask(sq),
            rook_attacks_per_square,
            &mut rng,
        ));
        bishop_entries.push(build_entry(
            sq,
            bishop_relevant_mask(sq),
            bishop_attacks_per_square,
            &mut rng,
        ));
    }

    Ok(MagicTables {
        rook: RookMagicTables {
            entries: rook_entries,
        },
        bishop: BishopMagicTables {
            entries: bishop_entries,
        },
    })
}
