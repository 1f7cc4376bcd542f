//! Poseidon permutation over M31, width 16, rate 8.
//!
//! Parameters are derived deterministically: the ASCII seed
//! `"poseidon_seed_Mersenne 31_16"` is iterated through Keccak-256 once per
//! round constant (22 rounds x 16 lanes), each digest contributing its first
//! four bytes as a little-endian u32 reduced mod 2^31 - 1. The MDS matrix is
//! the 16x16 circulant over a fixed small-entry first row. Every round adds
//! constants, applies the MDS matrix, then the x^5 S-box; partial rounds
//! restrict the S-box to lane 0.

use tiny_keccak::{Hasher, Keccak};

use crate::engine::ArithmeticEngine;
use crate::m31_field::M31_MODULUS;
use crate::transcript::FieldHasher;

pub const POSEIDON_M31X16_STATE_WIDTH: usize = 16;
pub const POSEIDON_M31X16_RATE: usize = 8;
pub const POSEIDON_M31X16_FULL_ROUNDS: usize = 8;
pub const POSEIDON_M31X16_PARTIAL_ROUNDS: usize = 14;

const POSEIDON_SEED: &str = "poseidon_seed_Mersenne 31_16";

/// First row of the circulant MDS matrix; row i is its cyclic shift by i.
pub const MDS_CIRC_FIRST_ROW: [u32; POSEIDON_M31X16_STATE_WIDTH] =
    [1, 1, 51, 1, 11, 17, 2, 1, 101, 63, 15, 2, 67, 22, 13, 3];

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut output = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut output);
    output
}

/// Round constants, one state-width row per round.
pub fn poseidon_m31x16_round_constants() -> Vec<[u32; POSEIDON_M31X16_STATE_WIDTH]> {
    let total_rounds = POSEIDON_M31X16_FULL_ROUNDS + POSEIDON_M31X16_PARTIAL_ROUNDS;
    let mut digest = keccak256(POSEIDON_SEED.as_bytes());

    (0..total_rounds)
        .map(|_| {
            let mut row = [0u32; POSEIDON_M31X16_STATE_WIDTH];
            for lane in row.iter_mut() {
                digest = keccak256(&digest);
                let raw = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
                *lane = raw % M31_MODULUS;
            }
            row
        })
        .collect()
}

pub struct PoseidonM31x16Hasher<E: ArithmeticEngine> {
    round_constants: Vec<Vec<E::Var>>,
    mds_first_row: Vec<E::Var>,
}

impl<E: ArithmeticEngine> PoseidonM31x16Hasher<E> {
    pub fn new(api: &mut E) -> Self {
        let round_constants = poseidon_m31x16_round_constants()
            .iter()
            .map(|row| row.iter().map(|&c| api.constant_u64(c as u64)).collect())
            .collect();
        let mds_first_row = MDS_CIRC_FIRST_ROW
            .iter()
            .map(|&c| api.constant_u64(c as u64))
            .collect();
        Self {
            round_constants,
            mds_first_row,
        }
    }

    fn add_round_constants(&self, api: &mut E, state: &mut [E::Var], round: usize) {
        for (lane, c) in state.iter_mut().zip(&self.round_constants[round]) {
            *lane = api.add(lane, c);
        }
    }

    fn apply_mds(&self, api: &mut E, state: &mut Vec<E::Var>) {
        let width = POSEIDON_M31X16_STATE_WIDTH;
        let mut next = Vec::with_capacity(width);
        for i in 0..width {
            let mut acc = api.constant_u64(0);
            for (j, lane) in state.iter().enumerate() {
                let term = api.mul(&self.mds_first_row[(i + j) % width], lane);
                acc = api.add(&acc, &term);
            }
            next.push(acc);
        }
        *state = next;
    }

    fn sbox(api: &mut E, x: &E::Var) -> E::Var {
        let x2 = api.mul(x, x);
        let x4 = api.mul(&x2, &x2);
        api.mul(&x4, x)
    }

    fn permute(&self, api: &mut E, state: &mut Vec<E::Var>) {
        let half_full = POSEIDON_M31X16_FULL_ROUNDS / 2;
        let partial_end = half_full + POSEIDON_M31X16_PARTIAL_ROUNDS;
        let total = partial_end + half_full;

        for round in 0..total {
            self.add_round_constants(api, state, round);
            self.apply_mds(api, state);
            if round < half_full || round >= partial_end {
                for lane in state.iter_mut() {
                    *lane = Self::sbox(api, lane);
                }
            } else {
                state[0] = Self::sbox(api, &state[0]);
            }
        }
    }
}

impl<E: ArithmeticEngine> FieldHasher<E> for PoseidonM31x16Hasher<E> {
    fn state_capacity(&self) -> usize {
        POSEIDON_M31X16_RATE
    }

    /// Absorb `inputs` (zero-padded to a rate multiple) into a zero state:
    /// each chunk is added into lanes 8..16, then the state is permuted.
    /// Returns the full 16-lane state and the permutation count.
    fn hash_to_state(&self, api: &mut E, inputs: &[E::Var]) -> (Vec<E::Var>, usize) {
        let zero = api.constant_u64(0);
        let mut elems = inputs.to_vec();
        while elems.len() % POSEIDON_M31X16_RATE != 0 {
            elems.push(zero.clone());
        }

        let mut state = vec![zero; POSEIDON_M31X16_STATE_WIDTH];
        let mut permutations = 0;
        for chunk in elems.chunks_exact(POSEIDON_M31X16_RATE) {
            for (i, elem) in chunk.iter().enumerate() {
                let lane = POSEIDON_M31X16_RATE + i;
                state[lane] = api.add(&state[lane], elem);
            }
            self.permute(api, &mut state);
            permutations += 1;
        }

        (state, permutations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::M31Engine;

    #[test]
    fn test_round_constant_fixed_point() {
        let constants = poseidon_m31x16_round_constants();
        assert_eq!(
            constants.len(),
            POSEIDON_M31X16_FULL_ROUNDS + POSEIDON_M31X16_PARTIAL_ROUNDS
        );
        assert_eq!(constants[0][0], 80596940);
    }

    #[test]
    fn test_hash_to_state_single_chunk_vector() {
        let mut api = M31Engine;
        let hasher = PoseidonM31x16Hasher::new(&mut api);
        let inputs = [114514u32; 8];
        let (state, permutations) = hasher.hash_to_state(&mut api, &inputs);
        assert_eq!(permutations, 1);
        assert_eq!(
            state,
            vec![
                1021105124, 1342990709, 1593716396, 2100280498, 330652568, 1371365483, 586650367,
                345482939, 849034538, 175601510, 1454280121, 1362077584, 528171622, 187534772,
                436020341, 1441052621,
            ]
        );
    }

    #[test]
    fn test_hash_to_state_two_chunk_vector() {
        let mut api = M31Engine;
        let hasher = PoseidonM31x16Hasher::new(&mut api);
        let inputs = [114514u32; 16];
        let (state, permutations) = hasher.hash_to_state(&mut api, &inputs);
        assert_eq!(permutations, 2);
        assert_eq!(
            state,
            vec![
                1510043913, 1840611937, 45881205, 1134797377, 803058407, 1772167459, 846553905,
                2143336151, 300871060, 545838827, 1603101164, 396293243, 502075988, 2067011878,
                402134378, 535675968,
            ]
        );
    }

    #[test]
    fn test_padding_reaches_rate_boundary() {
        let mut api = M31Engine;
        let hasher = PoseidonM31x16Hasher::new(&mut api);
        let (short, n_short) = hasher.hash_to_state(&mut api, &[7, 8, 9]);
        let (padded, n_padded) = hasher.hash_to_state(&mut api, &[7, 8, 9, 0, 0, 0, 0, 0]);
        assert_eq!(short, padded);
        assert_eq!(n_short, 1);
        assert_eq!(n_padded, 1);
    }

    #[test]
    fn test_absorption_is_order_sensitive() {
        let mut api = M31Engine;
        let hasher = PoseidonM31x16Hasher::new(&mut api);
        let (a, _) = hasher.hash_to_state(&mut api, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let (b, _) = hasher.hash_to_state(&mut api, &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_ne!(a, b);
    }
}
