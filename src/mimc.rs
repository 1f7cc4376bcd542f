//! MiMC-5 field hasher over the BN254 scalar field.
//!
//! 110 rounds of x^5 with round constants derived by iterating Keccak-256
//! over the ASCII seed `"seed"` (digests interpreted big-endian, reduced
//! into the field). Absorption is one element per block:
//! `h' = h + E_h(m) + m`, where the keyed permutation `E_h` folds the key
//! back in after its final round.

use num_bigint::BigUint;
use tiny_keccak::{Hasher, Keccak};

use crate::engine::ArithmeticEngine;
use crate::transcript::FieldHasher;

pub const MIMC5_NUM_ROUNDS: usize = 110;

const SEED: &str = "seed";

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut output = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut output);
    output
}

/// Round constants as big integers; the engine reduces them into the field.
pub fn generate_mimc_constants(n_rounds: usize) -> Vec<BigUint> {
    let mut digest = keccak256(SEED.as_bytes());
    (0..n_rounds)
        .map(|_| {
            digest = keccak256(&digest);
            BigUint::from_bytes_be(&digest)
        })
        .collect()
}

pub struct MimcFieldHasher<E: ArithmeticEngine> {
    constants: Vec<E::Var>,
}

impl<E: ArithmeticEngine> MimcFieldHasher<E> {
    pub fn new(api: &mut E) -> Self {
        let constants = generate_mimc_constants(MIMC5_NUM_ROUNDS)
            .iter()
            .map(|c| api.constant(c))
            .collect();
        Self { constants }
    }

    fn pow5(api: &mut E, x: &E::Var) -> E::Var {
        let x2 = api.mul(x, x);
        let x4 = api.mul(&x2, &x2);
        api.mul(&x4, x)
    }

    /// The keyed MiMC-5 permutation, key folded in after the last round.
    fn mimc5_hash(&self, api: &mut E, h: &E::Var, x_in: &E::Var) -> E::Var {
        let mut x = x_in.clone();
        for c in &self.constants {
            let keyed = api.add(&x, h);
            let keyed = api.add(&keyed, c);
            x = Self::pow5(api, &keyed);
        }
        api.add(&x, h)
    }
}

impl<E: ArithmeticEngine> FieldHasher<E> for MimcFieldHasher<E> {
    fn state_capacity(&self) -> usize {
        1
    }

    fn hash_to_state(&self, api: &mut E, inputs: &[E::Var]) -> (Vec<E::Var>, usize) {
        let mut h = api.constant_u64(0);
        for m in inputs {
            let r = self.mimc5_hash(api, &h, m);
            h = api.add(&h, &r);
            h = api.add(&h, m);
        }
        (vec![h], inputs.len())
    }
}
