//! Pre-allocated workspace for the layer-by-layer sumcheck verifier.
//!
//! Equality-polynomial tables are sized once to the largest layer and
//! reused for every layer; the degree-2/3 reconstruction constants are
//! computed once up front.

use std::collections::HashMap;

use crate::circuit::Circuit;
use crate::engine::ArithmeticEngine;

pub struct ScratchPad<V> {
    pub eq_evals_at_rz0: Vec<Vec<V>>,
    pub eq_evals_at_rz1: Vec<Vec<V>>,
    pub eq_evals_at_r_simd: Vec<Vec<V>>,
    pub eq_evals_at_r_mpi: Vec<Vec<V>>,

    pub eq_evals_at_rx: Vec<Vec<V>>,
    pub eq_evals_at_ry: Vec<Vec<V>>,

    /// Temporaries for the tensor-product split.
    pub eq_evals_first_part: Vec<Vec<V>>,
    pub eq_evals_second_part: Vec<Vec<V>>,

    /// Current-layer challenge copies, for the closing dot products.
    pub r_simd: Vec<Vec<V>>,
    pub r_mpi: Vec<Vec<V>>,
    pub eq_r_simd_r_simd_xy: Vec<V>,
    pub eq_r_mpi_r_mpi_xy: Vec<V>,

    pub inv2: V,
    pub deg3_eval_at: [V; 4],
    pub deg3_lag_denoms_inv: [V; 4],

    /// Size -> expansion count; diagnostics only.
    pub eq_evals_count: HashMap<usize, usize>,
}

impl<V: Clone> ScratchPad<V> {
    pub fn new<E>(api: &mut E, circuit: &Circuit<V>, mpi_size: usize) -> Result<Self, String>
    where
        E: ArithmeticEngine<Var = V>,
    {
        let mut max_num_vars = 0;
        for layer in &circuit.layers {
            max_num_vars = max_num_vars.max(layer.input_len_log).max(layer.output_len_log);
        }
        let max_io_size = 1usize << max_num_vars;

        let two = api.constant_u64(2);
        let inv2 = api.inverse(&two)?;

        let deg3_eval_at = [
            api.constant_u64(0),
            api.constant_u64(1),
            api.constant_u64(2),
            api.constant_u64(3),
        ];
        let mut deg3_lag_denoms_inv = deg3_eval_at.clone();
        for i in 0..4 {
            let mut denominator = api.constant_u64(1);
            for j in 0..4 {
                if j == i {
                    continue;
                }
                let diff = api.sub(&deg3_eval_at[i], &deg3_eval_at[j]);
                denominator = api.mul(&denominator, &diff);
            }
            deg3_lag_denoms_inv[i] = api.inverse(&denominator)?;
        }

        let simd_size = api.simd_pack_size();
        // The halves also stage the SIMD and MPI expansions, which can be
        // wider than any wire table on small circuits.
        let staging_size = max_io_size.max(simd_size).max(mpi_size);
        Ok(Self {
            eq_evals_at_rz0: api.zeroes(max_io_size),
            eq_evals_at_rz1: api.zeroes(max_io_size),
            eq_evals_at_r_simd: api.zeroes(simd_size),
            eq_evals_at_r_mpi: api.zeroes(mpi_size),

            eq_evals_at_rx: api.zeroes(max_io_size),
            eq_evals_at_ry: api.zeroes(max_io_size),

            eq_evals_first_part: api.zeroes(staging_size),
            eq_evals_second_part: api.zeroes(staging_size),

            r_simd: Vec::new(),
            r_mpi: Vec::new(),
            eq_r_simd_r_simd_xy: api.one(),
            eq_r_mpi_r_mpi_xy: api.one(),

            inv2,
            deg3_eval_at,
            deg3_lag_denoms_inv,

            eq_evals_count: HashMap::new(),
        })
    }
}
