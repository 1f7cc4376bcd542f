//! Witness stream: per-instance private and public inputs.
//!
//! The serialized stream interleaves `[private..., public...]` per instance.
//! The commitment the prover sends tiles witnesses across MPI ranks, so the
//! loader replicates the whole stream `mpi_size` times before splitting.

use num_bigint::BigUint;

use crate::engine::ArithmeticEngine;

#[derive(Clone, Debug)]
pub struct Witness {
    pub num_witnesses: usize,
    pub num_private_inputs_per_witness: usize,
    pub num_public_inputs_per_witness: usize,
    /// Interleaved `[private..., public...]` per instance.
    pub values: Vec<BigUint>,
}

impl Witness {
    /// Replicate the stream for each MPI rank.
    pub fn tile_for_mpi(&mut self, mpi_size: usize) {
        let per_rank = self.values.len();
        for _ in 1..mpi_size {
            for j in 0..per_rank {
                self.values.push(self.values[j].clone());
            }
        }
        self.num_witnesses *= mpi_size;
    }

    /// Split into (public, private) matrices of engine variables, one row
    /// per instance.
    pub fn to_pub_priv_inputs<E>(
        &self,
        api: &mut E,
    ) -> Result<(Vec<Vec<E::Var>>, Vec<Vec<E::Var>>), String>
    where
        E: ArithmeticEngine,
    {
        let stride = self.num_private_inputs_per_witness + self.num_public_inputs_per_witness;
        if self.values.len() != self.num_witnesses * stride {
            return Err(format!(
                "witness value count {} does not match {} instances of stride {stride}",
                self.values.len(),
                self.num_witnesses
            ));
        }

        let mut pub_inputs = Vec::with_capacity(self.num_witnesses);
        let mut priv_inputs = Vec::with_capacity(self.num_witnesses);
        for instance in 0..self.num_witnesses {
            let base = instance * stride;
            let split = base + self.num_private_inputs_per_witness;
            priv_inputs.push(self.values[base..split].iter().map(|v| api.constant(v)).collect());
            pub_inputs.push(
                self.values[split..base + stride]
                    .iter()
                    .map(|v| api.constant(v))
                    .collect(),
            );
        }
        Ok((pub_inputs, priv_inputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::M31Engine;

    fn witness_fixture() -> Witness {
        Witness {
            num_witnesses: 2,
            num_private_inputs_per_witness: 2,
            num_public_inputs_per_witness: 1,
            values: [10u32, 11, 12, 20, 21, 22]
                .iter()
                .map(|&v| BigUint::from(v))
                .collect(),
        }
    }

    #[test]
    fn test_split_interleaved_instances() {
        let witness = witness_fixture();
        let mut api = M31Engine;
        let (pub_inputs, priv_inputs) = match witness.to_pub_priv_inputs(&mut api) {
            Ok(v) => v,
            Err(err) => {
                assert!(false, "split: {err}");
                return;
            }
        };
        assert_eq!(priv_inputs, vec![vec![10, 11], vec![20, 21]]);
        assert_eq!(pub_inputs, vec![vec![12], vec![22]]);
    }

    #[test]
    fn test_mpi_tiling_replicates_whole_stream() {
        let mut witness = witness_fixture();
        witness.tile_for_mpi(2);
        assert_eq!(witness.num_witnesses, 4);
        assert_eq!(witness.values.len(), 12);
        assert_eq!(witness.values[6..], witness.values[..6]);

        let mut api = M31Engine;
        let (pub_inputs, _) = match witness.to_pub_priv_inputs(&mut api) {
            Ok(v) => v,
            Err(err) => {
                assert!(false, "split: {err}");
                return;
            }
        };
        assert_eq!(pub_inputs.len(), 4);
        assert_eq!(pub_inputs[2], pub_inputs[0]);
    }

    #[test]
    fn test_split_rejects_bad_shape() {
        let mut witness = witness_fixture();
        witness.values.pop();
        let mut api = M31Engine;
        assert!(witness.to_pub_priv_inputs(&mut api).is_err());
    }
}
