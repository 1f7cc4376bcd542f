//! Polynomial commitments, raw variant.
//!
//! A raw commitment is the complete evaluation vector of the committed
//! multilinear over the Boolean hypercube; opening at a point is a direct
//! multilinear-extension evaluation. The commitment is read straight out of
//! the proof stream and absorbed into the transcript, length prefix
//! included.

use crate::engine::ArithmeticEngine;
use crate::proof::Proof;
use crate::transcript::FieldHasherTranscript;

/// Byte width of the serialized evaluation-count prefix.
pub const RAW_COMMITMENT_LENGTH_BYTES: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitmentScheme {
    Raw,
}

/// The single capability the verifier needs from a commitment scheme.
pub trait PolynomialCommitment<E: ArithmeticEngine> {
    /// Check the opening `y` at the challenge point assembled from
    /// `(r_simd, rs, r_mpi)`.
    fn verify(
        &self,
        api: &mut E,
        rs: &[Vec<E::Var>],
        r_simd: &[Vec<E::Var>],
        r_mpi: &[Vec<E::Var>],
        y: &[E::Var],
    ) -> Result<(), String>;
}

/// Standard halving evaluation of a multilinear from its hypercube values.
pub fn eval_multilinear<E>(
    api: &mut E,
    values: &[E::Var],
    point: &[Vec<E::Var>],
) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    if point.len() >= usize::BITS as usize || (1usize << point.len()) != values.len() {
        return Err(format!(
            "multilinear shape mismatch: {} values for {} variables",
            values.len(),
            point.len()
        ));
    }

    let mut buffer: Vec<Vec<E::Var>> = values.iter().map(|v| api.to_extension(v)).collect();
    for (i, r) in point.iter().enumerate() {
        let pairs = values.len() >> (i + 1);
        for j in 0..pairs {
            let lo = buffer[2 * j].clone();
            let hi = buffer[2 * j + 1].clone();
            let diff = api.extension_sub(&hi, &lo)?;
            let scaled = api.extension_mul(&diff, r)?;
            buffer[j] = api.extension_add(&lo, &scaled)?;
        }
    }
    Ok(buffer[0].clone())
}

pub struct RawCommitment<V> {
    pub evals: Vec<V>,
}

impl<V: Clone + PartialEq + std::fmt::Debug> RawCommitment<V> {
    /// Read the commitment out of the proof stream: the length prefix
    /// (`RAW_COMMITMENT_LENGTH_BYTES / field_bytes` elements) followed by
    /// `circuit_input_size * mpi_size * simd_pack_size` evaluations. Every
    /// element is appended to the transcript.
    pub fn from_proof<E>(
        api: &mut E,
        circuit_input_size: usize,
        mpi_size: usize,
        proof: &mut Proof,
        transcript: &mut FieldHasherTranscript<E>,
    ) -> Result<Self, String>
    where
        E: ArithmeticEngine<Var = V>,
    {
        let field = api.field_kind();
        let length_prefix_elems = RAW_COMMITMENT_LENGTH_BYTES / field.field_bytes();
        for _ in 0..length_prefix_elems {
            let elem = api.constant(&proof.next()?);
            transcript.append_f(elem);
        }

        let commitment_len = circuit_input_size * mpi_size * field.simd_pack_size();
        let mut evals = Vec::with_capacity(commitment_len);
        for _ in 0..commitment_len {
            let elem = api.constant(&proof.next()?);
            transcript.append_f(elem.clone());
            evals.push(elem);
        }

        Ok(Self { evals })
    }
}

impl<E> PolynomialCommitment<E> for RawCommitment<E::Var>
where
    E: ArithmeticEngine,
{
    fn verify(
        &self,
        api: &mut E,
        rs: &[Vec<E::Var>],
        r_simd: &[Vec<E::Var>],
        r_mpi: &[Vec<E::Var>],
        y: &[E::Var],
    ) -> Result<(), String> {
        let mut point = Vec::with_capacity(r_simd.len() + rs.len() + r_mpi.len());
        point.extend_from_slice(r_simd);
        point.extend_from_slice(rs);
        point.extend_from_slice(r_mpi);

        let opened = eval_multilinear(api, &self.evals, &point)?;
        api.extension_assert_eq(&opened, y)
    }
}

/// Extract a commitment of the requested scheme from the proof stream.
pub fn new_commitment<E>(
    scheme: CommitmentScheme,
    api: &mut E,
    circuit_input_size: usize,
    mpi_size: usize,
    proof: &mut Proof,
    transcript: &mut FieldHasherTranscript<E>,
) -> Result<Box<dyn PolynomialCommitment<E>>, String>
where
    E: ArithmeticEngine + 'static,
    E::Var: 'static,
{
    match scheme {
        CommitmentScheme::Raw => {
            let commitment =
                RawCommitment::from_proof(api, circuit_input_size, mpi_size, proof, transcript)?;
            Ok(Box::new(commitment))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::M31Engine;
    use crate::sumcheck_helper::eq_evals_at_primitive;
    use num_bigint::BigUint;

    fn sample_point(api: &mut M31Engine, n: usize, seed: u64) -> Vec<Vec<u32>> {
        (0..n)
            .map(|i| {
                let base = seed.wrapping_mul(2862933555777941757).wrapping_add(i as u64);
                vec![
                    api.constant_u64(base),
                    api.constant_u64(base.wrapping_mul(97)),
                    api.constant_u64(base.wrapping_mul(65537)),
                ]
            })
            .collect()
    }

    #[test]
    fn test_eval_multilinear_matches_eq_weighted_sum() {
        let mut api = M31Engine;
        let values: Vec<u32> = (0..8u64).map(|v| api.constant_u64(v * v + 3)).collect();
        let point = sample_point(&mut api, 3, 99);

        let evaluated = match eval_multilinear(&mut api, &values, &point) {
            Ok(v) => v,
            Err(err) => panic!("eval: {err}"),
        };

        let one = api.one();
        let mut eq_table = api.zeroes(8);
        if let Err(err) = eq_evals_at_primitive(&mut api, &point, &one, &mut eq_table) {
            panic!("eq table: {err}");
        }
        let mut expected = api.zero();
        for (value, eq) in values.iter().zip(&eq_table) {
            let lifted = api.to_extension(value);
            let term = match api.extension_mul(&lifted, eq) {
                Ok(v) => v,
                Err(err) => panic!("mul: {err}"),
            };
            expected = match api.extension_add(&expected, &term) {
                Ok(v) => v,
                Err(err) => panic!("add: {err}"),
            };
        }
        assert_eq!(evaluated, expected);
    }

    #[test]
    fn test_eval_multilinear_shape_mismatch() {
        let mut api = M31Engine;
        let values = vec![1u32, 2, 3];
        let point = sample_point(&mut api, 2, 1);
        assert!(eval_multilinear(&mut api, &values, &point).is_err());
    }

    #[test]
    fn test_from_proof_consumes_prefix_and_evals() {
        let mut api = M31Engine;
        let mut transcript = match FieldHasherTranscript::new(&mut api) {
            Ok(t) => t,
            Err(err) => panic!("transcript: {err}"),
        };

        // M31: 32-byte prefix = 8 elements; evals = 1 * 1 * 16.
        let elems: Vec<BigUint> = (0..(8 + 16 + 4) as u32).map(BigUint::from).collect();
        let mut proof = Proof::new(elems);
        let commitment =
            match RawCommitment::<u32>::from_proof(&mut api, 1, 1, &mut proof, &mut transcript) {
                Ok(c) => c,
                Err(err) => panic!("from_proof: {err}"),
            };
        assert_eq!(commitment.evals.len(), 16);
        assert_eq!(commitment.evals[0], 8);
        assert_eq!(proof.remaining(), 4);

        // Everything read so far is pending in the transcript pool: the
        // first squeeze hashes 24 elements = 3 permutations.
        match transcript.circuit_f(&mut api) {
            Ok(_) => {}
            Err(err) => panic!("circuit_f: {err}"),
        }
        assert_eq!(transcript.get_count(), 3);
    }

    #[test]
    fn test_from_proof_rejects_short_stream() {
        let mut api = M31Engine;
        let mut transcript = match FieldHasherTranscript::new(&mut api) {
            Ok(t) => t,
            Err(err) => panic!("transcript: {err}"),
        };
        let elems: Vec<BigUint> = (0..10u32).map(BigUint::from).collect();
        let mut proof = Proof::new(elems);
        assert!(
            RawCommitment::<u32>::from_proof(&mut api, 1, 1, &mut proof, &mut transcript).is_err()
        );
    }
}
