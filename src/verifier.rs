//! GKR verification driver.
//!
//! `verify` absorbs the input commitment, back-fills random coefficients,
//! then walks the circuit from the output layer down to the input layer.
//! Each layer runs the sumcheck rounds (degree 2 over the wire variables,
//! degree 3 over the SIMD and MPI variables), reduces the claim to
//! evaluations of the input polynomial, and the final claims are checked
//! against the polynomial commitment. The proof stream and the transcript
//! schedule must match the prover exactly; any divergence fails a check.

use crate::circuit::{Circuit, Layer};
use crate::engine::ArithmeticEngine;
use crate::poly_commit::{new_commitment, CommitmentScheme};
use crate::proof::Proof;
use crate::scratch_pad::ScratchPad;
use crate::sumcheck_helper::{
    degree2_eval, degree3_eval, eval_add, eval_cst, eval_mul, prepare_layer, set_r_mpi_xy,
    set_r_simd_xy, set_rx, set_ry,
};
use crate::transcript::FieldHasherTranscript;

/// Read one extension-field element off the proof stream.
fn next_challenge_f<E>(api: &mut E, proof: &mut Proof) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    let degree = api.challenge_field_degree();
    let mut elem = Vec::with_capacity(degree);
    for _ in 0..degree {
        elem.push(api.constant(&proof.next()?));
    }
    Ok(elem)
}

/// One sumcheck round: read `degree + 1` polynomial evaluations, bind them
/// to the transcript, check consistency with the claimed sum, and reduce
/// the claim to the drawn point.
#[allow(clippy::too_many_arguments)]
pub fn sumcheck_step_verify<E>(
    api: &mut E,
    proof: &mut Proof,
    degree: usize,
    transcript: &mut FieldHasherTranscript<E>,
    claimed_sum: &[E::Var],
    randomness_vec: &mut Vec<Vec<E::Var>>,
    sp: &ScratchPad<E::Var>,
) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    let mut ps = Vec::with_capacity(degree + 1);
    for _ in 0..=degree {
        let p = next_challenge_f(api, proof)?;
        transcript.append_fs(&p);
        ps.push(p);
    }

    let r = transcript.challenge_f(api)?;
    randomness_vec.push(r.clone());

    let p0_plus_p1 = api.extension_add(&ps[0], &ps[1])?;
    api.extension_assert_eq(&p0_plus_p1, claimed_sum)?;

    match degree {
        2 => degree2_eval(api, &ps, &r, sp),
        3 => degree3_eval(api, &ps, &r, sp),
        _ => Err(format!("unsupported sumcheck degree {degree}")),
    }
}

/// Everything one layer's verification hands to the next.
pub struct LayerReduction<V> {
    pub rx: Vec<Vec<V>>,
    pub ry: Option<Vec<Vec<V>>>,
    pub r_simd_xy: Vec<Vec<V>>,
    pub r_mpi_xy: Vec<Vec<V>>,
    pub vx_claim: Vec<V>,
    pub vy_claim: Option<Vec<V>>,
}

#[allow(clippy::too_many_arguments)]
pub fn sumcheck_layer_verify<E>(
    api: &mut E,
    layer: &Layer<E::Var>,
    public_input: &[Vec<E::Var>],
    rz0: &[Vec<E::Var>],
    rz1: Option<&[Vec<E::Var>]>,
    r_simd: &[Vec<E::Var>],
    r_mpi: &[Vec<E::Var>],
    claimed_v0: &[E::Var],
    claimed_v1: Option<&[E::Var]>,
    alpha: Option<&[E::Var]>,
    proof: &mut Proof,
    transcript: &mut FieldHasherTranscript<E>,
    sp: &mut ScratchPad<E::Var>,
    is_output_layer: bool,
) -> Result<LayerReduction<E::Var>, String>
where
    E: ArithmeticEngine,
{
    prepare_layer(api, layer, alpha, rz0, rz1, r_simd, r_mpi, sp, is_output_layer)?;

    let var_num = layer.input_len_log;

    let mut sum = claimed_v0.to_vec();
    if let (Some(alpha), Some(claimed_v1)) = (alpha, claimed_v1) {
        let folded = api.extension_mul(alpha, claimed_v1)?;
        sum = api.extension_add(&sum, &folded)?;
    }
    let cst_eval = eval_cst(api, &layer.cst, public_input, sp)?;
    sum = api.extension_sub(&sum, &cst_eval)?;

    let mut rx = Vec::new();
    let mut r_simd_xy = Vec::new();
    let mut r_mpi_xy = Vec::new();

    for _ in 0..var_num {
        sum = sumcheck_step_verify(api, proof, 2, transcript, &sum, &mut rx, sp)?;
    }
    set_rx(api, &rx, sp)?;

    for _ in 0..r_simd.len() {
        sum = sumcheck_step_verify(api, proof, 3, transcript, &sum, &mut r_simd_xy, sp)?;
    }
    set_r_simd_xy(api, &r_simd_xy, sp)?;

    for _ in 0..r_mpi.len() {
        sum = sumcheck_step_verify(api, proof, 3, transcript, &sum, &mut r_mpi_xy, sp)?;
    }
    set_r_mpi_xy(api, &r_mpi_xy, sp)?;

    let vx_claim = next_challenge_f(api, proof)?;
    let add_eval = eval_add(api, &layer.add, sp)?;
    let vx_weighted = api.extension_mul(&vx_claim, &add_eval)?;
    sum = api.extension_sub(&sum, &vx_weighted)?;
    transcript.append_fs(&vx_claim);

    if layer.max_degree_one {
        let zero = api.zero();
        api.extension_assert_eq(&sum, &zero)?;
        return Ok(LayerReduction {
            rx,
            ry: None,
            r_simd_xy,
            r_mpi_xy,
            vx_claim,
            vy_claim: None,
        });
    }

    let mut ry = Vec::new();
    for _ in 0..var_num {
        sum = sumcheck_step_verify(api, proof, 2, transcript, &sum, &mut ry, sp)?;
    }
    set_ry(api, &ry, sp)?;

    let vy_claim = next_challenge_f(api, proof)?;
    transcript.append_fs(&vy_claim);
    let mul_eval = eval_mul(api, &layer.mul, sp)?;
    let expected = api.extension_mul(&vx_claim, &vy_claim)?;
    let expected = api.extension_mul(&expected, &mul_eval)?;
    api.extension_assert_eq(&sum, &expected)?;

    Ok(LayerReduction {
        rx,
        ry: Some(ry),
        r_simd_xy,
        r_mpi_xy,
        vx_claim,
        vy_claim: Some(vy_claim),
    })
}

/// The final evaluation claims `gkr_verify` reduces the circuit to.
pub struct GkrOutcome<V> {
    pub rz0: Vec<Vec<V>>,
    pub rz1: Option<Vec<Vec<V>>>,
    pub r_simd: Vec<Vec<V>>,
    pub r_mpi: Vec<Vec<V>>,
    pub claimed_v0: Vec<V>,
    pub claimed_v1: Option<Vec<V>>,
}

pub fn gkr_verify<E>(
    api: &mut E,
    circuit: &Circuit<E::Var>,
    public_input: &[Vec<E::Var>],
    claimed_v: &[E::Var],
    mpi_size: usize,
    transcript: &mut FieldHasherTranscript<E>,
    proof: &mut Proof,
) -> Result<GkrOutcome<E::Var>, String>
where
    E: ArithmeticEngine,
{
    let mut sp = ScratchPad::new(api, circuit, mpi_size)?;

    let n_layers = circuit.layers.len();
    let output_layer = circuit
        .layers
        .last()
        .ok_or_else(|| "circuit has no layers".to_string())?;

    let mut rz0 = Vec::with_capacity(output_layer.output_len_log);
    for _ in 0..output_layer.output_len_log {
        rz0.push(transcript.challenge_f(api)?);
    }

    let simd_var_num = api.simd_pack_size().trailing_zeros() as usize;
    let mut r_simd = Vec::with_capacity(simd_var_num);
    for _ in 0..simd_var_num {
        r_simd.push(transcript.challenge_f(api)?);
    }

    let mpi_var_num = mpi_size.trailing_zeros() as usize;
    let mut r_mpi = Vec::with_capacity(mpi_var_num);
    for _ in 0..mpi_var_num {
        r_mpi.push(transcript.challenge_f(api)?);
    }

    let mut rz1: Option<Vec<Vec<E::Var>>> = None;
    let mut alpha: Option<Vec<E::Var>> = None;
    let mut claimed_v0 = claimed_v.to_vec();
    let mut claimed_v1: Option<Vec<E::Var>> = None;

    for i in (0..n_layers).rev() {
        let reduction = sumcheck_layer_verify(
            api,
            &circuit.layers[i],
            public_input,
            &rz0,
            rz1.as_deref(),
            &r_simd,
            &r_mpi,
            &claimed_v0,
            claimed_v1.as_deref(),
            alpha.as_deref(),
            proof,
            transcript,
            &mut sp,
            i == n_layers - 1,
        )?;

        rz0 = reduction.rx;
        rz1 = reduction.ry;
        r_simd = reduction.r_simd_xy;
        r_mpi = reduction.r_mpi_xy;
        claimed_v0 = reduction.vx_claim;
        claimed_v1 = reduction.vy_claim;

        alpha = if rz1.is_some() && claimed_v1.is_some() {
            Some(transcript.challenge_f(api)?)
        } else {
            None
        };
    }

    for (size, count) in &sp.eq_evals_count {
        tracing::info!(size = *size, count = *count, "eq evals expansion");
    }

    Ok(GkrOutcome {
        rz0,
        rz1,
        r_simd,
        r_mpi,
        claimed_v0,
        claimed_v1,
    })
}

/// Verify a GKR proof end to end. `claimed_v` is the output claim the
/// caller embeds (all-zero leading output wires give a zero claim).
pub fn verify<E>(
    api: &mut E,
    circuit: &mut Circuit<E::Var>,
    public_input: &[Vec<E::Var>],
    claimed_v: &[E::Var],
    mpi_size: usize,
    proof: &mut Proof,
) -> Result<(), String>
where
    E: ArithmeticEngine + 'static,
    E::Var: 'static,
{
    if mpi_size == 0 || !mpi_size.is_power_of_two() {
        return Err(format!("mpi size {mpi_size} is not a power of two"));
    }

    let mut transcript = FieldHasherTranscript::new(api)?;

    let circuit_input_size = 1usize
        << circuit
            .layers
            .first()
            .ok_or_else(|| "circuit has no layers".to_string())?
            .input_len_log;

    let commitment = new_commitment(
        CommitmentScheme::Raw,
        api,
        circuit_input_size,
        mpi_size,
        proof,
        &mut transcript,
    )?;

    // Synchronization barrier mirroring the prover's cross-rank hash.
    if mpi_size > 1 {
        let state = transcript.hash_and_return_state(api);
        transcript.set_state(state);
    }

    tracing::info!(hashes = transcript.get_count(), "#Hashes for input");
    transcript.reset_count();

    circuit.fill_rnd_coefs(api, &mut transcript)?;
    tracing::info!(hashes = transcript.get_count(), "#Hashes for random gate");
    transcript.reset_count();

    let outcome = gkr_verify(
        api,
        circuit,
        public_input,
        claimed_v,
        mpi_size,
        &mut transcript,
        proof,
    )?;
    tracing::info!(hashes = transcript.get_count(), "#Hashes for gkr challenge");
    transcript.reset_count();

    let expected_simd_vars = api.simd_pack_size().trailing_zeros() as usize;
    if outcome.r_simd.len() != expected_simd_vars {
        return Err(format!(
            "simd challenge count {} does not match pack size {}",
            outcome.r_simd.len(),
            api.simd_pack_size()
        ));
    }

    commitment.verify(
        api,
        &outcome.rz0,
        &outcome.r_simd,
        &outcome.r_mpi,
        &outcome.claimed_v0,
    )?;
    if let (Some(rz1), Some(claimed_v1)) = (&outcome.rz1, &outcome.claimed_v1) {
        commitment.verify(api, rz1, &outcome.r_simd, &outcome.r_mpi, claimed_v1)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Coef, Gate};
    use crate::engine::{Bn254Engine, M31Engine};
    use ark_bn254::Fr;
    use ark_ff::{One, PrimeField, Zero};
    use num_bigint::BigUint;

    fn fr_to_biguint(v: &Fr) -> BigUint {
        BigUint::from(v.into_bigint())
    }

    fn linear_layer(coefs: &[(usize, usize, BigUint)]) -> Layer<Fr> {
        Layer {
            input_len_log: 1,
            output_len_log: 1,
            cst: Vec::new(),
            add: coefs
                .iter()
                .map(|(i, o, c)| Gate {
                    i_ids: vec![*i],
                    o_id: *o,
                    coef: Coef::Constant(c.clone()),
                })
                .collect(),
            mul: Vec::new(),
            max_degree_one: true,
        }
    }

    /// out0 = w0 + w1, out1 = 0; satisfied by w1 = -w0.
    fn sum_to_zero_circuit() -> Circuit<Fr> {
        Circuit {
            layers: vec![linear_layer(&[
                (0, 0, BigUint::from(1u32)),
                (1, 0, BigUint::from(1u32)),
            ])],
            public_input: Vec::new(),
            expected_num_output_zeros: 2,
        }
    }

    /// Produce an honest proof for `sum_to_zero_circuit` with the given
    /// witness, replaying the verifier's transcript schedule. The layer is
    /// linear with a single input variable, so every prover message has a
    /// closed form.
    fn prove_sum_to_zero(w0: Fr, w1: Fr) -> Result<Proof, String> {
        let mut api = Bn254Engine;
        let mut transcript = FieldHasherTranscript::new(&mut api)?;

        let length_prefix = Fr::from(2u64);
        let mut elems = vec![length_prefix, w0, w1];
        transcript.append_fs(&elems);

        // rz0 over the single output variable.
        let rz0 = transcript.challenge_f(&mut api)?[0];
        let eq_rz0_at_0 = Fr::one() - rz0;

        // Both add gates write output 0, so the gate polynomial is the
        // constant a(x) = eq_rz0[0] over the input variable.
        let a = eq_rz0_at_0;

        // v(t) interpolates the two input wires; p(t) = v(t) * a.
        let p0 = w0 * a;
        let p1 = w1 * a;
        let v_at_2 = w1 + w1 - w0;
        let p2 = v_at_2 * a;
        transcript.append_fs(&[p0, p1, p2]);
        elems.extend_from_slice(&[p0, p1, p2]);

        let rx = transcript.challenge_f(&mut api)?[0];
        let vx_claim = w0 + rx * (w1 - w0);
        transcript.append_f(vx_claim);
        elems.push(vx_claim);

        Ok(Proof::new(elems.iter().map(fr_to_biguint).collect()))
    }

    #[test]
    fn test_verify_accepts_honest_proof() {
        let w0 = Fr::from(5u64);
        let w1 = -w0;
        let mut proof = match prove_sum_to_zero(w0, w1) {
            Ok(p) => p,
            Err(err) => {
                assert!(false, "prover: {err}");
                return;
            }
        };

        let mut api = Bn254Engine;
        let mut circuit = sum_to_zero_circuit();
        let claimed_v = api.zero();
        let result = verify(&mut api, &mut circuit, &[], &claimed_v, 1, &mut proof);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_verify_rejects_corrupted_round_polynomial() {
        let w0 = Fr::from(5u64);
        let w1 = -w0;
        let mut proof = match prove_sum_to_zero(w0, w1) {
            Ok(p) => p,
            Err(err) => {
                assert!(false, "prover: {err}");
                return;
            }
        };
        // elems: [prefix, w0, w1, p0, p1, p2, vx]; bump p0 so the first
        // sumcheck consistency check breaks.
        proof.elems_mut()[3] += 1u32;

        let mut api = Bn254Engine;
        let mut circuit = sum_to_zero_circuit();
        let claimed_v = api.zero();
        assert!(verify(&mut api, &mut circuit, &[], &claimed_v, 1, &mut proof).is_err());
    }

    #[test]
    fn test_verify_rejects_corrupted_opening() {
        let w0 = Fr::from(5u64);
        let w1 = -w0;
        let mut proof = match prove_sum_to_zero(w0, w1) {
            Ok(p) => p,
            Err(err) => {
                assert!(false, "prover: {err}");
                return;
            }
        };
        // Corrupt a committed evaluation: the sumcheck replays fine against
        // the mutated transcript, but some check downstream must break.
        proof.elems_mut()[1] += 1u32;

        let mut api = Bn254Engine;
        let mut circuit = sum_to_zero_circuit();
        let claimed_v = api.zero();
        assert!(verify(&mut api, &mut circuit, &[], &claimed_v, 1, &mut proof).is_err());
    }

    #[test]
    fn test_verify_rejects_truncated_proof() {
        let w0 = Fr::from(5u64);
        let w1 = -w0;
        let mut proof = match prove_sum_to_zero(w0, w1) {
            Ok(p) => p,
            Err(err) => {
                assert!(false, "prover: {err}");
                return;
            }
        };
        proof.elems_mut().pop();

        let mut api = Bn254Engine;
        let mut circuit = sum_to_zero_circuit();
        let claimed_v = api.zero();
        assert!(verify(&mut api, &mut circuit, &[], &claimed_v, 1, &mut proof).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_mpi_size() {
        let w0 = Fr::from(5u64);
        let w1 = -w0;
        let mut proof = match prove_sum_to_zero(w0, w1) {
            Ok(p) => p,
            Err(err) => {
                assert!(false, "prover: {err}");
                return;
            }
        };

        let mut api = Bn254Engine;
        let mut circuit = sum_to_zero_circuit();
        let claimed_v = api.zero();
        assert!(verify(&mut api, &mut circuit, &[], &claimed_v, 2, &mut proof).is_err());
        proof.reset();
        assert!(verify(&mut api, &mut circuit, &[], &claimed_v, 3, &mut proof).is_err());
    }

    #[test]
    fn test_verify_rejects_garbage_proof_over_m31() {
        // A stream of ones is long enough to reach the first sumcheck
        // consistency check (1 + 1 != 0) through the Poseidon transcript.
        let mut api = M31Engine;
        let mut circuit = Circuit::<u32> {
            layers: vec![Layer {
                input_len_log: 1,
                output_len_log: 1,
                cst: Vec::new(),
                add: vec![Gate {
                    i_ids: vec![0],
                    o_id: 0,
                    coef: Coef::Constant(BigUint::from(1u32)),
                }],
                mul: Vec::new(),
                max_degree_one: true,
            }],
            public_input: Vec::new(),
            expected_num_output_zeros: 1,
        };

        let elems = vec![BigUint::from(1u32); 128];
        let mut proof = Proof::new(elems);
        let claimed_v = api.zero();
        assert!(verify(&mut api, &mut circuit, &[], &claimed_v, 1, &mut proof).is_err());
    }

    #[test]
    fn test_random_coefficient_fill_is_deterministic() {
        let mut api = Bn254Engine;
        let mut circuit = sum_to_zero_circuit();
        circuit.layers[0].add[1].coef = Coef::Random(None);

        let mut drawn = Vec::new();
        for _ in 0..2 {
            let mut fresh = circuit.clone();
            let mut transcript = match FieldHasherTranscript::new(&mut api) {
                Ok(t) => t,
                Err(err) => {
                    assert!(false, "transcript: {err}");
                    return;
                }
            };
            transcript.append_f(Fr::from(77u64));
            if let Err(err) = fresh.fill_rnd_coefs(&mut api, &mut transcript) {
                assert!(false, "fill: {err}");
                return;
            }
            match &fresh.layers[0].add[1].coef {
                Coef::Random(Some(v)) => drawn.push(*v),
                other => {
                    assert!(false, "coef not filled: {other:?}");
                    return;
                }
            }
        }
        assert_eq!(drawn[0], drawn[1]);
        assert!(!drawn[0].is_zero());
    }
}
