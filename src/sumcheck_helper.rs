//! Equality-polynomial expansions and per-layer sumcheck algebra.
//!
//! `eq(r, x) = prod_i (x_i r_i + (1 - x_i)(1 - r_i))` expanded over the
//! Boolean hypercube is the workhorse table of the layer verifier. The
//! efficient expansion splits the variables in half, expands each half with
//! the doubling recurrence, and fills the full table with one product per
//! cell, halving the multiplication count.

use std::collections::HashMap;

use crate::circuit::{Coef, Gate, Layer};
use crate::engine::ArithmeticEngine;
use crate::scratch_pad::ScratchPad;

/// Brute-force expansion: `out[i] = factor * prod_k (r_k if bit_k(i) else 1 - r_k)`.
pub fn eq_evals_at_primitive<E>(
    api: &mut E,
    random_point: &[Vec<E::Var>],
    multiplicative_factor: &[E::Var],
    hypercube_evals: &mut [Vec<E::Var>],
) -> Result<(), String>
where
    E: ArithmeticEngine,
{
    hypercube_evals[0] = multiplicative_factor.to_vec();

    for (i, r_i) in random_point.iter().enumerate() {
        let half_hypercube_size = 1usize << i;
        for j in 0..half_hypercube_size {
            // v -> ((1 - r) v, r v)
            let hi = api.extension_mul(&hypercube_evals[j], r_i)?;
            let lo = api.extension_sub(&hypercube_evals[j], &hi)?;
            hypercube_evals[j + half_hypercube_size] = hi;
            hypercube_evals[j] = lo;
        }
    }
    Ok(())
}

/// Tensor-split expansion into `full_hypercube_evals`, using the two halves
/// as staging buffers.
#[allow(clippy::too_many_arguments)]
pub fn eq_evals_at_efficient<E>(
    api: &mut E,
    random_point: &[Vec<E::Var>],
    multiplicative_factor: &[E::Var],
    full_hypercube_evals: &mut [Vec<E::Var>],
    first_half: &mut [Vec<E::Var>],
    second_half: &mut [Vec<E::Var>],
    eq_evals_count: &mut HashMap<usize, usize>,
) -> Result<(), String>
where
    E: ArithmeticEngine,
{
    let hypercube_size = 1usize << random_point.len();
    *eq_evals_count.entry(hypercube_size).or_insert(0) += 1;

    let num_vars_first_half = random_point.len() >> 1;
    eq_evals_at_primitive(
        api,
        &random_point[..num_vars_first_half],
        multiplicative_factor,
        first_half,
    )?;
    let one = api.one();
    eq_evals_at_primitive(api, &random_point[num_vars_first_half..], &one, second_half)?;

    let first_half_mask = (1usize << num_vars_first_half) - 1;
    for i in 0..hypercube_size {
        let index_first = i & first_half_mask;
        let index_second = i >> num_vars_first_half;
        full_hypercube_evals[i] =
            api.extension_mul(&first_half[index_first], &second_half[index_second])?;
    }
    Ok(())
}

/// `<values, eq_mpi (x) eq_simd>`: the SIMD/MPI-combined public value.
pub fn combine_with_simd_mpi<E>(
    api: &mut E,
    values: &[Vec<E::Var>],
    eq_evals_simd: &[Vec<E::Var>],
    eq_evals_mpi: &[Vec<E::Var>],
) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    let simd_size = eq_evals_simd.len();
    if values.len() != eq_evals_mpi.len() * simd_size {
        return Err(format!(
            "incompatible n_witnesses {} with mpi size {} and simd size {simd_size}",
            values.len(),
            eq_evals_mpi.len()
        ));
    }

    let mut res = api.zero();
    for (i, mpi_eval) in eq_evals_mpi.iter().enumerate() {
        for (j, simd_eval) in eq_evals_simd.iter().enumerate() {
            let term = api.extension_mul(&values[i * simd_size + j], mpi_eval)?;
            let term = api.extension_mul(&term, simd_eval)?;
            res = api.extension_add(&res, &term)?;
        }
    }
    Ok(res)
}

/// `x y + (1 - x)(1 - y) = 2 x y + 1 - x - y` over extension elements.
fn eq_term<E>(api: &mut E, x: &[E::Var], y: &[E::Var]) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    let product = api.extension_mul(x, y)?;
    let two = api.constant_u64(2);
    let mut res: Vec<E::Var> = product.iter().map(|limb| api.mul(limb, &two)).collect();
    let one = api.constant_u64(1);
    res[0] = api.add(&res[0], &one);
    let res = api.extension_sub(&res, x)?;
    api.extension_sub(&res, y)
}

/// `prod_i eq(x_i, y_i)` over paired challenge vectors.
pub fn eq_vec<E>(
    api: &mut E,
    xs: &[Vec<E::Var>],
    ys: &[Vec<E::Var>],
) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    if xs.len() != ys.len() {
        return Err(format!(
            "eq_vec length mismatch: {} vs {}",
            xs.len(),
            ys.len()
        ));
    }
    let mut res = api.one();
    for (x, y) in xs.iter().zip(ys.iter()) {
        let eq_at_i = eq_term(api, x, y)?;
        res = api.extension_mul(&eq_at_i, &res)?;
    }
    Ok(res)
}

/// Fill the eq tables a layer's sumcheck runs against. For the output layer
/// the rz0 table is expanded fresh; interior layers inherit the previous
/// layer's rx table (and fold in the second claim scaled by alpha).
#[allow(clippy::too_many_arguments)]
pub fn prepare_layer<E>(
    api: &mut E,
    layer: &Layer<E::Var>,
    alpha: Option<&[E::Var]>,
    rz0: &[Vec<E::Var>],
    rz1: Option<&[Vec<E::Var>]>,
    r_simd: &[Vec<E::Var>],
    r_mpi: &[Vec<E::Var>],
    sp: &mut ScratchPad<E::Var>,
    is_output_layer: bool,
) -> Result<(), String>
where
    E: ArithmeticEngine,
{
    let one = api.one();

    if is_output_layer {
        eq_evals_at_efficient(
            api,
            rz0,
            &one,
            &mut sp.eq_evals_at_rz0,
            &mut sp.eq_evals_first_part,
            &mut sp.eq_evals_second_part,
            &mut sp.eq_evals_count,
        )?;
    } else {
        // The rx just fixed by the previous layer is this layer's rz0.
        let output_len = 1usize << rz0.len();
        for i in 0..output_len {
            sp.eq_evals_at_rz0[i] = sp.eq_evals_at_rx[i].clone();
        }
        if let (Some(_), Some(alpha)) = (rz1, alpha) {
            for i in 0..(1usize << layer.output_len_log) {
                let scaled = api.extension_mul(alpha, &sp.eq_evals_at_ry[i])?;
                let folded = api.extension_add(&sp.eq_evals_at_rz0[i], &scaled)?;
                sp.eq_evals_at_rz0[i] = folded;
            }
        }
    }

    eq_evals_at_efficient(
        api,
        r_simd,
        &one,
        &mut sp.eq_evals_at_r_simd,
        &mut sp.eq_evals_first_part,
        &mut sp.eq_evals_second_part,
        &mut sp.eq_evals_count,
    )?;
    eq_evals_at_efficient(
        api,
        r_mpi,
        &one,
        &mut sp.eq_evals_at_r_mpi,
        &mut sp.eq_evals_first_part,
        &mut sp.eq_evals_second_part,
        &mut sp.eq_evals_count,
    )?;

    sp.r_simd = r_simd.to_vec();
    sp.r_mpi = r_mpi.to_vec();
    Ok(())
}

/// Contribution of the constant gates to the initial claimed sum.
pub fn eval_cst<E>(
    api: &mut E,
    cst_gates: &[Gate<E::Var>],
    public_input: &[Vec<E::Var>],
    sp: &ScratchPad<E::Var>,
) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    let mut v = api.zero();

    let mpi_size = sp.eq_evals_at_r_mpi.len();
    let simd_size = sp.eq_evals_at_r_simd.len();

    for cst_gate in cst_gates {
        let tmp = match &cst_gate.coef {
            Coef::PublicInput(input_idx) => {
                let n_witnesses = public_input.len();
                if n_witnesses != mpi_size * simd_size {
                    return Err(format!(
                        "incompatible n_witnesses {n_witnesses} with mpi size {mpi_size} and simd size {simd_size}"
                    ));
                }
                let mut vals = Vec::with_capacity(n_witnesses);
                for row in public_input {
                    let cell = row.get(*input_idx).cloned().ok_or_else(|| {
                        format!("public input index {input_idx} out of range")
                    })?;
                    vals.push(api.to_extension(&cell));
                }
                let combined = combine_with_simd_mpi(
                    api,
                    &vals,
                    &sp.eq_evals_at_r_simd,
                    &sp.eq_evals_at_r_mpi,
                )?;
                api.extension_mul(&combined, &sp.eq_evals_at_rz0[cst_gate.o_id])?
            }
            coef => {
                let coef_value = coef.actual_local_value(api)?;
                let coef_ext = api.to_extension(&coef_value);
                api.extension_mul(&sp.eq_evals_at_rz0[cst_gate.o_id], &coef_ext)?
            }
        };
        v = api.extension_add(&v, &tmp)?;
    }
    Ok(v)
}

/// Contribution of the add gates at the fixed (rz0, rx) point.
pub fn eval_add<E>(
    api: &mut E,
    add_gates: &[Gate<E::Var>],
    sp: &ScratchPad<E::Var>,
) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    let mut v = api.zero();
    for add_gate in add_gates {
        let coef_value = add_gate.coef.actual_local_value(api)?;
        let coef_ext = api.to_extension(&coef_value);
        let term = api.extension_mul(
            &sp.eq_evals_at_rz0[add_gate.o_id],
            &sp.eq_evals_at_rx[add_gate.i_ids[0]],
        )?;
        let term = api.extension_mul(&term, &coef_ext)?;
        v = api.extension_add(&v, &term)?;
    }
    let v = api.extension_mul(&v, &sp.eq_r_simd_r_simd_xy)?;
    api.extension_mul(&v, &sp.eq_r_mpi_r_mpi_xy)
}

/// Contribution of the mul gates at the fixed (rz0, rx, ry) point.
pub fn eval_mul<E>(
    api: &mut E,
    mul_gates: &[Gate<E::Var>],
    sp: &ScratchPad<E::Var>,
) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    let mut v = api.zero();
    for mul_gate in mul_gates {
        let coef_value = mul_gate.coef.actual_local_value(api)?;
        let coef_ext = api.to_extension(&coef_value);
        let term = api.extension_mul(
            &sp.eq_evals_at_rz0[mul_gate.o_id],
            &sp.eq_evals_at_rx[mul_gate.i_ids[0]],
        )?;
        let term = api.extension_mul(&term, &sp.eq_evals_at_ry[mul_gate.i_ids[1]])?;
        let term = api.extension_mul(&term, &coef_ext)?;
        v = api.extension_add(&v, &term)?;
    }
    let v = api.extension_mul(&v, &sp.eq_r_simd_r_simd_xy)?;
    api.extension_mul(&v, &sp.eq_r_mpi_r_mpi_xy)
}

pub fn set_rx<E>(
    api: &mut E,
    rx: &[Vec<E::Var>],
    sp: &mut ScratchPad<E::Var>,
) -> Result<(), String>
where
    E: ArithmeticEngine,
{
    let one = api.one();
    eq_evals_at_efficient(
        api,
        rx,
        &one,
        &mut sp.eq_evals_at_rx,
        &mut sp.eq_evals_first_part,
        &mut sp.eq_evals_second_part,
        &mut sp.eq_evals_count,
    )
}

pub fn set_ry<E>(
    api: &mut E,
    ry: &[Vec<E::Var>],
    sp: &mut ScratchPad<E::Var>,
) -> Result<(), String>
where
    E: ArithmeticEngine,
{
    let one = api.one();
    eq_evals_at_efficient(
        api,
        ry,
        &one,
        &mut sp.eq_evals_at_ry,
        &mut sp.eq_evals_first_part,
        &mut sp.eq_evals_second_part,
        &mut sp.eq_evals_count,
    )
}

pub fn set_r_simd_xy<E>(
    api: &mut E,
    r_simd_xy: &[Vec<E::Var>],
    sp: &mut ScratchPad<E::Var>,
) -> Result<(), String>
where
    E: ArithmeticEngine,
{
    let carry = eq_vec(api, &sp.r_simd, r_simd_xy)?;
    sp.eq_r_simd_r_simd_xy = carry;
    Ok(())
}

pub fn set_r_mpi_xy<E>(
    api: &mut E,
    r_mpi_xy: &[Vec<E::Var>],
    sp: &mut ScratchPad<E::Var>,
) -> Result<(), String>
where
    E: ArithmeticEngine,
{
    let carry = eq_vec(api, &sp.r_mpi, r_mpi_xy)?;
    sp.eq_r_mpi_r_mpi_xy = carry;
    Ok(())
}

/// Evaluate the quadratic through `(0, p0) (1, p1) (2, p2)` at `eval_point`,
/// by closed-form coefficient reconstruction.
pub fn degree2_eval<E>(
    api: &mut E,
    lagrange_evals: &[Vec<E::Var>],
    eval_point: &[E::Var],
    sp: &ScratchPad<E::Var>,
) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    if lagrange_evals.len() != 3 {
        return Err(format!(
            "degree-2 evaluation expects 3 points, got {}",
            lagrange_evals.len()
        ));
    }
    let c0 = lagrange_evals[0].clone();

    // c2 = (p2 + p0 - 2 p1) / 2
    let c2 = api.extension_add(&lagrange_evals[2], &lagrange_evals[0])?;
    let c2 = api.extension_sub(&c2, &lagrange_evals[1])?;
    let c2 = api.extension_sub(&c2, &lagrange_evals[1])?;
    let inv2_ext = api.to_extension(&sp.inv2);
    let c2 = api.extension_mul(&c2, &inv2_ext)?;

    let c1 = api.extension_sub(&lagrange_evals[1], &lagrange_evals[0])?;
    let c1 = api.extension_sub(&c1, &c2)?;

    // ((c2 x + c1) x) + c0
    let acc = api.extension_mul(&c2, eval_point)?;
    let acc = api.extension_add(&acc, &c1)?;
    let acc = api.extension_mul(&acc, eval_point)?;
    api.extension_add(&acc, &c0)
}

/// Evaluate the cubic through `(0..3, p0..p3)` at `eval_point` with the
/// precomputed Lagrange denominators.
pub fn degree3_eval<E>(
    api: &mut E,
    lagrange_evals: &[Vec<E::Var>],
    eval_point: &[E::Var],
    sp: &ScratchPad<E::Var>,
) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    if lagrange_evals.len() != 4 {
        return Err(format!(
            "degree-3 evaluation expects 4 points, got {}",
            lagrange_evals.len()
        ));
    }
    lag_eval(api, lagrange_evals, eval_point, sp)
}

fn lag_eval<E>(
    api: &mut E,
    lagrange_evals: &[Vec<E::Var>],
    eval_point: &[E::Var],
    sp: &ScratchPad<E::Var>,
) -> Result<Vec<E::Var>, String>
where
    E: ArithmeticEngine,
{
    let mut res = api.zero();
    for i in 0..lagrange_evals.len() {
        let mut lag = api.one();
        for j in 0..lagrange_evals.len() {
            if j == i {
                continue;
            }
            let at_j = api.to_extension(&sp.deg3_eval_at[j]);
            let diff = api.extension_sub(eval_point, &at_j)?;
            lag = api.extension_mul(&lag, &diff)?;
        }
        lag = api.extension_mul(&lag, &lagrange_evals[i])?;
        let denom_inv = api.to_extension(&sp.deg3_lag_denoms_inv[i]);
        lag = api.extension_mul(&lag, &denom_inv)?;
        res = api.extension_add(&res, &lag)?;
    }
    Ok(res)
}
