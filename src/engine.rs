//! Arithmetic engine: the seam between the verifier and its host backend.
//!
//! The verifier never touches field elements directly; every operation goes
//! through an [`ArithmeticEngine`], which models the arithmetic surface of a
//! constraint builder (add/sub/mul/inverse/assert_eq over opaque variables).
//! Extension-field combinators are provided on top of the scalar ops and
//! dispatch on the field profile: BN254 challenges live in the base field,
//! M31 challenges in the cubic extension mod x^3 - 5.
//!
//! The native engines here execute eagerly; a failed `assert_eq` surfaces as
//! an error and aborts verification, there is no recovery path.

use ark_bn254::Fr;
use ark_ff::Field;
use num_bigint::BigUint;

use crate::fields::FieldKind;
use crate::m31_field::{
    m31_add_mod, m31_from_biguint, m31_from_u64, m31_inv_mod, m31_mul_mod, m31_sub_mod,
};

pub trait ArithmeticEngine {
    type Var: Clone + PartialEq + std::fmt::Debug;

    fn field_kind(&self) -> FieldKind;

    fn constant(&mut self, value: &BigUint) -> Self::Var;
    fn constant_u64(&mut self, value: u64) -> Self::Var;
    fn add(&mut self, a: &Self::Var, b: &Self::Var) -> Self::Var;
    fn sub(&mut self, a: &Self::Var, b: &Self::Var) -> Self::Var;
    fn mul(&mut self, a: &Self::Var, b: &Self::Var) -> Self::Var;
    fn inverse(&mut self, a: &Self::Var) -> Result<Self::Var, String>;
    fn assert_eq(&mut self, a: &Self::Var, b: &Self::Var) -> Result<(), String>;

    fn simd_pack_size(&self) -> usize {
        self.field_kind().simd_pack_size()
    }

    fn challenge_field_degree(&self) -> usize {
        self.field_kind().challenge_field_degree()
    }

    /// The additive identity of the extension field.
    fn zero(&mut self) -> Vec<Self::Var> {
        let z = self.constant_u64(0);
        vec![z; self.challenge_field_degree()]
    }

    /// The multiplicative identity of the extension field.
    fn one(&mut self) -> Vec<Self::Var> {
        let mut out = self.zero();
        out[0] = self.constant_u64(1);
        out
    }

    /// A freshly zeroed vector of `n` extension elements.
    fn zeroes(&mut self, n: usize) -> Vec<Vec<Self::Var>> {
        let z = self.zero();
        vec![z; n]
    }

    /// Lift a base-field variable into the extension field.
    fn to_extension(&mut self, v: &Self::Var) -> Vec<Self::Var> {
        let mut out = self.zero();
        out[0] = v.clone();
        out
    }

    fn extension_add(&mut self, a: &[Self::Var], b: &[Self::Var]) -> Result<Vec<Self::Var>, String> {
        check_extension_degree(self.challenge_field_degree(), a.len(), b.len())?;
        Ok(a.iter().zip(b.iter()).map(|(x, y)| self.add(x, y)).collect())
    }

    fn extension_sub(&mut self, a: &[Self::Var], b: &[Self::Var]) -> Result<Vec<Self::Var>, String> {
        check_extension_degree(self.challenge_field_degree(), a.len(), b.len())?;
        Ok(a.iter().zip(b.iter()).map(|(x, y)| self.sub(x, y)).collect())
    }

    /// Polynomial product modulo the field-specific irreducible.
    fn extension_mul(&mut self, a: &[Self::Var], b: &[Self::Var]) -> Result<Vec<Self::Var>, String> {
        check_extension_degree(self.challenge_field_degree(), a.len(), b.len())?;
        match self.field_kind() {
            FieldKind::Bn254 => Ok(vec![self.mul(&a[0], &b[0])]),
            FieldKind::M31 => {
                // (a0 + a1 x + a2 x^2)(b0 + b1 x + b2 x^2) mod (x^3 - 5)
                let five = self.constant_u64(5);

                let a0b0 = self.mul(&a[0], &b[0]);
                let a1b2 = self.mul(&a[1], &b[2]);
                let a2b1 = self.mul(&a[2], &b[1]);
                let cross = self.add(&a1b2, &a2b1);
                let cross5 = self.mul(&five, &cross);
                let r0 = self.add(&a0b0, &cross5);

                let a0b1 = self.mul(&a[0], &b[1]);
                let a1b0 = self.mul(&a[1], &b[0]);
                let a2b2 = self.mul(&a[2], &b[2]);
                let a2b2x5 = self.mul(&five, &a2b2);
                let r1 = self.add(&a0b1, &a1b0);
                let r1 = self.add(&r1, &a2b2x5);

                let a0b2 = self.mul(&a[0], &b[2]);
                let a1b1 = self.mul(&a[1], &b[1]);
                let a2b0 = self.mul(&a[2], &b[0]);
                let r2 = self.add(&a0b2, &a1b1);
                let r2 = self.add(&r2, &a2b0);

                Ok(vec![r0, r1, r2])
            }
            FieldKind::Gf2 => Err("gf2 extension multiplication is not supported".to_string()),
        }
    }

    fn extension_assert_eq(&mut self, a: &[Self::Var], b: &[Self::Var]) -> Result<(), String> {
        check_extension_degree(self.challenge_field_degree(), a.len(), b.len())?;
        for (x, y) in a.iter().zip(b.iter()) {
            self.assert_eq(x, y)?;
        }
        Ok(())
    }
}

fn check_extension_degree(expected: usize, a_len: usize, b_len: usize) -> Result<(), String> {
    if a_len != expected || b_len != expected {
        return Err(format!(
            "extension operand degree mismatch: expected {expected}, got {a_len} and {b_len}"
        ));
    }
    Ok(())
}

/// Native engine over the BN254 scalar field.
#[derive(Clone, Debug, Default)]
pub struct Bn254Engine;

impl ArithmeticEngine for Bn254Engine {
    type Var = Fr;

    fn field_kind(&self) -> FieldKind {
        FieldKind::Bn254
    }

    fn constant(&mut self, value: &BigUint) -> Fr {
        Fr::from(value.clone())
    }

    fn constant_u64(&mut self, value: u64) -> Fr {
        Fr::from(value)
    }

    fn add(&mut self, a: &Fr, b: &Fr) -> Fr {
        *a + *b
    }

    fn sub(&mut self, a: &Fr, b: &Fr) -> Fr {
        *a - *b
    }

    fn mul(&mut self, a: &Fr, b: &Fr) -> Fr {
        *a * *b
    }

    fn inverse(&mut self, a: &Fr) -> Result<Fr, String> {
        a.inverse().ok_or_else(|| "inverse of zero".to_string())
    }

    fn assert_eq(&mut self, a: &Fr, b: &Fr) -> Result<(), String> {
        if a != b {
            return Err(format!("bn254 constraint violated: {a} != {b}"));
        }
        Ok(())
    }
}

/// Native engine over M31, with canonical u32 variables.
#[derive(Clone, Debug, Default)]
pub struct M31Engine;

impl ArithmeticEngine for M31Engine {
    type Var = u32;

    fn field_kind(&self) -> FieldKind {
        FieldKind::M31
    }

    fn constant(&mut self, value: &BigUint) -> u32 {
        m31_from_biguint(value)
    }

    fn constant_u64(&mut self, value: u64) -> u32 {
        m31_from_u64(value)
    }

    fn add(&mut self, a: &u32, b: &u32) -> u32 {
        m31_add_mod(*a, *b)
    }

    fn sub(&mut self, a: &u32, b: &u32) -> u32 {
        m31_sub_mod(*a, *b)
    }

    fn mul(&mut self, a: &u32, b: &u32) -> u32 {
        m31_mul_mod(*a, *b)
    }

    fn inverse(&mut self, a: &u32) -> Result<u32, String> {
        m31_inv_mod(*a).ok_or_else(|| "inverse of zero".to_string())
    }

    fn assert_eq(&mut self, a: &u32, b: &u32) -> Result<(), String> {
        if a != b {
            return Err(format!("m31 constraint violated: {a} != {b}"));
        }
        Ok(())
    }
}

/// Native engine over GF(2). Base arithmetic only; the degree-128 extension
/// used for challenges is not implemented.
#[derive(Clone, Debug, Default)]
pub struct Gf2Engine;

impl ArithmeticEngine for Gf2Engine {
    type Var = u8;

    fn field_kind(&self) -> FieldKind {
        FieldKind::Gf2
    }

    fn constant(&mut self, value: &BigUint) -> u8 {
        if value.bit(0) {
            1
        } else {
            0
        }
    }

    fn constant_u64(&mut self, value: u64) -> u8 {
        (value & 1) as u8
    }

    fn add(&mut self, a: &u8, b: &u8) -> u8 {
        a ^ b
    }

    fn sub(&mut self, a: &u8, b: &u8) -> u8 {
        a ^ b
    }

    fn mul(&mut self, a: &u8, b: &u8) -> u8 {
        a & b
    }

    fn inverse(&mut self, a: &u8) -> Result<u8, String> {
        if *a == 0 {
            return Err("inverse of zero".to_string());
        }
        Ok(1)
    }

    fn assert_eq(&mut self, a: &u8, b: &u8) -> Result<(), String> {
        if a != b {
            return Err(format!("gf2 constraint violated: {a} != {b}"));
        }
        Ok(())
    }
}
