//! Field profiles recognized by the verifier.
//!
//! Each profile fixes the base-field modulus, its serialized byte width, the
//! SIMD pack size used by the prover, and the degree of the extension field
//! that challenges are sampled from.

use ark_bn254::Fr;
use ark_ff::PrimeField;
use num_bigint::BigUint;

use crate::m31_field::M31_MODULUS;

/// Serialized field moduli are always padded to this many bytes.
pub const LEADING_FIELD_BYTES: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// BN254 scalar field (254-bit pairing field), no SIMD packing.
    Bn254,
    /// Mersenne prime 2^31 - 1, packed 16 wide, cubic extension mod x^3 - 5.
    M31,
    /// GF(2), packed 8 wide; its degree-128 extension arithmetic is a stub.
    Gf2,
}

impl FieldKind {
    pub fn field_modulus(&self) -> BigUint {
        match self {
            FieldKind::Bn254 => BigUint::from(Fr::MODULUS),
            FieldKind::M31 => BigUint::from(M31_MODULUS),
            FieldKind::Gf2 => BigUint::from(2u32),
        }
    }

    /// Serialized width of one base-field element: ceil(bitlen / 8).
    pub fn field_bytes(&self) -> usize {
        match self {
            FieldKind::Bn254 => 32,
            FieldKind::M31 => 4,
            FieldKind::Gf2 => 1,
        }
    }

    /// Number of independent witnesses the prover evaluates in lockstep.
    pub fn simd_pack_size(&self) -> usize {
        match self {
            FieldKind::Bn254 => 1,
            FieldKind::M31 => 16,
            FieldKind::Gf2 => 8,
        }
    }

    /// Degree of the extension field challenges are drawn from.
    pub fn challenge_field_degree(&self) -> usize {
        match self {
            FieldKind::Bn254 => 1,
            FieldKind::M31 => 3,
            FieldKind::Gf2 => 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_metadata() {
        assert_eq!(FieldKind::Bn254.field_bytes(), 32);
        assert_eq!(FieldKind::M31.field_bytes(), 4);
        assert_eq!(FieldKind::Gf2.field_bytes(), 1);

        assert_eq!(FieldKind::Bn254.simd_pack_size(), 1);
        assert_eq!(FieldKind::M31.simd_pack_size(), 16);
        assert_eq!(FieldKind::Gf2.simd_pack_size(), 8);

        assert_eq!(FieldKind::Bn254.challenge_field_degree(), 1);
        assert_eq!(FieldKind::M31.challenge_field_degree(), 3);
        assert_eq!(FieldKind::Gf2.challenge_field_degree(), 128);
    }

    #[test]
    fn test_field_moduli() {
        assert_eq!(FieldKind::M31.field_modulus(), BigUint::from(0x7fffffffu32));
        assert_eq!(FieldKind::Gf2.field_modulus(), BigUint::from(2u32));
        // BN254 scalar field modulus, the circuit field of the BN254 profile.
        let r = match BigUint::parse_bytes(
            b"21888242871839275222246405745257275088548364400416034343698204186575808495617",
            10,
        ) {
            Some(v) => v,
            None => {
                assert!(false, "modulus literal parses");
                return;
            }
        };
        assert_eq!(FieldKind::Bn254.field_modulus(), r);
    }

    #[test]
    fn test_modulus_fits_leading_bytes() {
        for kind in [FieldKind::Bn254, FieldKind::M31, FieldKind::Gf2] {
            assert!(kind.field_modulus().to_bytes_le().len() <= LEADING_FIELD_BYTES);
            assert!(kind.field_bytes() <= LEADING_FIELD_BYTES);
        }
    }
}
