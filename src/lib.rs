//! Recursive verifier core for Expander GKR/sumcheck proofs.
//!
//! Verifies proofs for layered arithmetic circuits: a segment-based circuit
//! format and its flattener, a duplex Fiat-Shamir transcript over a field
//! hasher (MiMC on BN254, Poseidon on M31), a layer-by-layer sumcheck
//! verifier with a pre-allocated equality-polynomial scratch pad, and a raw
//! multilinear polynomial commitment for the final opening checks. All
//! arithmetic is routed through an engine trait modeling the host
//! constraint-builder surface.

pub mod circuit;
pub mod circuit_serde;
pub mod engine;
pub mod fields;
pub mod input_buf;
pub mod m31_field;
pub mod mimc;
pub mod poly_commit;
pub mod poseidon_m31;
pub mod proof;
pub mod scratch_pad;
pub mod sumcheck_helper;
pub mod transcript;
pub mod verifier;
pub mod witness;

pub use circuit::{Circuit, Coef, Gate, Layer, SegmentedCircuit};
pub use circuit_serde::{load_circuit, CircuitRelation, CIRCUIT_VERSION_NUM};
pub use engine::{ArithmeticEngine, Bn254Engine, Gf2Engine, M31Engine};
pub use fields::FieldKind;
pub use proof::Proof;
pub use transcript::FieldHasherTranscript;
pub use verifier::{gkr_verify, verify};
pub use witness::Witness;
