//! Deserializers for the versioned circuit, witness and proof streams.
//!
//! Layouts (all integers little-endian u64 unless noted):
//!
//! circuit: `version` `modulus[32]` `n_pub_in` `n_out` `n_out_zeros`
//!          `n_segments` segment... `n_layers` layer_id...
//! segment: `i_len` `o_len` `n_child` child... `n_mul` gate2... `n_add`
//!          gate1... `n_cst` gate0... `n_custom(=0)`
//! gate_k:  k input ids, output id, coef tag (u8) + payload
//! witness: `n_witnesses` `n_priv_per` `n_pub_per` `modulus[32]` elements...
//! proof:   ignored u64 header, then field elements until EOF

use crate::circuit::{
    Allocation, ChildSegInfo, Circuit, Coef, Gate, Segment, SegmentedCircuit,
};
use crate::engine::ArithmeticEngine;
use crate::fields::FieldKind;
use crate::input_buf::InputBuf;
use crate::proof::Proof;
use crate::witness::Witness;

/// "CIRCUIT6" as a little-endian u64.
pub const CIRCUIT_VERSION_NUM: u64 = 3914834606642317635;

const COEF_TYPE_CONSTANT: u8 = 1;
const COEF_TYPE_RANDOM: u8 = 2;
const COEF_TYPE_PUBLIC_INPUT: u8 = 3;

fn read_gate<V>(buf: &mut InputBuf, input_num: usize) -> Result<Gate<V>, String> {
    let mut i_ids = Vec::with_capacity(input_num);
    for _ in 0..input_num {
        i_ids.push(buf.read_usize()?);
    }
    let o_id = buf.read_usize()?;

    let coef = match buf.read_u8()? {
        COEF_TYPE_CONSTANT => Coef::Constant(buf.read_field_element()?),
        COEF_TYPE_RANDOM => Coef::Random(None),
        COEF_TYPE_PUBLIC_INPUT => {
            let input_idx = buf.read_usize()?;
            if input_num != 0 {
                return Err("public input can only appear in the form of cst gate".to_string());
            }
            Coef::PublicInput(input_idx)
        }
        other => return Err(format!("unrecognized coef type {other}")),
    };

    Ok(Gate { i_ids, o_id, coef })
}

fn read_allocation(buf: &mut InputBuf) -> Result<Allocation, String> {
    Ok(Allocation {
        i_offset: buf.read_usize()?,
        o_offset: buf.read_usize()?,
    })
}

fn read_child_seg_info(buf: &mut InputBuf) -> Result<ChildSegInfo, String> {
    let id = buf.read_usize()?;
    let allocation_num = buf.read_usize()?;
    let mut allocations = Vec::with_capacity(allocation_num);
    for _ in 0..allocation_num {
        allocations.push(read_allocation(buf)?);
    }
    Ok(ChildSegInfo { id, allocations })
}

fn read_segment<V>(buf: &mut InputBuf, segment_idx: usize) -> Result<Segment<V>, String> {
    let i_len = buf.read_usize()?;
    let o_len = buf.read_usize()?;
    if !i_len.is_power_of_two() || !o_len.is_power_of_two() {
        return Err("incorrect input or output length".to_string());
    }

    let n_child_segs = buf.read_usize()?;
    let mut child_segs = Vec::with_capacity(n_child_segs);
    for _ in 0..n_child_segs {
        let child = read_child_seg_info(buf)?;
        // Children must be earlier segments; anything else cannot flatten.
        if child.id >= segment_idx {
            return Err(format!(
                "segment {segment_idx} references child segment {} ahead of it",
                child.id
            ));
        }
        child_segs.push(child);
    }

    let n_muls = buf.read_usize()?;
    let mut gate_muls = Vec::with_capacity(n_muls);
    for _ in 0..n_muls {
        gate_muls.push(read_gate(buf, 2)?);
    }

    let n_adds = buf.read_usize()?;
    let mut gate_adds = Vec::with_capacity(n_adds);
    for _ in 0..n_adds {
        gate_adds.push(read_gate(buf, 1)?);
    }

    let n_csts = buf.read_usize()?;
    let mut gate_csts = Vec::with_capacity(n_csts);
    for _ in 0..n_csts {
        gate_csts.push(read_gate(buf, 0)?);
    }

    let n_customs = buf.read_usize()?;
    if n_customs != 0 {
        return Err("custom gates are not supported".to_string());
    }

    Ok(Segment {
        i_var_num: i_len.trailing_zeros() as usize,
        o_var_num: o_len.trailing_zeros() as usize,
        child_segs,
        gate_muls,
        gate_adds,
        gate_csts,
    })
}

pub fn read_segmented_circuit<V>(buf: &mut InputBuf) -> Result<SegmentedCircuit<V>, String> {
    let version_num = buf.read_u64()?;
    if version_num != CIRCUIT_VERSION_NUM {
        return Err("incorrect version of circuit serialization".to_string());
    }

    buf.detect_field_modulus()?;

    let num_public_inputs = buf.read_usize()?;
    let num_outputs = buf.read_usize()?;
    let expected_num_output_zeros = buf.read_usize()?;

    let segment_num = buf.read_usize()?;
    let mut segments = Vec::with_capacity(segment_num);
    for idx in 0..segment_num {
        segments.push(read_segment(buf, idx)?);
    }

    let layer_num = buf.read_usize()?;
    let mut layer_ids = Vec::with_capacity(layer_num);
    for _ in 0..layer_num {
        let layer_id = buf.read_usize()?;
        if layer_id >= segments.len() {
            return Err(format!("layer id {layer_id} references undefined segment"));
        }
        layer_ids.push(layer_id);
    }

    Ok(SegmentedCircuit {
        num_public_inputs,
        num_outputs,
        expected_num_output_zeros,
        segments,
        layer_ids,
    })
}

pub fn read_witness(buf: &mut InputBuf) -> Result<Witness, String> {
    let num_witnesses = buf.read_usize()?;
    let num_private_inputs_per_witness = buf.read_usize()?;
    let num_public_inputs_per_witness = buf.read_usize()?;

    buf.detect_field_modulus()?;

    let total =
        num_witnesses * (num_private_inputs_per_witness + num_public_inputs_per_witness);
    let mut values = Vec::with_capacity(total);
    for _ in 0..total {
        values.push(buf.read_field_element()?);
    }

    Ok(Witness {
        num_witnesses,
        num_private_inputs_per_witness,
        num_public_inputs_per_witness,
        values,
    })
}

pub fn read_proof(buf: &mut InputBuf) -> Result<Proof, String> {
    let _ = buf.read_u64()?;
    let mut elems = Vec::new();
    while !buf.is_empty() {
        elems.push(buf.read_field_element()?);
    }
    Ok(Proof::new(elems))
}

/// A satisfying circuit-witness pair plus the field and MPI configuration
/// the proof was produced under.
#[derive(Clone, Copy, Debug)]
pub struct CircuitRelation<'a> {
    pub circuit_bytes: &'a [u8],
    pub witness_bytes: &'a [u8],
    pub field: FieldKind,
    pub mpi_size: usize,
}

/// Load and flatten a circuit, load and MPI-tile its witness, attach the
/// public-input matrix, and hand back the private rows.
pub fn load_circuit<E>(
    api: &mut E,
    rel: &CircuitRelation,
) -> Result<(Circuit<E::Var>, Vec<Vec<E::Var>>), String>
where
    E: ArithmeticEngine,
{
    let mut circuit_buf = InputBuf::new(rel.circuit_bytes, rel.field);
    let segmented = read_segmented_circuit::<E::Var>(&mut circuit_buf)?;
    let mut circuit = segmented.flatten();
    circuit.validate()?;

    let mut witness_buf = InputBuf::new(rel.witness_bytes, rel.field);
    let mut witness = read_witness(&mut witness_buf)?;
    witness.tile_for_mpi(rel.mpi_size);

    let (pub_inputs, priv_inputs) = witness.to_pub_priv_inputs(api)?;
    circuit.public_input = pub_inputs;

    Ok((circuit, priv_inputs))
}
