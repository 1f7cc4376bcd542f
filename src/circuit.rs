//! Layered-circuit model: segment DAG, flattened layers, gate evaluation.
//!
//! Circuits arrive as a list of segments referencing child segments with
//! relocation offsets; flattening expands the chosen layer segments into
//! flat gate lists. Gates carry a tagged coefficient which is either a
//! serialized constant, a transcript-drawn randomizer (back-filled once
//! during verification setup), or an index into the public-input matrix.

use num_bigint::BigUint;

use crate::engine::ArithmeticEngine;
use crate::transcript::FieldHasherTranscript;

#[derive(Clone, Debug)]
pub enum Coef<V> {
    Constant(BigUint),
    /// Drawn from the transcript after the input commitment is absorbed;
    /// `None` until that one-shot back-fill happens.
    Random(Option<V>),
    PublicInput(usize),
}

impl<V: Clone> Coef<V> {
    /// The coefficient value local to the gate. Public-input coefficients
    /// have no local value; they are resolved against the public matrix.
    pub fn actual_local_value<E>(&self, api: &mut E) -> Result<V, String>
    where
        E: ArithmeticEngine<Var = V>,
    {
        match self {
            Coef::Constant(v) => Ok(api.constant(v)),
            Coef::Random(Some(v)) => Ok(v.clone()),
            Coef::Random(None) => {
                Err("random coefficient queried before transcript back-fill".to_string())
            }
            Coef::PublicInput(_) => {
                Err("public-input coefficient has no local value".to_string())
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Gate<V> {
    pub i_ids: Vec<usize>,
    pub o_id: usize,
    pub coef: Coef<V>,
}

#[derive(Clone, Copy, Debug)]
pub struct Allocation {
    pub i_offset: usize,
    pub o_offset: usize,
}

#[derive(Clone, Debug)]
pub struct ChildSegInfo {
    pub id: usize,
    pub allocations: Vec<Allocation>,
}

#[derive(Clone, Debug)]
pub struct Segment<V> {
    pub i_var_num: usize,
    pub o_var_num: usize,
    pub child_segs: Vec<ChildSegInfo>,
    pub gate_muls: Vec<Gate<V>>,
    pub gate_adds: Vec<Gate<V>>,
    pub gate_csts: Vec<Gate<V>>,
}

impl<V: Clone> Segment<V> {
    fn insert_gates(
        &self,
        muls: &mut Vec<Gate<V>>,
        adds: &mut Vec<Gate<V>>,
        csts: &mut Vec<Gate<V>>,
        i_offset: usize,
        o_offset: usize,
    ) {
        for gate in &self.gate_muls {
            muls.push(Gate {
                i_ids: vec![gate.i_ids[0] + i_offset, gate.i_ids[1] + i_offset],
                o_id: gate.o_id + o_offset,
                coef: gate.coef.clone(),
            });
        }
        for gate in &self.gate_adds {
            adds.push(Gate {
                i_ids: vec![gate.i_ids[0] + i_offset],
                o_id: gate.o_id + o_offset,
                coef: gate.coef.clone(),
            });
        }
        for gate in &self.gate_csts {
            csts.push(Gate {
                i_ids: Vec::new(),
                o_id: gate.o_id + o_offset,
                coef: gate.coef.clone(),
            });
        }
    }

    fn flatten_into(
        &self,
        all_segments: &[Segment<V>],
        i_offset: usize,
        o_offset: usize,
        muls: &mut Vec<Gate<V>>,
        adds: &mut Vec<Gate<V>>,
        csts: &mut Vec<Gate<V>>,
    ) {
        self.insert_gates(muls, adds, csts, i_offset, o_offset);
        for child_info in &self.child_segs {
            let child = &all_segments[child_info.id];
            for alloc in &child_info.allocations {
                child.flatten_into(
                    all_segments,
                    alloc.i_offset + i_offset,
                    alloc.o_offset + o_offset,
                    muls,
                    adds,
                    csts,
                );
            }
        }
    }
}

/// The pre-flatten IR as it appears on disk.
#[derive(Clone, Debug)]
pub struct SegmentedCircuit<V> {
    pub num_public_inputs: usize,
    pub num_outputs: usize,
    pub expected_num_output_zeros: usize,
    pub segments: Vec<Segment<V>>,
    pub layer_ids: Vec<usize>,
}

impl<V: Clone> SegmentedCircuit<V> {
    /// Expand the layer segments into flat gate lists, composing child
    /// offsets along each DFS path.
    pub fn flatten(&self) -> Circuit<V> {
        let mut layers = Vec::with_capacity(self.layer_ids.len());
        for &layer_id in &self.layer_ids {
            let segment = &self.segments[layer_id];

            let mut muls = Vec::new();
            let mut adds = Vec::new();
            let mut csts = Vec::new();
            segment.flatten_into(&self.segments, 0, 0, &mut muls, &mut adds, &mut csts);

            let max_degree_one = muls.is_empty();
            layers.push(Layer {
                // Sumcheck needs at least one variable per side.
                input_len_log: segment.i_var_num.max(1),
                output_len_log: segment.o_var_num.max(1),
                cst: csts,
                add: adds,
                mul: muls,
                max_degree_one,
            });
        }

        Circuit {
            layers,
            public_input: Vec::new(),
            expected_num_output_zeros: self.expected_num_output_zeros,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Layer<V> {
    pub input_len_log: usize,
    pub output_len_log: usize,
    pub cst: Vec<Gate<V>>,
    pub add: Vec<Gate<V>>,
    pub mul: Vec<Gate<V>>,
    /// No multiplication gates: the layer is linear and the second sumcheck
    /// pass is skipped.
    pub max_degree_one: bool,
}

#[derive(Clone, Debug)]
pub struct Circuit<V> {
    /// Input layer first, output layer last.
    pub layers: Vec<Layer<V>>,
    /// One row per witness instance (mpi_size x simd_size rows).
    pub public_input: Vec<Vec<V>>,
    /// Leading output wires that must evaluate to zero.
    pub expected_num_output_zeros: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircuitStats {
    pub num_layers: usize,
    pub num_mul_gates: usize,
    pub num_add_gates: usize,
    pub num_cst_gates: usize,
    pub max_var_num: usize,
}

impl<V: Clone> Circuit<V> {
    /// Check wire-id bounds and layer chaining before anything indexes gates.
    pub fn validate(&self) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("circuit has no layers".to_string());
        }
        for (k, layer) in self.layers.iter().enumerate() {
            let input_len = 1usize << layer.input_len_log;
            let output_len = 1usize << layer.output_len_log;
            for gate in layer.mul.iter().chain(&layer.add).chain(&layer.cst) {
                if gate.o_id >= output_len {
                    return Err(format!("layer {k}: output id {} out of range", gate.o_id));
                }
                for &i_id in &gate.i_ids {
                    if i_id >= input_len {
                        return Err(format!("layer {k}: input id {i_id} out of range"));
                    }
                }
            }
            if k + 1 < self.layers.len() && layer.output_len_log != self.layers[k + 1].input_len_log
            {
                return Err(format!("layer {k} output does not chain into layer {}", k + 1));
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> CircuitStats {
        let mut stats = CircuitStats {
            num_layers: self.layers.len(),
            num_mul_gates: 0,
            num_add_gates: 0,
            num_cst_gates: 0,
            max_var_num: 0,
        };
        for layer in &self.layers {
            stats.num_mul_gates += layer.mul.len();
            stats.num_add_gates += layer.add.len();
            stats.num_cst_gates += layer.cst.len();
            stats.max_var_num = stats
                .max_var_num
                .max(layer.input_len_log)
                .max(layer.output_len_log);
        }
        stats
    }

    /// Back-fill every `Random` coefficient with a transcript draw, in
    /// (mul, add, cst) order per layer, layers in order. One-shot: the
    /// circuit is immutable afterwards.
    pub fn fill_rnd_coefs<E>(
        &mut self,
        api: &mut E,
        transcript: &mut FieldHasherTranscript<E>,
    ) -> Result<(), String>
    where
        E: ArithmeticEngine<Var = V>,
    {
        for layer in &mut self.layers {
            for gate in layer
                .mul
                .iter_mut()
                .chain(layer.add.iter_mut())
                .chain(layer.cst.iter_mut())
            {
                if let Coef::Random(slot) = &mut gate.coef {
                    *slot = Some(transcript.circuit_f(api)?);
                }
            }
        }
        Ok(())
    }

    /// Replay every layer's gates over the engine and assert the leading
    /// `expected_num_output_zeros` output wires are zero, per instance.
    pub fn evaluate<E>(&self, api: &mut E, private_input: &[Vec<V>]) -> Result<(), String>
    where
        E: ArithmeticEngine<Var = V>,
    {
        if private_input.len() != self.public_input.len() {
            return Err(format!(
                "instance count mismatch: {} private rows, {} public rows",
                private_input.len(),
                self.public_input.len()
            ));
        }

        for (instance, inputs) in private_input.iter().enumerate() {
            if let Some(first) = self.layers.first() {
                if inputs.len() != 1usize << first.input_len_log {
                    return Err(format!(
                        "instance {instance} carries {} inputs, circuit expects {}",
                        inputs.len(),
                        1usize << first.input_len_log
                    ));
                }
            }
            let mut cur = inputs.clone();
            for layer in &self.layers {
                let zero = api.constant_u64(0);
                let mut out = vec![zero; 1usize << layer.output_len_log];

                for gate in &layer.mul {
                    let coef = gate.coef.actual_local_value(api)?;
                    let product = api.mul(&cur[gate.i_ids[0]], &cur[gate.i_ids[1]]);
                    let term = api.mul(&product, &coef);
                    out[gate.o_id] = api.add(&out[gate.o_id], &term);
                }
                for gate in &layer.add {
                    let coef = gate.coef.actual_local_value(api)?;
                    let term = api.mul(&cur[gate.i_ids[0]], &coef);
                    out[gate.o_id] = api.add(&out[gate.o_id], &term);
                }
                for gate in &layer.cst {
                    let value = match &gate.coef {
                        Coef::PublicInput(idx) => self.public_input[instance]
                            .get(*idx)
                            .cloned()
                            .ok_or_else(|| format!("public input index {idx} out of range"))?,
                        other => other.actual_local_value(api)?,
                    };
                    out[gate.o_id] = api.add(&out[gate.o_id], &value);
                }

                cur = out;
            }

            let zero = api.constant_u64(0);
            for wire in cur.iter().take(self.expected_num_output_zeros) {
                api.assert_eq(wire, &zero)?;
            }
        }
        Ok(())
    }
}
