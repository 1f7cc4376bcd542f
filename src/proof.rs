//! Proof stream: a positioned sequence of base-field elements.
//!
//! The verifier consumes elements strictly in the protocol-defined order
//! through a monotonic cursor; reading past the end means the proof does not
//! carry the data the protocol demands and is fatal.

use num_bigint::BigUint;

#[derive(Clone, Debug)]
pub struct Proof {
    elems: Vec<BigUint>,
    idx: usize,
}

impl Proof {
    pub fn new(elems: Vec<BigUint>) -> Self {
        Self { elems, idx: 0 }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Consume the next element.
    pub fn next(&mut self) -> Result<BigUint, String> {
        let elem = self
            .elems
            .get(self.idx)
            .cloned()
            .ok_or_else(|| "proof stream exhausted".to_string())?;
        self.idx += 1;
        Ok(elem)
    }

    /// Rewind the cursor to the start of the stream.
    pub fn reset(&mut self) {
        self.idx = 0;
    }

    /// Elements not yet consumed.
    pub fn remaining(&self) -> usize {
        self.elems.len() - self.idx
    }

    #[cfg(test)]
    pub(crate) fn elems_mut(&mut self) -> &mut Vec<BigUint> {
        &mut self.elems
    }
}
