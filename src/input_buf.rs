//! Little-endian typed reader over a serialized input stream.
//!
//! Circuit, witness and proof files all flow through this cursor. Field
//! elements occupy exactly `field_bytes` little-endian bytes; the stream
//! opens with a 32-byte modulus that must match the expected field profile.

use num_bigint::BigUint;

use crate::fields::{FieldKind, LEADING_FIELD_BYTES};

pub struct InputBuf<'a> {
    data: &'a [u8],
    field: FieldKind,
}

impl<'a> InputBuf<'a> {
    pub fn new(data: &'a [u8], field: FieldKind) -> Self {
        Self { data, field }
    }

    pub fn field_kind(&self) -> FieldKind {
        self.field
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn take(&mut self, n_bytes: usize) -> Result<&'a [u8], String> {
        if self.data.len() < n_bytes {
            return Err(format!(
                "short read: wanted {n_bytes} bytes, {} remaining",
                self.data.len()
            ));
        }
        let (head, tail) = self.data.split_at(n_bytes);
        self.data = tail;
        Ok(head)
    }

    pub fn read_u8(&mut self) -> Result<u8, String> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u64(&mut self) -> Result<u64, String> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn read_usize(&mut self) -> Result<usize, String> {
        let v = self.read_u64()?;
        usize::try_from(v).map_err(|_| format!("length {v} does not fit the platform"))
    }

    /// Read one base-field element: `field_bytes` little-endian bytes,
    /// interpreted as a big integer.
    pub fn read_field_element(&mut self) -> Result<BigUint, String> {
        let bytes = self.take(self.field.field_bytes())?;
        Ok(BigUint::from_bytes_le(bytes))
    }

    /// Consume the 32-byte modulus header and check it against the expected
    /// field profile.
    pub fn detect_field_modulus(&mut self) -> Result<(), String> {
        let bytes = self.take(LEADING_FIELD_BYTES)?;
        let modulus = BigUint::from_bytes_le(bytes);
        if modulus != self.field.field_modulus() {
            return Err("incorrect field modulus detected".to_string());
        }
        Ok(())
    }
}
