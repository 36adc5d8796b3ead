//! Out-of-band error text returned through a numeric output slot.
//!
//! On `FailureWithMessage` the address of a NUL-terminated string owned by
//! the bridge instance is bit-cast into `outputs[0]`. The string stays
//! valid until the instance replaces it, clears it, or is dropped.

use std::ffi::{CStr, CString};

use runnel_core::Diagnostic;

/// The bridge instance's current error message, if any.
#[derive(Debug, Default)]
pub struct ErrorMessage {
    text: Option<CString>,
}

impl ErrorMessage {
    /// Replace the current message with `diagnostic`'s text.
    pub fn set(&mut self, diagnostic: Diagnostic) -> &CStr {
        // Diagnostic strips interior NULs.
        let text = CString::new(diagnostic.into_message())
            .unwrap_or_else(|_| CString::from(c"engine failure"));
        self.text.insert(text).as_c_str()
    }

    /// Drop the current message.
    pub fn clear(&mut self) {
        self.text = None;
    }

    /// The current message.
    pub fn get(&self) -> Option<&CStr> {
        self.text.as_deref()
    }

    /// Bit-cast the current message's address into `outputs[0]`.
    ///
    /// Writes nothing when there is no message or `outputs` is empty.
    pub fn encode_into(&self, outputs: &mut [f64]) {
        if let (Some(text), Some(slot)) = (&self.text, outputs.first_mut()) {
            *slot = encode_address(text.as_ptr() as usize);
        }
    }
}

/// Store a native address in the bits of an `f64`.
pub fn encode_address(address: usize) -> f64 {
    f64::from_bits(address as u64)
}

/// Recover an address stored by [`encode_address`].
pub fn decode_address(slot: f64) -> usize {
    slot.to_bits() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_writes_address_of_current_text() {
        let mut m = ErrorMessage::default();
        let mut out = [0.0; 3];
        m.encode_into(&mut out);
        assert_eq!(out, [0.0; 3]);

        let ptr = m.set(Diagnostic::new("model has no subcatchments")).as_ptr() as usize;
        m.encode_into(&mut out);
        assert_eq!(decode_address(out[0]), ptr);
        assert_eq!(out[1..], [0.0, 0.0]);
        assert_eq!(m.get().unwrap().to_str().unwrap(), "model has no subcatchments");
    }

    #[test]
    fn address_bits_survive_the_slot() {
        for addr in [0usize, 1, 0x7fff_1234_5678, usize::MAX >> 8] {
            assert_eq!(decode_address(encode_address(addr)), addr);
        }
    }

    #[test]
    fn clear_drops_text() {
        let mut m = ErrorMessage::default();
        m.set(Diagnostic::new("x"));
        m.clear();
        assert!(m.get().is_none());
    }
}
