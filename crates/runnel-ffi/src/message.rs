//! Reading a `FailureWithMessage` text back out of an output slot.
//!
//! C hosts can cast the decoded address straight to `const char *`. These
//! helpers serve clients (Python `ctypes`, test drivers) that would rather
//! not reinterpret a `double` themselves.

use std::ffi::CStr;
use std::os::raw::c_char;

use runnel_bridge::message::decode_address;

/// The message whose address is stored in `slot`, if the address is non-null.
///
/// # Safety
///
/// `slot` must hold the address of a live NUL-terminated string, or 0.
#[allow(unsafe_code)]
unsafe fn message_at<'a>(slot: f64) -> Option<&'a CStr> {
    let address = decode_address(slot);
    if address == 0 {
        return None;
    }
    // SAFETY: per this function's contract.
    Some(unsafe { CStr::from_ptr(address as *const c_char) })
}

/// Length in bytes, excluding the NUL, of the message encoded in `slot`.
///
/// Returns 0 for a zero slot. `slot` must be the `outargs[0]` value of the
/// most recent `FailureWithMessage` on a bridge that has not been reset,
/// cleaned up or destroyed since.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_error_message_len(slot: f64) -> usize {
    ffi_guard_or!(0, {
        // SAFETY: per caller contract.
        unsafe { message_at(slot) }.map_or(0, |text| text.to_bytes().len())
    })
}

/// Copy the message encoded in `slot` into `buf`.
///
/// Returns the full message length like [`runnel_error_message_len`]. At
/// most `len - 1` bytes are copied and `buf` is NUL-terminated whenever
/// it is non-null and `len > 0`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_error_message_copy(slot: f64, buf: *mut c_char, len: usize) -> usize {
    ffi_guard_or!(0, {
        // SAFETY: per caller contract.
        let bytes = unsafe { message_at(slot) }.map_or(&[][..], CStr::to_bytes);
        if !buf.is_null() && len > 0 {
            let n = bytes.len().min(len - 1);
            // SAFETY: caller guarantees buf points to at least len bytes.
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buf, n);
                *buf.add(n) = 0;
            }
        }
        bytes.len()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use runnel_bridge::message::encode_address;

    #[test]
    fn zero_slot_has_no_message() {
        assert_eq!(runnel_error_message_len(0.0), 0);
        let mut buf = [7 as c_char; 4];
        assert_eq!(runnel_error_message_copy(0.0, buf.as_mut_ptr(), buf.len()), 0);
        assert_eq!(buf[0], 0);
    }

    #[test]
    #[allow(unsafe_code)]
    fn encoded_text_is_recovered() {
        let text = c"subcatchment 'S9' not found in model";
        let slot = encode_address(text.as_ptr() as usize);
        assert_eq!(runnel_error_message_len(slot), text.to_bytes().len());

        let mut buf = vec![0 as c_char; 64];
        let n = runnel_error_message_copy(slot, buf.as_mut_ptr(), buf.len());
        assert_eq!(n, text.to_bytes().len());
        // SAFETY: the copy NUL-terminated buf.
        let copied = unsafe { CStr::from_ptr(buf.as_ptr()) };
        assert_eq!(copied, text);
    }

    #[test]
    fn copy_truncates() {
        let text = c"horizon";
        let slot = encode_address(text.as_ptr() as usize);
        let mut buf = [1 as c_char; 4];
        assert_eq!(runnel_error_message_copy(slot, buf.as_mut_ptr(), buf.len()), 7);
        let bytes: Vec<u8> = buf.iter().map(|&c| c as u8).collect();
        assert_eq!(bytes, b"hor\0");
    }
}
