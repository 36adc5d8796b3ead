//! C ABI for the Runnel simulation bridge.
//!
//! Three surfaces share one `cdylib`:
//!
//! - [`runnel_bridge`], the fixed-signature entry point a host calls with a
//!   method code, a status slot and two `double` buffers. It drives one
//!   process-default bridge instance configured from the environment or
//!   through [`runnel_default_configure`].
//! - A handle API (`runnel_config_*`, `runnel_bridge_create`,
//!   `runnel_bridge_dispatch`, `runnel_bridge_destroy`) for hosts that
//!   run several independent simulations in one process.
//! - Helpers for test clients: [`runnel_error_message_len`],
//!   [`runnel_error_message_copy`] and [`runnel_last_panic_message`].
//!
//! This is the only crate in the workspace that contains `unsafe` code.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

use std::cell::RefCell;
use std::os::raw::c_char;

thread_local! {
    /// Text of the most recent panic caught on this thread.
    pub(crate) static LAST_PANIC: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Record a caught panic payload in [`LAST_PANIC`].
pub(crate) fn record_panic(payload: &(dyn std::any::Any + Send)) {
    let text = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    tracing::error!(panic = %text, "panic caught at the C boundary");
    LAST_PANIC.with(|cell| *cell.borrow_mut() = text);
}

/// Run `$body`, returning `$default` if it panics.
macro_rules! ffi_guard_or {
    ($default:expr, $body:block) => {{
        $crate::logging::init();
        match ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| $body)) {
            Ok(value) => value,
            Err(payload) => {
                $crate::record_panic(payload.as_ref());
                $default
            }
        }
    }};
}

/// Run `$body`, returning `RunnelStatus::Panicked` if it panics.
macro_rules! ffi_guard {
    ($body:block) => {
        ffi_guard_or!($crate::status::RunnelStatus::Panicked as i32, $body)
    };
}

/// Lock a mutex, returning `RunnelStatus::InternalError` if it is poisoned.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::RunnelStatus::InternalError as i32,
        }
    };
}

pub mod bridge;
pub mod config;
pub mod default;
mod handle;
mod logging;
pub mod message;
pub mod status;

pub use bridge::{
    runnel_bridge_create, runnel_bridge_destroy, runnel_bridge_dispatch, runnel_bridge_elapsed,
    runnel_bridge_state,
};
pub use default::{
    runnel_bridge, runnel_default_configure, runnel_default_reset, runnel_default_state,
};
pub use message::{runnel_error_message_copy, runnel_error_message_len};
pub use status::RunnelStatus;

/// Copy the most recent panic message on this thread into `buf`.
///
/// Returns the full message length in bytes, excluding the NUL. When `buf`
/// is null only the length is returned. Otherwise at most `len - 1` bytes
/// are copied and the result is NUL-terminated.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_last_panic_message(buf: *mut c_char, len: usize) -> i32 {
    LAST_PANIC.with(|cell| {
        let text = cell.borrow();
        if !buf.is_null() && len > 0 {
            let n = text.len().min(len - 1);
            // SAFETY: caller guarantees buf points to at least len bytes.
            unsafe {
                std::ptr::copy_nonoverlapping(text.as_ptr().cast::<c_char>(), buf, n);
                *buf.add(n) = 0;
            }
        }
        i32::try_from(text.len()).unwrap_or(i32::MAX)
    })
}
