//! Bridge instance handles.
//!
//! Each handle owns an independent [`BridgeInstance`] behind its own
//! mutex, so the global table lock is held only for the lookup and
//! separate simulations can be stepped from separate threads.

use std::sync::{Arc, Mutex};

use runnel_bridge::{SimulationState, StatusCode, DEFAULT_CAPACITY};
use smallvec::SmallVec;

use crate::config::{configs, RunoffBridge};
use crate::handle::HandleTable;
use crate::status::RunnelStatus;

type BridgeArc = Arc<Mutex<RunoffBridge>>;

static BRIDGES: Mutex<HandleTable<BridgeArc>> = Mutex::new(HandleTable::new());

/// Clone the Arc for a bridge handle, briefly locking the global table.
fn get_bridge(handle: u64) -> Option<BridgeArc> {
    BRIDGES.lock().ok()?.get(handle).cloned()
}

/// Dispatch one call through raw argument buffers.
///
/// Both buffers are read as `bridge.capacity()` doubles. Inputs are copied
/// before the call so a caller passing the same buffer twice stays sound.
///
/// # Safety
///
/// `inargs` and `outargs` must be non-null and valid for
/// `bridge.capacity()` doubles.
#[allow(unsafe_code)]
pub(crate) unsafe fn dispatch_raw(
    bridge: &mut RunoffBridge,
    method: i32,
    inargs: *const f64,
    outargs: *mut f64,
) -> StatusCode {
    let capacity = bridge.capacity();
    // SAFETY: per this function's contract.
    let inputs: SmallVec<[f64; DEFAULT_CAPACITY]> =
        SmallVec::from_slice(unsafe { std::slice::from_raw_parts(inargs, capacity) });
    // SAFETY: per this function's contract; no other reference to the
    // buffer is live.
    let outputs = unsafe { std::slice::from_raw_parts_mut(outargs, capacity) };
    bridge.dispatch(method, &inputs, outputs)
}

/// Raw value of a lifecycle state: 0 Uninitialized, 1 Ready, 2 Finalized.
pub(crate) fn state_code(state: SimulationState) -> i32 {
    match state {
        SimulationState::Uninitialized => 0,
        SimulationState::Ready => 1,
        SimulationState::Finalized => 2,
    }
}

// ── FFI functions ───────────────────────────────────────────────

/// Create an uninitialized bridge from a config handle. Consumes the config.
///
/// On success writes the bridge handle to `out`. The config is consumed
/// even when `out` is null.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_bridge_create(config_handle: u64, out: *mut u64) -> i32 {
    ffi_guard!({
        let builder = match ffi_lock!(configs()).remove(config_handle) {
            Some(b) => b,
            None => return RunnelStatus::InvalidHandle as i32,
        };
        if out.is_null() {
            return RunnelStatus::InvalidArgument as i32;
        }
        let bridge = builder.build();
        tracing::debug!(
            model = %builder.adapter.model_path.display(),
            capacity = bridge.capacity(),
            "bridge created"
        );
        let handle = ffi_lock!(BRIDGES).insert(Arc::new(Mutex::new(bridge)));
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = handle };
        RunnelStatus::Ok as i32
    })
}

/// Run one protocol call on a bridge handle.
///
/// The protocol outcome (0, 1 or -1) is written to `status`; the return
/// value only reports handle or argument problems. Both buffers must hold
/// at least the configured capacity (default 10) of doubles.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_bridge_dispatch(
    handle: u64,
    method: i32,
    status: *mut i32,
    inargs: *const f64,
    outargs: *mut f64,
) -> i32 {
    ffi_guard!({
        if status.is_null() || inargs.is_null() || outargs.is_null() {
            return RunnelStatus::InvalidArgument as i32;
        }
        let Some(arc) = get_bridge(handle) else {
            return RunnelStatus::InvalidHandle as i32;
        };
        let mut bridge = ffi_lock!(arc);
        // SAFETY: buffers are non-null and sized per caller contract.
        let code = unsafe { dispatch_raw(&mut bridge, method, inargs, outargs) };
        // SAFETY: status is non-null and valid per caller contract.
        unsafe { *status = code.raw() };
        RunnelStatus::Ok as i32
    })
}

/// Destroy a bridge handle. A live engine is torn down first.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_bridge_destroy(handle: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(BRIDGES).remove(handle) {
            Some(_) => RunnelStatus::Ok as i32,
            None => RunnelStatus::InvalidHandle as i32,
        }
    })
}

/// Write the lifecycle state (0 Uninitialized, 1 Ready, 2 Finalized) to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_bridge_state(handle: u64, out: *mut i32) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return RunnelStatus::InvalidArgument as i32;
        }
        let Some(arc) = get_bridge(handle) else {
            return RunnelStatus::InvalidHandle as i32;
        };
        let state = ffi_lock!(arc).state();
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = state_code(state) };
        RunnelStatus::Ok as i32
    })
}

/// Write the simulated seconds since the start to `out`.
///
/// Writes 0 when no engine is live.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_bridge_elapsed(handle: u64, out: *mut f64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return RunnelStatus::InvalidArgument as i32;
        }
        let Some(arc) = get_bridge(handle) else {
            return RunnelStatus::InvalidHandle as i32;
        };
        let elapsed = ffi_lock!(arc)
            .engine()
            .map_or(0.0, |session| session.engine().elapsed_seconds());
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = elapsed };
        RunnelStatus::Ok as i32
    })
}
