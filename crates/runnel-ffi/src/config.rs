//! Config builder handles.
//!
//! A C caller creates a builder, sets the model path, bound subcatchment
//! and output list, then passes the handle to `runnel_bridge_create` or
//! `runnel_default_configure`, either of which consumes it.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::Mutex;

use runnel_bridge::{BridgeInstance, BridgeOptions};
use runnel_engine::{AdapterConfig, OutputBinding, RunoffAdapter, SubcatchmentSelector};

use crate::handle::HandleTable;
use crate::status::RunnelStatus;

/// A bridge instance driving the runoff engine.
pub(crate) type RunoffBridge = BridgeInstance<RunoffAdapter>;

static CONFIGS: Mutex<HandleTable<ConfigBuilder>> = Mutex::new(HandleTable::new());

/// Settings accumulated by `runnel_config_*` calls.
#[derive(Clone, Debug, Default)]
pub(crate) struct ConfigBuilder {
    pub adapter: AdapterConfig,
    pub options: BridgeOptions,
}

impl ConfigBuilder {
    /// A fresh, uninitialized bridge for these settings.
    pub fn build(&self) -> RunoffBridge {
        BridgeInstance::with_options(RunoffAdapter::new(self.adapter.clone()), self.options.clone())
    }
}

pub(crate) fn configs() -> &'static Mutex<HandleTable<ConfigBuilder>> {
    &CONFIGS
}

/// Borrow a non-null, UTF-8, NUL-terminated argument.
#[allow(unsafe_code)]
fn str_arg<'a>(ptr: *const c_char) -> Result<&'a str, RunnelStatus> {
    if ptr.is_null() {
        return Err(RunnelStatus::InvalidArgument);
    }
    // SAFETY: caller guarantees ptr is a valid NUL-terminated string that
    // outlives this call.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| RunnelStatus::InvalidArgument)
}

/// Apply `f` to the builder behind `handle`.
fn with_builder(
    handle: u64,
    f: impl FnOnce(&mut ConfigBuilder) -> Result<(), RunnelStatus>,
) -> i32 {
    let mut table = ffi_lock!(CONFIGS);
    let Some(builder) = table.get_mut(handle) else {
        return RunnelStatus::InvalidHandle as i32;
    };
    match f(builder) {
        Ok(()) => RunnelStatus::Ok as i32,
        Err(status) => status as i32,
    }
}

// ── FFI functions ───────────────────────────────────────────────

/// Create a config builder with default settings. Writes the handle to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_config_create(out: *mut u64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return RunnelStatus::InvalidArgument as i32;
        }
        let handle = ffi_lock!(CONFIGS).insert(ConfigBuilder::default());
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = handle };
        RunnelStatus::Ok as i32
    })
}

/// Destroy a config builder that was never consumed.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_config_destroy(handle: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(CONFIGS).remove(handle) {
            Some(_) => RunnelStatus::Ok as i32,
            None => RunnelStatus::InvalidHandle as i32,
        }
    })
}

/// Set the model description file path.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_config_set_model_path(handle: u64, path: *const c_char) -> i32 {
    ffi_guard!({
        let path = match str_arg(path) {
            Ok(p) => p.to_string(),
            Err(status) => return status as i32,
        };
        with_builder(handle, |b| {
            b.adapter.model_path = path.into();
            Ok(())
        })
    })
}

/// Bind the subcatchment named `name`. Resolved at Initialize.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_config_set_subcatchment_name(handle: u64, name: *const c_char) -> i32 {
    ffi_guard!({
        let name = match str_arg(name) {
            Ok(n) if !n.trim().is_empty() => n.trim().to_string(),
            Ok(_) => return RunnelStatus::InvalidArgument as i32,
            Err(status) => return status as i32,
        };
        with_builder(handle, |b| {
            b.adapter.subcatchment = SubcatchmentSelector::Name(name);
            Ok(())
        })
    })
}

/// Bind the subcatchment at 0-based `index`. Resolved at Initialize.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_config_set_subcatchment_index(handle: u64, index: usize) -> i32 {
    ffi_guard!({
        with_builder(handle, |b| {
            b.adapter.subcatchment = SubcatchmentSelector::Index(index);
            Ok(())
        })
    })
}

/// Append one output slot (`runoff`, `depth:S1`, `total_runoff`, ...).
///
/// Returns `ConfigError` if the text names no known output.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_config_add_output(handle: u64, output: *const c_char) -> i32 {
    ffi_guard!({
        let binding = match str_arg(output).map(str::parse::<OutputBinding>) {
            Ok(Ok(binding)) => binding,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "output binding rejected");
                return RunnelStatus::from(&e) as i32;
            }
            Err(status) => return status as i32,
        };
        with_builder(handle, |b| {
            b.adapter.outputs.push(binding);
            Ok(())
        })
    })
}

/// Set the argument buffer capacity (minimum 2, default 10).
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_config_set_capacity(handle: u64, capacity: usize) -> i32 {
    ffi_guard!({
        with_builder(handle, |b| {
            b.options.capacity = capacity;
            Ok(())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn create() -> u64 {
        let mut h = 0u64;
        assert_eq!(runnel_config_create(&mut h), RunnelStatus::Ok as i32);
        h
    }

    fn builder(h: u64) -> ConfigBuilder {
        configs().lock().unwrap().get(h).cloned().unwrap()
    }

    #[test]
    fn setters_update_the_builder() {
        let h = create();
        let path = CString::new("catchment.inp").unwrap();
        let name = CString::new("S7").unwrap();
        let out = CString::new("depth").unwrap();
        assert_eq!(runnel_config_set_model_path(h, path.as_ptr()), 0);
        assert_eq!(runnel_config_set_subcatchment_name(h, name.as_ptr()), 0);
        assert_eq!(runnel_config_add_output(h, out.as_ptr()), 0);
        assert_eq!(runnel_config_set_capacity(h, 4), 0);

        let b = builder(h);
        assert_eq!(b.adapter.model_path, std::path::PathBuf::from("catchment.inp"));
        assert_eq!(b.adapter.subcatchment, SubcatchmentSelector::Name("S7".into()));
        assert_eq!(b.adapter.outputs.as_slice(), &[OutputBinding::Depth(None)]);
        assert_eq!(b.options.capacity, 4);

        assert_eq!(runnel_config_set_subcatchment_index(h, 2), 0);
        assert_eq!(builder(h).adapter.subcatchment, SubcatchmentSelector::Index(2));
        assert_eq!(runnel_config_destroy(h), 0);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        let h = create();
        let blank = CString::new(" ").unwrap();
        let bogus = CString::new("velocity").unwrap();
        assert_eq!(
            runnel_config_set_model_path(h, std::ptr::null()),
            RunnelStatus::InvalidArgument as i32
        );
        assert_eq!(
            runnel_config_set_subcatchment_name(h, blank.as_ptr()),
            RunnelStatus::InvalidArgument as i32
        );
        assert_eq!(
            runnel_config_add_output(h, bogus.as_ptr()),
            RunnelStatus::ConfigError as i32
        );
        assert!(builder(h).adapter.outputs.is_empty());
        assert_eq!(runnel_config_create(std::ptr::null_mut()), RunnelStatus::InvalidArgument as i32);
        runnel_config_destroy(h);
    }

    #[test]
    fn destroyed_handle_is_invalid() {
        let h = create();
        assert_eq!(runnel_config_destroy(h), 0);
        assert_eq!(runnel_config_destroy(h), RunnelStatus::InvalidHandle as i32);
        assert_eq!(
            runnel_config_set_subcatchment_index(h, 0),
            RunnelStatus::InvalidHandle as i32
        );
    }

    #[test]
    fn build_applies_capacity_floor() {
        let mut b = ConfigBuilder::default();
        b.options.capacity = 0;
        assert_eq!(b.build().capacity(), 2);
    }
}
