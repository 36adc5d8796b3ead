//! The fixed-signature entry point and its process-default instance.
//!
//! [`runnel_bridge`] has no handle argument, so it drives one bridge
//! instance per process, created on first use from the configuration
//! installed by [`runnel_default_configure`] or, failing that, from the
//! `RUNNEL_MODEL`, `RUNNEL_SUBCATCHMENT` and `RUNNEL_OUTPUTS` environment
//! variables. The instance lives behind a mutex, so concurrent callers
//! are serialized.

use std::sync::Mutex;

use runnel_bridge::{BridgeInstance, SimulationState, StatusCode};
use runnel_engine::{AdapterConfig, BindingError, RunoffAdapter};

use crate::bridge::dispatch_raw;
use crate::config::{configs, ConfigBuilder, RunoffBridge};
use crate::status::RunnelStatus;

struct DefaultSlot {
    bridge: Option<RunoffBridge>,
    config: Option<ConfigBuilder>,
}

impl DefaultSlot {
    const fn new() -> Self {
        Self {
            bridge: None,
            config: None,
        }
    }

    /// The instance, created on first use.
    fn instance(&mut self) -> &mut RunoffBridge {
        self.instance_or(AdapterConfig::from_env)
    }

    /// Like [`instance`](Self::instance), reading the fallback
    /// configuration from `fallback` instead of the environment.
    ///
    /// A fallback error does not prevent creation: the instance answers
    /// metadata from defaults and reports the error from Initialize.
    fn instance_or(
        &mut self,
        fallback: impl FnOnce() -> Result<AdapterConfig, BindingError>,
    ) -> &mut RunoffBridge {
        let config = &self.config;
        self.bridge.get_or_insert_with(|| match config {
            Some(builder) => {
                tracing::info!(
                    model = %builder.adapter.model_path.display(),
                    "process-default bridge created"
                );
                builder.build()
            }
            None => {
                let adapter = RunoffAdapter::from_config(fallback());
                match adapter.rejected() {
                    Some(e) => tracing::error!(error = %e, "environment configuration rejected"),
                    None => tracing::info!(
                        model = %adapter.config().model_path.display(),
                        "process-default bridge created from environment"
                    ),
                }
                BridgeInstance::new(adapter)
            }
        })
    }

    fn is_busy(&self) -> bool {
        self.bridge
            .as_ref()
            .is_some_and(|b| b.state() == SimulationState::Ready)
    }
}

static DEFAULT: Mutex<DefaultSlot> = Mutex::new(DefaultSlot::new());

/// The host-facing bridge entry point.
///
/// `method` is 0 Initialize, 1 Calculate, 2 ReportVersion,
/// 3 ReportArguments or 99 Cleanup. The outcome is written to `*status`:
/// 0 Success, 1 Failure, -1 FailureWithMessage (then `outargs[0]` holds
/// the address of a NUL-terminated message). Both buffers must hold at
/// least the configured capacity (default 10) of doubles.
///
/// A null `status` makes the call a no-op. Null buffers, a poisoned
/// instance and panics outside the engine all report `Failure`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_bridge(method: i32, status: *mut i32, inargs: *mut f64, outargs: *mut f64) {
    if status.is_null() {
        return;
    }
    // SAFETY: status is non-null and valid per caller contract.
    unsafe { *status = StatusCode::Failure.raw() };
    let code = ffi_guard_or!(StatusCode::Failure, {
        if inargs.is_null() || outargs.is_null() {
            return StatusCode::Failure;
        }
        let Ok(mut slot) = DEFAULT.lock() else {
            return StatusCode::Failure;
        };
        // SAFETY: buffers are non-null and sized per caller contract.
        unsafe { dispatch_raw(slot.instance(), method, inargs, outargs) }
    });
    // SAFETY: as above.
    unsafe { *status = code.raw() };
}

/// Discard the process-default instance so the next call starts afresh.
///
/// Used by drivers that run several realizations in one process. Returns
/// `InUse` while the instance is between Initialize and Cleanup.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_default_reset() -> i32 {
    ffi_guard!({
        let mut slot = ffi_lock!(DEFAULT);
        if slot.is_busy() {
            return RunnelStatus::InUse as i32;
        }
        slot.bridge = None;
        tracing::info!("process-default bridge reset");
        RunnelStatus::Ok as i32
    })
}

/// Install a configuration for the process-default instance. Consumes the config.
///
/// Replaces an Uninitialized or Finalized instance. Returns `InUse`
/// while the instance is between Initialize and Cleanup; the config is
/// consumed either way.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_default_configure(config_handle: u64) -> i32 {
    ffi_guard!({
        let builder = match ffi_lock!(configs()).remove(config_handle) {
            Some(b) => b,
            None => return RunnelStatus::InvalidHandle as i32,
        };
        let mut slot = ffi_lock!(DEFAULT);
        if slot.is_busy() {
            return RunnelStatus::InUse as i32;
        }
        slot.bridge = None;
        slot.config = Some(builder);
        RunnelStatus::Ok as i32
    })
}

/// Write the process-default lifecycle state (0, 1 or 2) to `out`.
///
/// Writes 0 when no instance has been created yet.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn runnel_default_state(out: *mut i32) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return RunnelStatus::InvalidArgument as i32;
        }
        let state = ffi_lock!(DEFAULT)
            .bridge
            .as_ref()
            .map_or(SimulationState::Uninitialized, |b| b.state());
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = crate::bridge::state_code(state) };
        RunnelStatus::Ok as i32
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use runnel_bridge::DEFAULT_CAPACITY;
    use runnel_engine::SubcatchmentSelector;

    fn bad_outputs() -> Result<AdapterConfig, BindingError> {
        Err(BindingError::UnknownOutput { text: "velocity".into() })
    }

    #[test]
    fn bad_environment_still_creates_an_instance() {
        let mut slot = DefaultSlot::new();
        let bridge = slot.instance_or(bad_outputs);
        assert!(bridge.adapter().rejected().is_some());

        let inputs = [0.0; DEFAULT_CAPACITY];
        let mut outputs = [0.0; DEFAULT_CAPACITY];
        assert_eq!(bridge.dispatch(3, &inputs, &mut outputs), StatusCode::Success);
        assert_eq!(&outputs[..2], &[1.0, 1.0]);
        assert_eq!(bridge.dispatch(1, &inputs, &mut outputs), StatusCode::Failure);
        assert_eq!(bridge.dispatch(0, &inputs, &mut outputs), StatusCode::FailureWithMessage);
        let text = bridge.last_message().unwrap().to_str().unwrap();
        assert!(text.contains("velocity"), "{text}");
        assert_eq!(bridge.state(), SimulationState::Uninitialized);
    }

    #[test]
    fn instance_is_created_once() {
        let mut slot = DefaultSlot::new();
        slot.instance_or(bad_outputs);
        let bridge = slot.instance_or(|| panic!("fallback must not be read twice"));
        assert!(bridge.adapter().rejected().is_some());
    }

    #[test]
    fn installed_config_wins_over_fallback() {
        let mut slot = DefaultSlot::new();
        let mut builder = ConfigBuilder::default();
        builder.adapter.subcatchment = SubcatchmentSelector::Name("S2".into());
        slot.config = Some(builder);
        let bridge = slot.instance_or(|| panic!("fallback must not be read"));
        assert_eq!(
            bridge.adapter().config().subcatchment,
            SubcatchmentSelector::Name("S2".into())
        );
        assert!(!slot.is_busy());
    }
}
