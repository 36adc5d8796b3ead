//! Integration test: the fixed-signature entry point as a host drives it.
//!
//! The process-default instance is shared by every test in this binary,
//! so each test holds `SERIAL` for its whole run.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::{Mutex, MutexGuard, PoisonError};

use runnel_ffi::config::{runnel_config_create, runnel_config_set_model_path};
use runnel_ffi::{
    runnel_bridge, runnel_default_configure, runnel_default_reset, runnel_default_state,
    runnel_error_message_copy, runnel_error_message_len, RunnelStatus,
};
use runnel_test_utils::fixtures::{treatment_train_model, zero_subcatchment_model};
use runnel_test_utils::ModelFile;

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Host {
    inargs: [f64; 10],
    outargs: [f64; 10],
}

impl Host {
    fn new() -> Self {
        Self {
            inargs: [0.0; 10],
            outargs: [0.0; 10],
        }
    }

    fn call(&mut self, method: i32) -> i32 {
        let mut status = 42;
        runnel_bridge(method, &mut status, self.inargs.as_mut_ptr(), self.outargs.as_mut_ptr());
        status
    }

    fn message(&self) -> String {
        let slot = self.outargs[0];
        let len = runnel_error_message_len(slot);
        let mut buf = vec![0 as c_char; len + 1];
        assert_eq!(runnel_error_message_copy(slot, buf.as_mut_ptr(), buf.len()), len);
        // The address itself points at the same text.
        let direct = unsafe { CStr::from_ptr(slot.to_bits() as usize as *const c_char) };
        let copied = unsafe { CStr::from_ptr(buf.as_ptr()) };
        assert_eq!(direct, copied);
        copied.to_str().unwrap().to_string()
    }
}

fn configure(file: &ModelFile) {
    let mut config = 0u64;
    assert_eq!(runnel_config_create(&mut config), 0);
    let path = CString::new(file.path().to_str().unwrap()).unwrap();
    assert_eq!(runnel_config_set_model_path(config, path.as_ptr()), 0);
    // A previous test may have left a Ready instance behind on failure.
    let mut host = Host::new();
    host.call(99);
    runnel_default_reset();
    assert_eq!(runnel_default_configure(config), 0);
}

fn state() -> i32 {
    let mut out = -1;
    assert_eq!(runnel_default_state(&mut out), 0);
    out
}

#[test]
fn realizations_through_the_default_instance() {
    let _guard = serial();
    let file = ModelFile::new(&treatment_train_model());
    configure(&file);
    let mut host = Host::new();

    assert_eq!(state(), 0);
    assert_eq!(host.call(2), 0);
    assert_eq!(host.outargs[0], 1.0);
    assert_eq!(host.call(3), 0);
    assert_eq!(&host.outargs[..2], &[1.0, 1.0]);

    assert_eq!(host.call(1), 1);
    assert_eq!(host.call(0), 0);
    assert_eq!(state(), 1);
    assert_eq!(host.call(1), 0);
    assert_eq!(host.outargs[0], 0.0);
    host.inargs[0] = 5.0;
    assert_eq!(host.call(1), 0);
    host.inargs[0] = 10.0;
    assert_eq!(host.call(1), 0);

    assert_eq!(runnel_default_reset(), RunnelStatus::InUse as i32);
    assert_eq!(host.call(99), 0);
    assert_eq!(state(), 2);
    assert_eq!(host.call(99), 1);
    assert_eq!(host.call(0), 1);
    assert_eq!(host.call(2), 0);

    // Second realization with the same configuration.
    assert_eq!(runnel_default_reset(), 0);
    assert_eq!(state(), 0);
    assert_eq!(host.call(0), 0);
    assert_eq!(host.call(1), 0);
    assert_eq!(host.call(99), 0);
}

#[test]
fn initialize_failure_carries_a_message() {
    let _guard = serial();
    let file = ModelFile::new(&zero_subcatchment_model());
    configure(&file);
    let mut host = Host::new();
    assert_eq!(host.call(0), -1);
    assert!(host.message().contains("no subcatchments"));
    assert_eq!(state(), 0);
}

#[test]
fn step_failure_keeps_the_simulation_ready() {
    let _guard = serial();
    let file = ModelFile::new(&treatment_train_model());
    configure(&file);
    let mut host = Host::new();
    host.call(0);
    host.inargs[0] = -3.0;
    assert_eq!(host.call(1), -1);
    assert!(host.message().contains("non-negative"));
    assert_eq!(state(), 1);
    host.inargs[0] = 0.0;
    assert_eq!(host.call(1), 0);
    assert_eq!(host.call(99), 0);
}

#[test]
fn unknown_codes_and_null_arguments_fail() {
    let _guard = serial();
    let file = ModelFile::new(&treatment_train_model());
    configure(&file);
    let mut host = Host::new();
    host.outargs = [7.5; 10];
    for code in [-1, 4, 98, 100, i32::MAX] {
        assert_eq!(host.call(code), 1);
    }
    assert_eq!(host.outargs, [7.5; 10]);

    let mut status = 42;
    runnel_bridge(2, &mut status, std::ptr::null_mut(), host.outargs.as_mut_ptr());
    assert_eq!(status, 1);
    runnel_bridge(2, std::ptr::null_mut(), host.inargs.as_mut_ptr(), host.outargs.as_mut_ptr());
}

#[test]
fn configure_is_refused_while_running() {
    let _guard = serial();
    let file = ModelFile::new(&treatment_train_model());
    configure(&file);
    let mut host = Host::new();
    assert_eq!(host.call(0), 0);

    let mut config = 0u64;
    runnel_config_create(&mut config);
    assert_eq!(runnel_default_configure(config), RunnelStatus::InUse as i32);
    assert_eq!(
        runnel_default_configure(config),
        RunnelStatus::InvalidHandle as i32,
        "the config is consumed even when refused"
    );
    assert_eq!(host.call(99), 0);
}
