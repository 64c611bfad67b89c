//! Raw status-code boundary.
//!
//! Collaborators that only speak [`RawHandle`] (device wrappers, tooling
//! that decodes handles off the wire) call these functions. Each one
//! reports failure through `status` instead of a `Result` and returns
//! [`INVALID_HANDLE`] or a neutral default value. `status` is set on every
//! call, to [`STATUS_OK`] on success.

use cobalt_common::hal::handle::{INVALID_HANDLE, RawHandle, ResourceKind, TypedHandle};
use cobalt_common::hal::status::{HalError, STATUS_OK};

use crate::registry::HandleRegistry;

fn typed<K: ResourceKind>(raw: RawHandle) -> Result<TypedHandle<K>, HalError> {
    TypedHandle::from_raw(raw).ok_or(HalError::InvalidHandle)
}

fn channel(channel: i32) -> usize {
    // Negative channels become an out-of-range index.
    usize::try_from(channel).unwrap_or(usize::MAX)
}

/// Store the status of `result` and return its value or `fallback`.
fn report<T>(result: Result<T, HalError>, fallback: T, status: &mut i32) -> T {
    match result {
        Ok(value) => {
            *status = STATUS_OK;
            value
        }
        Err(e) => {
            *status = e.code();
            fallback
        }
    }
}

fn report_handle<K: ResourceKind>(
    result: Result<TypedHandle<K>, HalError>,
    status: &mut i32,
) -> RawHandle {
    report(result.map(TypedHandle::raw), INVALID_HANDLE, status)
}

/// Claim a digital channel.
pub fn initialize_dio_port(
    registry: &HandleRegistry,
    channel_number: i32,
    input: bool,
    status: &mut i32,
) -> RawHandle {
    report_handle(registry.initialize_dio_port(channel(channel_number), input), status)
}

/// Drive a digital output.
pub fn set_dio(registry: &HandleRegistry, handle: RawHandle, value: bool, status: &mut i32) {
    report(typed(handle).and_then(|h| registry.set_dio(h, value)), (), status);
}

/// Read a digital channel; `false` on failure.
pub fn get_dio(registry: &HandleRegistry, handle: RawHandle, status: &mut i32) -> bool {
    report(typed(handle).and_then(|h| registry.get_dio(h)), false, status)
}

/// Release a digital channel. Invalid handles are ignored.
pub fn free_dio_port(registry: &HandleRegistry, handle: RawHandle) {
    if let Ok(h) = typed(handle) {
        registry.free_dio_port(h);
    }
}

/// Claim a PWM channel.
pub fn initialize_pwm_port(
    registry: &HandleRegistry,
    channel_number: i32,
    status: &mut i32,
) -> RawHandle {
    report_handle(registry.initialize_pwm_port(channel(channel_number)), status)
}

/// Set PWM speed (clamped to `[-1, 1]`).
pub fn set_pwm_speed(registry: &HandleRegistry, handle: RawHandle, speed: f64, status: &mut i32) {
    report(
        typed(handle).and_then(|h| registry.set_pwm_speed(h, speed)),
        (),
        status,
    );
}

/// Read PWM speed; `0.0` on failure.
pub fn get_pwm_speed(registry: &HandleRegistry, handle: RawHandle, status: &mut i32) -> f64 {
    report(typed(handle).and_then(|h| registry.get_pwm_speed(h)), 0.0, status)
}

/// Release a PWM channel. Invalid handles are ignored.
pub fn free_pwm_port(registry: &HandleRegistry, handle: RawHandle) {
    if let Ok(h) = typed(handle) {
        registry.free_pwm_port(h);
    }
}

/// Allocate a notifier.
pub fn initialize_notifier(registry: &HandleRegistry, status: &mut i32) -> RawHandle {
    report_handle(registry.initialize_notifier(), status)
}

/// Arm a notifier alarm at an absolute HAL time.
pub fn update_notifier_alarm(
    registry: &HandleRegistry,
    handle: RawHandle,
    trigger_time_us: u64,
    status: &mut i32,
) {
    report(
        typed(handle).and_then(|h| registry.update_notifier_alarm(h, trigger_time_us)),
        (),
        status,
    );
}

/// Block for a notifier alarm; `0` when stopped or on failure.
pub fn wait_for_notifier_alarm(
    registry: &HandleRegistry,
    handle: RawHandle,
    status: &mut i32,
) -> u64 {
    report(
        typed(handle).and_then(|h| registry.wait_for_notifier_alarm(h)),
        0,
        status,
    )
}

/// Stop, drain and free a notifier. Invalid handles are ignored.
pub fn clean_notifier(registry: &HandleRegistry, handle: RawHandle) {
    if let Ok(h) = typed(handle) {
        registry.clean_notifier(h);
    }
}

/// Claim an interrupt channel.
pub fn initialize_interrupt(
    registry: &HandleRegistry,
    channel_number: i32,
    status: &mut i32,
) -> RawHandle {
    report_handle(registry.initialize_interrupt(channel(channel_number)), status)
}

/// Release an interrupt. Invalid handles are ignored.
pub fn free_interrupt(registry: &HandleRegistry, handle: RawHandle) {
    if let Ok(h) = typed(handle) {
        registry.free_interrupt(h);
    }
}
