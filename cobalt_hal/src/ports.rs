//! Port resources owned by the registry's slot tables.
//!
//! Each submodule defines the resource stored in a slot and the registry
//! operations for its kind. The resources are simulation state (atomics),
//! so reads and writes never take a manager lock for longer than a lookup.

mod analog;
mod counter;
mod dio;
mod encoder;
mod interrupt;
mod pwm;
pub mod raw;
mod vendor;

pub use analog::AnalogInputPort;
pub use counter::CounterState;
pub use dio::DigitalPort;
pub use encoder::EncoderState;
pub use interrupt::InterruptPort;
pub use pwm::PwmPort;
