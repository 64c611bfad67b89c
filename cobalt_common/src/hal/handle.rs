//! Handle codec: 32-bit resource handles.
//!
//! A handle is an `i32` that packs a resource kind tag, a primary index, an
//! optional secondary index and a generation counter. Decoding is pure bit
//! arithmetic and never touches the referenced resource.
//!
//! ```text
//!  31 30        24 23        16 15         8 7          0
//! ┌──┬────────────┬────────────┬────────────┬────────────┐
//! │0 │  kind tag  │ generation │   index2   │   index    │
//! └──┴────────────┴────────────┴────────────┴────────────┘
//! ```
//!
//! `-1` ([`INVALID_HANDLE`]) is the only value that means "no resource" for
//! every kind. Generation `0` is never stamped, so `0` is never valid either.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use static_assertions::const_assert;

/// Wire representation of a handle.
pub type RawHandle = i32;

/// Universal "invalid / unallocated" handle.
pub const INVALID_HANDLE: RawHandle = -1;

// ─── Bit Layout ─────────────────────────────────────────────────────

const INDEX_SHIFT: u32 = 0;
const INDEX2_SHIFT: u32 = 8;
const GENERATION_SHIFT: u32 = 16;
const KIND_SHIFT: u32 = 24;

const FIELD_MASK: u32 = 0xFF;
const KIND_MASK: u32 = 0x7F;

/// Largest primary index a handle can carry (inclusive).
pub const MAX_HANDLE_INDEX: usize = FIELD_MASK as usize;

/// Largest secondary index a handle can carry (inclusive).
pub const MAX_HANDLE_INDEX2: usize = FIELD_MASK as usize;

const_assert!(INDEX2_SHIFT >= INDEX_SHIFT + 8);
const_assert!(GENERATION_SHIFT >= INDEX2_SHIFT + 8);
const_assert!(KIND_SHIFT >= GENERATION_SHIFT + 8);
// The sign bit must stay clear for every valid handle.
const_assert!(KIND_SHIFT + 7 <= 31);

// ─── Resource Kinds ─────────────────────────────────────────────────

/// Resource kind encoded in the handle's type tag.
///
/// Tag values are fixed: external tools decode them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum HandleKind {
    /// Never used by a live handle.
    Undefined = 0,
    /// Digital I/O channel.
    Dio = 1,
    /// Hardware port descriptor.
    Port = 2,
    /// Timed notifier (alarm).
    Notifier = 3,
    /// Digital interrupt.
    Interrupt = 4,
    /// Analog output channel.
    AnalogOutput = 5,
    /// Analog input channel.
    AnalogInput = 6,
    /// Analog trigger.
    AnalogTrigger = 7,
    /// Relay channel.
    Relay = 8,
    /// PWM output channel.
    Pwm = 9,
    /// PWM generated on a digital channel.
    DigitalPwm = 10,
    /// Up/down counter.
    Counter = 11,
    /// Quadrature encoder (two channels).
    Encoder = 13,
    /// Vendor-defined resource.
    Vendor = 17,
    /// Duty cycle input.
    DutyCycle = 21,
}

impl HandleKind {
    /// Decode a type tag.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Undefined),
            1 => Some(Self::Dio),
            2 => Some(Self::Port),
            3 => Some(Self::Notifier),
            4 => Some(Self::Interrupt),
            5 => Some(Self::AnalogOutput),
            6 => Some(Self::AnalogInput),
            7 => Some(Self::AnalogTrigger),
            8 => Some(Self::Relay),
            9 => Some(Self::Pwm),
            10 => Some(Self::DigitalPwm),
            11 => Some(Self::Counter),
            13 => Some(Self::Encoder),
            17 => Some(Self::Vendor),
            21 => Some(Self::DutyCycle),
            _ => None,
        }
    }

    /// Short lowercase name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Dio => "dio",
            Self::Port => "port",
            Self::Notifier => "notifier",
            Self::Interrupt => "interrupt",
            Self::AnalogOutput => "analog_output",
            Self::AnalogInput => "analog_input",
            Self::AnalogTrigger => "analog_trigger",
            Self::Relay => "relay",
            Self::Pwm => "pwm",
            Self::DigitalPwm => "digital_pwm",
            Self::Counter => "counter",
            Self::Encoder => "encoder",
            Self::Vendor => "vendor",
            Self::DutyCycle => "duty_cycle",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Codec ──────────────────────────────────────────────────────────

/// All fields of a decoded handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedHandle {
    /// Resource kind.
    pub kind: HandleKind,
    /// Primary slot index.
    pub index: u8,
    /// Secondary index (0 when unused).
    pub index2: u8,
    /// Generation stamped at allocation time (never 0).
    pub generation: u8,
}

/// Pack handle fields into a raw handle.
///
/// Returns [`INVALID_HANDLE`] for `HandleKind::Undefined` or generation 0.
#[inline]
pub const fn encode(kind: HandleKind, index: u8, index2: u8, generation: u8) -> RawHandle {
    if matches!(kind, HandleKind::Undefined) || generation == 0 {
        return INVALID_HANDLE;
    }
    let bits = ((kind as u32 & KIND_MASK) << KIND_SHIFT)
        | ((generation as u32) << GENERATION_SHIFT)
        | ((index2 as u32) << INDEX2_SHIFT)
        | ((index as u32) << INDEX_SHIFT);
    bits as RawHandle
}

/// Unpack a raw handle.
///
/// Returns `None` for negative values, unknown or undefined kind tags and
/// generation 0.
#[inline]
pub const fn decode(raw: RawHandle) -> Option<DecodedHandle> {
    if raw < 0 {
        return None;
    }
    let bits = raw as u32;
    let kind = match HandleKind::from_u8(((bits >> KIND_SHIFT) & KIND_MASK) as u8) {
        Some(HandleKind::Undefined) | None => return None,
        Some(kind) => kind,
    };
    let generation = ((bits >> GENERATION_SHIFT) & FIELD_MASK) as u8;
    if generation == 0 {
        return None;
    }
    Some(DecodedHandle {
        kind,
        index: ((bits >> INDEX_SHIFT) & FIELD_MASK) as u8,
        index2: ((bits >> INDEX2_SHIFT) & FIELD_MASK) as u8,
        generation,
    })
}

/// Kind tag of a raw handle, if it decodes.
#[inline]
pub const fn kind_of(raw: RawHandle) -> Option<HandleKind> {
    match decode(raw) {
        Some(decoded) => Some(decoded.kind),
        None => None,
    }
}

/// Primary index of a raw handle, only if it is of the expected kind.
#[inline]
pub fn index_of(raw: RawHandle, kind: HandleKind) -> Option<u8> {
    decode(raw)
        .filter(|decoded| decoded.kind == kind)
        .map(|decoded| decoded.index)
}

/// Generation that follows `generation`, wrapping 255 → 1.
#[inline]
pub const fn next_generation(generation: u8) -> u8 {
    match generation.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

// ─── Typed Handles ──────────────────────────────────────────────────

/// Compile-time tag tying a [`TypedHandle`] to one resource kind.
pub trait ResourceKind: 'static {
    /// Kind stamped into every handle of this type.
    const KIND: HandleKind;
}

macro_rules! resource_kinds {
    ($($(#[$doc:meta])* $name:ident => $kind:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug)]
            pub enum $name {}

            impl ResourceKind for $name {
                const KIND: HandleKind = HandleKind::$kind;
            }
        )*
    };
}

resource_kinds! {
    /// Digital I/O marker.
    Dio => Dio,
    /// PWM output marker.
    Pwm => Pwm,
    /// Notifier marker.
    Notifier => Notifier,
    /// Counter marker.
    Counter => Counter,
    /// Interrupt marker.
    Interrupt => Interrupt,
    /// Quadrature encoder marker.
    Encoder => Encoder,
    /// Analog input marker.
    AnalogInput => AnalogInput,
    /// Vendor resource marker.
    Vendor => Vendor,
}

/// A raw handle statically known to belong to resource kind `K`.
///
/// Passing a PWM handle where a DIO handle is expected does not compile.
/// Conversion from a [`RawHandle`] re-checks the kind tag.
pub struct TypedHandle<K: ResourceKind> {
    raw: RawHandle,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> TypedHandle<K> {
    /// Encode a new handle of kind `K`. Returns `None` for generation 0.
    #[inline]
    pub fn encode(index: u8, index2: u8, generation: u8) -> Option<Self> {
        Self::from_raw(encode(K::KIND, index, index2, generation))
    }

    /// Wrap a raw handle if its tag matches `K`.
    #[inline]
    pub fn from_raw(raw: RawHandle) -> Option<Self> {
        match decode(raw) {
            Some(decoded) if decoded.kind == K::KIND => Some(Self {
                raw,
                _kind: PhantomData,
            }),
            _ => None,
        }
    }

    /// Wire value.
    #[inline]
    pub const fn raw(self) -> RawHandle {
        self.raw
    }

    /// Decoded fields. Always succeeds for a constructed typed handle.
    #[inline]
    pub fn decoded(self) -> DecodedHandle {
        let raw = self.raw as u32;
        DecodedHandle {
            kind: K::KIND,
            index: ((raw >> INDEX_SHIFT) & FIELD_MASK) as u8,
            index2: ((raw >> INDEX2_SHIFT) & FIELD_MASK) as u8,
            generation: ((raw >> GENERATION_SHIFT) & FIELD_MASK) as u8,
        }
    }

    /// Primary index.
    #[inline]
    pub fn index(self) -> u8 {
        self.decoded().index
    }

    /// Secondary index.
    #[inline]
    pub fn index2(self) -> u8 {
        self.decoded().index2
    }

    /// Generation.
    #[inline]
    pub fn generation(self) -> u8 {
        self.decoded().generation
    }
}

impl<K: ResourceKind> Clone for TypedHandle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: ResourceKind> Copy for TypedHandle<K> {}

impl<K: ResourceKind> PartialEq for TypedHandle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K: ResourceKind> Eq for TypedHandle<K> {}

impl<K: ResourceKind> Hash for TypedHandle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K: ResourceKind> fmt::Debug for TypedHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.decoded();
        write!(
            f,
            "{}#{}.{}@g{} ({:#010x})",
            d.kind, d.index, d.index2, d.generation, self.raw
        )
    }
}

impl<K: ResourceKind> From<TypedHandle<K>> for RawHandle {
    fn from(handle: TypedHandle<K>) -> Self {
        handle.raw
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
