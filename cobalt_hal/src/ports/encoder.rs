//! Quadrature encoders.
//!
//! An encoder reads two digital inputs. Its handle is indexed by channel A
//! with channel B as the secondary index, and both digital channels are
//! claimed for as long as the encoder lives.

use std::sync::atomic::{AtomicI64, Ordering};

use cobalt_common::hal::consts::NUM_DIO_CHANNELS;
use cobalt_common::hal::status::HalError;
use tracing::debug;

use crate::registry::{DioHandle, EncoderHandle, HandleRegistry};

/// Encoder resource.
#[derive(Debug)]
pub struct EncoderState {
    channel_a: DioHandle,
    channel_b: DioHandle,
    count: AtomicI64,
}

impl EncoderState {
    /// Digital handles backing the encoder, A then B.
    pub fn channels(&self) -> (DioHandle, DioHandle) {
        (self.channel_a, self.channel_b)
    }
}

impl HandleRegistry {
    /// Claim two digital inputs and build an encoder on them.
    ///
    /// # Errors
    /// - `ChannelIndexOutOfRange` if either channel is past the DIO range
    /// - `ResourceAlreadyAllocated` if either channel is taken, or `a == b`
    pub fn initialize_encoder(
        &self,
        channel_a: usize,
        channel_b: usize,
    ) -> Result<EncoderHandle, HalError> {
        if channel_b >= NUM_DIO_CHANNELS {
            return Err(HalError::ChannelIndexOutOfRange {
                index: channel_b,
                capacity: NUM_DIO_CHANNELS,
            });
        }
        if channel_a == channel_b {
            return Err(HalError::ResourceAlreadyAllocated { index: channel_b });
        }

        let a = self.initialize_dio_port(channel_a, true)?;
        let b = match self.initialize_dio_port(channel_b, true) {
            Ok(b) => b,
            Err(e) => {
                self.free_dio_port(a);
                return Err(e);
            }
        };

        let state = EncoderState {
            channel_a: a,
            channel_b: b,
            count: AtomicI64::new(0),
        };
        match self.encoders.allocate_pair(channel_a, channel_b as u8, state) {
            Ok(handle) => {
                debug!(?handle, "encoder initialized");
                Ok(handle)
            }
            Err(e) => {
                self.free_dio_port(a);
                self.free_dio_port(b);
                Err(e)
            }
        }
    }

    /// Overwrite the accumulated count (simulation side).
    pub fn set_encoder_count(&self, handle: EncoderHandle, count: i64) -> Result<(), HalError> {
        self.encoders.get(handle)?.count.store(count, Ordering::Release);
        Ok(())
    }

    /// Accumulated count.
    pub fn get_encoder_count(&self, handle: EncoderHandle) -> Result<i64, HalError> {
        Ok(self.encoders.get(handle)?.count.load(Ordering::Acquire))
    }

    /// Free the encoder and both of its digital channels.
    pub fn free_encoder(&self, handle: EncoderHandle) {
        if let Some(state) = self.encoders.free(handle) {
            self.free_dio_port(state.channel_a);
            self.free_dio_port(state.channel_b);
        }
    }
}
