//! Top-level driver owning the five channel state machines.
//!
//! The driver pins the tick-level ordering contract: channels are refreshed
//! strictly in `Pulse1, Pulse2, Triangle, Noise, Dpcm` order and one
//! channel's writes are never interleaved with another's within a tick.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::{Channel, ChannelId, KeyEvent, RowContext, RowEvent, TickInput};
use crate::config::DriverConfig;
use crate::dpcm::DpcmChannel;
use crate::registers::RegisterSink;
use crate::sample::{SampleMem, SharedSampleMem};

/// The five 2A03 channels behind one per-tick driving surface.
pub struct Apu2a03Driver {
    channels: [Channel; 5],
    sample_mem: SharedSampleMem,
    config: DriverConfig,
}

impl Apu2a03Driver {
    /// Create a driver with a fresh shared sample memory.
    pub fn new(config: DriverConfig) -> Self {
        let sample_mem: SharedSampleMem = Arc::new(Mutex::new(SampleMem::new()));
        let channels = [
            Channel::pulse1(),
            Channel::pulse2(),
            Channel::triangle(),
            Channel::noise(),
            Channel::dpcm(DpcmChannel::new(sample_mem.clone(), config)),
        ];
        Self {
            channels,
            sample_mem,
            config,
        }
    }

    /// Handle of the shared sample memory for the chip backend.
    pub fn sample_mem(&self) -> SharedSampleMem {
        self.sample_mem.clone()
    }

    /// Current configuration.
    pub fn config(&self) -> DriverConfig {
        self.config
    }

    /// Replace the configuration on the driver and the DPCM channel.
    pub fn set_config(&mut self, config: DriverConfig) {
        self.config = config;
        if let Channel::Dpcm(dpcm) = self.channel_mut(ChannelId::Dpcm) {
            dpcm.set_config(config);
        }
    }

    /// Access one channel.
    pub fn channel(&self, id: ChannelId) -> &Channel {
        &self.channels[id.index()]
    }

    /// Mutable access to one channel.
    pub fn channel_mut(&mut self, id: ChannelId) -> &mut Channel {
        &mut self.channels[id.index()]
    }

    /// Dispatch one pattern row to every channel, in refresh order,
    /// collecting key telemetry.
    pub fn handle_rows(
        &mut self,
        rows: &[RowEvent<'_>; 5],
        ctx: &RowContext<'_>,
    ) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        for (channel, row) in self.channels.iter_mut().zip(rows) {
            if let Some(event) = channel.handle_row(row, ctx) {
                events.push(event);
            }
        }
        events
    }

    /// Refresh every channel for one tick, in the fixed channel order. The
    /// DPCM slot of `inputs` is ignored.
    pub fn refresh_all<W: RegisterSink>(&mut self, inputs: &[TickInput; 5], sink: &mut W) {
        for (channel, input) in self.channels.iter_mut().zip(inputs) {
            channel.refresh(input, sink);
        }
    }

    /// Reset every channel and write all silent defaults.
    pub fn reset<W: RegisterSink>(&mut self, sink: &mut W) {
        for channel in &mut self.channels {
            channel.reset(sink);
        }
    }
}
