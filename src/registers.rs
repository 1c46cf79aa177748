//! 2A03 register map, the register sink contract, and the multi-write
//! hardware quirk sequences.
//!
//! Every channel funnels its per-tick output through a [`RegisterSink`]: an
//! ordered stream of `(address, value)` pairs on the canonical NES memory
//! map. The two write recipes the chip needs beyond plain register pokes
//! (frame counter reset, DPCM restart pulse) live here as named sequences so
//! their ordering contract can be verified on its own.

use bitflags::bitflags;

/// Pulse 1 control: duty, envelope loop/constant bits, volume.
pub const PULSE1_CTRL: u16 = 0x4000;
/// Pulse 1 sweep unit.
pub const PULSE1_SWEEP: u16 = 0x4001;
/// Pulse 1 timer low byte.
pub const PULSE1_TIMER_LO: u16 = 0x4002;
/// Pulse 1 timer high bits plus length counter load.
pub const PULSE1_TIMER_HI: u16 = 0x4003;
/// Pulse 2 control.
pub const PULSE2_CTRL: u16 = 0x4004;
/// Pulse 2 sweep unit.
pub const PULSE2_SWEEP: u16 = 0x4005;
/// Pulse 2 timer low byte.
pub const PULSE2_TIMER_LO: u16 = 0x4006;
/// Pulse 2 timer high bits plus length counter load.
pub const PULSE2_TIMER_HI: u16 = 0x4007;
/// Triangle linear counter control.
pub const TRIANGLE_LINEAR: u16 = 0x4008;
/// Triangle timer low byte.
pub const TRIANGLE_TIMER_LO: u16 = 0x400A;
/// Triangle timer high bits plus length counter load.
pub const TRIANGLE_TIMER_HI: u16 = 0x400B;
/// Noise envelope/volume control.
pub const NOISE_CTRL: u16 = 0x400C;
/// Noise LFSR mode and period index.
pub const NOISE_MODE: u16 = 0x400E;
/// Noise length counter load.
pub const NOISE_LENGTH: u16 = 0x400F;
/// DPCM rate index and loop flag.
pub const DMC_FREQ: u16 = 0x4010;
/// DPCM direct DAC load.
pub const DMC_DAC: u16 = 0x4011;
/// DPCM sample start address (in `$C000 + addr * 64` units).
pub const DMC_ADDR: u16 = 0x4012;
/// DPCM sample length (in `len * 16 + 1` byte units).
pub const DMC_LEN: u16 = 0x4013;
/// Channel enable / status register shared by all channels.
pub const STATUS: u16 = 0x4015;
/// Frame sequencer control.
pub const FRAME_COUNTER: u16 = 0x4017;

/// Control value silencing a pulse or noise voice: constant volume zero with
/// the length counter halted.
pub const SILENCE_CTRL: u8 = 0x30;

/// Neutral sweep register value. The negate bit stays set so the idle sweep
/// adder does not mute low periods.
pub const SWEEP_DISABLED: u8 = 0x08;

bitflags! {
    /// `$4015` channel enable bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelMask: u8 {
        /// Pulse 1 enable.
        const PULSE1 = 0x01;
        /// Pulse 2 enable.
        const PULSE2 = 0x02;
        /// Triangle enable.
        const TRIANGLE = 0x04;
        /// Noise enable.
        const NOISE = 0x08;
        /// DPCM enable; setting it starts the staged sample.
        const DMC = 0x10;
        /// The four tone/noise channels without DPCM.
        const TONAL = 0x0F;
    }
}

/// Order-sensitive consumer of register writes.
///
/// Implemented by the emulated chip backend, by export drivers, and by
/// [`WriteLog`] for tests. Writes for one channel must be applied in the
/// order they arrive; the driver never interleaves two channels' writes
/// within a tick.
pub trait RegisterSink {
    /// Apply one register write.
    fn write(&mut self, address: u16, value: u8);
}

/// Vec-backed [`RegisterSink`] that records every write.
#[derive(Debug, Default, Clone)]
pub struct WriteLog {
    writes: Vec<(u16, u8)>,
}

impl WriteLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes recorded so far, in emission order.
    pub fn writes(&self) -> &[(u16, u8)] {
        &self.writes
    }

    /// Drain the recorded writes.
    pub fn take(&mut self) -> Vec<(u16, u8)> {
        std::mem::take(&mut self.writes)
    }

    /// Discard the recorded writes.
    pub fn clear(&mut self) {
        self.writes.clear();
    }
}

impl RegisterSink for WriteLog {
    fn write(&mut self, address: u16, value: u8) {
        self.writes.push((address, value));
    }
}

/// Force the frame sequencer through one clock.
///
/// The sweep unit only latches a freshly written sweep byte on the frame
/// sequencer's next natural clock; this two-byte sequence makes it take
/// effect immediately. Must accompany every sweep register write.
pub fn frame_counter_reset<W: RegisterSink>(sink: &mut W) {
    sink.write(FRAME_COUNTER, 0x80);
    sink.write(FRAME_COUNTER, 0x00);
}

/// Disable-then-enable pulse on `$4015` that starts the staged DPCM sample.
///
/// The disable write resets the sample reader; re-enabling DMC then fetches
/// the staged start address and length from `$4012`/`$4013`.
pub fn dpcm_restart<W: RegisterSink>(sink: &mut W) {
    sink.write(STATUS, ChannelMask::TONAL.bits());
    sink.write(STATUS, (ChannelMask::TONAL | ChannelMask::DMC).bits());
}
