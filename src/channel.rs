//! Channel identities, per-row/per-tick input contracts and the closed
//! channel set.
//!
//! The five channel kinds share one dispatch surface: [`Channel`] is a
//! closed tagged variant, each arm carrying its own state machine, driven
//! through single `handle_row`/`refresh` entry points. The sequencing
//! engine feeds a [`RowEvent`] at the start of each pattern row and a
//! [`TickInput`] every tick; the channel answers with register writes and
//! optional [`KeyEvent`] telemetry.

use crate::dpcm::DpcmChannel;
use crate::effects::Effect;
use crate::noise::NoiseChannel;
use crate::pulse::{PulseChannel, PulseVoice};
use crate::registers::RegisterSink;
use crate::sample::{DpcmInstrument, SampleBank};
use crate::state::InstrumentKind;
use crate::triangle::TriangleChannel;

/// Identity of one of the five 2A03 channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    /// Pulse 1 (`$4000-$4003`).
    Pulse1,
    /// Pulse 2 (`$4004-$4007`).
    Pulse2,
    /// Triangle (`$4008-$400B`).
    Triangle,
    /// Noise (`$400C-$400F`).
    Noise,
    /// DPCM (`$4010-$4013`).
    Dpcm,
}

impl ChannelId {
    /// All channels in refresh order.
    pub const ALL: [ChannelId; 5] = [
        ChannelId::Pulse1,
        ChannelId::Pulse2,
        ChannelId::Triangle,
        ChannelId::Noise,
        ChannelId::Dpcm,
    ];

    /// Position in [`ChannelId::ALL`].
    pub fn index(self) -> usize {
        match self {
            ChannelId::Pulse1 => 0,
            ChannelId::Pulse2 => 1,
            ChannelId::Triangle => 2,
            ChannelId::Noise => 3,
            ChannelId::Dpcm => 4,
        }
    }
}

/// Note column content for one pattern row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteEvent {
    /// Empty note column.
    #[default]
    None,
    /// Note halt (cut).
    Halt,
    /// Note release.
    Release,
    /// Pitched note; `note` is 1-based within the octave.
    Note {
        /// Octave, 0-based.
        octave: u8,
        /// Note within the octave, 1..=12.
        note: u8,
    },
}

/// One pattern row for one channel, as delivered by the sequencing engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowEvent<'a> {
    /// Note column.
    pub note: NoteEvent,
    /// Effect columns, in pattern order.
    pub effects: &'a [Effect],
}

/// Document-layer context a row dispatch may need.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowContext<'a> {
    /// Source chip of the active instrument, for duty remapping.
    pub instrument_kind: InstrumentKind,
    /// Sample assignments of the active instrument (DPCM only).
    pub dpcm_instrument: Option<&'a DpcmInstrument>,
    /// Sample bank backing the assignments (DPCM only).
    pub samples: Option<&'a SampleBank>,
}

/// Engine-computed scalars for one tick, with pitch and volume modulation
/// (vibrato, slides, tremolo) already applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Target timer period.
    pub period: u16,
    /// Target volume, 0..15.
    pub volume: u8,
}

/// Key state telemetry event emitted on note triggers and cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Emitting channel.
    pub channel: ChannelId,
    /// Triggered note index (`None` for key-off). The noise channel reports
    /// its tagged pitch here.
    pub note: Option<u16>,
}

impl KeyEvent {
    /// Key-on event.
    pub fn on(channel: ChannelId, note: u16) -> Self {
        Self {
            channel,
            note: Some(note),
        }
    }

    /// Key-off event.
    pub fn off(channel: ChannelId) -> Self {
        Self {
            channel,
            note: None,
        }
    }
}

/// Closed set of 2A03 channel state machines.
pub enum Channel {
    /// Pulse 1.
    Pulse1(PulseChannel),
    /// Pulse 2.
    Pulse2(PulseChannel),
    /// Triangle.
    Triangle(TriangleChannel),
    /// Noise.
    Noise(NoiseChannel),
    /// DPCM.
    Dpcm(DpcmChannel),
}

impl Channel {
    /// Pulse 1 channel.
    pub fn pulse1() -> Self {
        Channel::Pulse1(PulseChannel::new(PulseVoice::One))
    }

    /// Pulse 2 channel.
    pub fn pulse2() -> Self {
        Channel::Pulse2(PulseChannel::new(PulseVoice::Two))
    }

    /// Triangle channel.
    pub fn triangle() -> Self {
        Channel::Triangle(TriangleChannel::new())
    }

    /// Noise channel.
    pub fn noise() -> Self {
        Channel::Noise(NoiseChannel::new())
    }

    /// DPCM channel around an existing sample memory.
    pub fn dpcm(channel: DpcmChannel) -> Self {
        Channel::Dpcm(channel)
    }

    /// Channel identity.
    pub fn id(&self) -> ChannelId {
        match self {
            Channel::Pulse1(_) => ChannelId::Pulse1,
            Channel::Pulse2(_) => ChannelId::Pulse2,
            Channel::Triangle(_) => ChannelId::Triangle,
            Channel::Noise(_) => ChannelId::Noise,
            Channel::Dpcm(_) => ChannelId::Dpcm,
        }
    }

    /// Dispatch one pattern row.
    pub fn handle_row(&mut self, row: &RowEvent<'_>, ctx: &RowContext<'_>) -> Option<KeyEvent> {
        match self {
            Channel::Pulse1(ch) | Channel::Pulse2(ch) => ch.handle_row(row, ctx),
            Channel::Triangle(ch) => ch.handle_row(row, ctx),
            Channel::Noise(ch) => ch.handle_row(row, ctx),
            Channel::Dpcm(ch) => ch.handle_row(row, ctx),
        }
    }

    /// Emit this tick's register writes. The DPCM channel ignores the tick
    /// scalars; its pitch comes from the staged sample.
    pub fn refresh<W: RegisterSink>(&mut self, input: &TickInput, sink: &mut W) {
        match self {
            Channel::Pulse1(ch) | Channel::Pulse2(ch) => ch.refresh(input, sink),
            Channel::Triangle(ch) => ch.refresh(input, sink),
            Channel::Noise(ch) => ch.refresh(input, sink),
            Channel::Dpcm(ch) => ch.refresh(sink),
        }
    }

    /// Write the channel's silent power-on defaults.
    pub fn clear_registers<W: RegisterSink>(&mut self, sink: &mut W) {
        match self {
            Channel::Pulse1(ch) | Channel::Pulse2(ch) => ch.clear_registers(sink),
            Channel::Triangle(ch) => ch.clear_registers(sink),
            Channel::Noise(ch) => ch.clear_registers(sink),
            Channel::Dpcm(ch) => ch.clear_registers(sink),
        }
    }

    /// Reset channel state and silence the voice.
    pub fn reset<W: RegisterSink>(&mut self, sink: &mut W) {
        match self {
            Channel::Pulse1(ch) | Channel::Pulse2(ch) => ch.reset(sink),
            Channel::Triangle(ch) => ch.reset(sink),
            Channel::Noise(ch) => ch.reset(sink),
            Channel::Dpcm(ch) => ch.reset(sink),
        }
    }
}
