//! Pulse channels 1 and 2.
//!
//! The two voices run identical logic and differ only in their register base
//! address. Each refresh packs duty/envelope/volume into the control
//! register, services the sweep unit (including the frame counter reset the
//! hardware needs to latch a sweep immediately) and writes the timer pair
//! with timer-high suppression: rewriting `$4003`/`$4007` restarts the duty
//! sequencer and clicks audibly, so it only happens when the upper period
//! bits actually changed or an envelope restart is due.

use crate::channel::{ChannelId, KeyEvent, NoteEvent, RowContext, RowEvent, TickInput};
use crate::registers::{
    frame_counter_reset, RegisterSink, PULSE1_CTRL, PULSE2_CTRL, SILENCE_CTRL, SWEEP_DISABLED,
};
use crate::state::{note_index, ChannelState, InstrumentKind, MAX_PERIOD};

/// Duty remap from the eight VRC6 duty steps onto the four 2A03 ones.
pub const DUTY_FROM_VRC6: [u8; 8] = [0, 0, 1, 1, 1, 1, 2, 2];

/// Which of the two pulse voices a channel instance drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseVoice {
    /// Pulse 1 at `$4000-$4003`.
    One,
    /// Pulse 2 at `$4004-$4007`.
    Two,
}

impl PulseVoice {
    /// Control register address; sweep/timer registers follow it.
    pub fn base(self) -> u16 {
        match self {
            PulseVoice::One => PULSE1_CTRL,
            PulseVoice::Two => PULSE2_CTRL,
        }
    }
}

/// One pulse channel state machine.
#[derive(Debug, Clone)]
pub struct PulseChannel {
    voice: PulseVoice,
    state: ChannelState,
    inst_kind: InstrumentKind,
}

impl PulseChannel {
    /// Create the channel for one of the two pulse voices.
    pub fn new(voice: PulseVoice) -> Self {
        Self {
            voice,
            state: ChannelState::new(),
            inst_kind: InstrumentKind::default(),
        }
    }

    /// Channel identity for telemetry.
    pub fn id(&self) -> ChannelId {
        match self.voice {
            PulseVoice::One => ChannelId::Pulse1,
            PulseVoice::Two => ChannelId::Pulse2,
        }
    }

    /// Channel state, read by the sequencing engine.
    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    /// Mutable channel state for the sequencing engine's generic effects.
    pub fn state_mut(&mut self) -> &mut ChannelState {
        &mut self.state
    }

    /// Remap a musical duty index according to the instrument source chip.
    pub fn convert_duty(&self, duty: u8) -> u8 {
        match self.inst_kind {
            InstrumentKind::Vrc6 => DUTY_FROM_VRC6[(duty & 0x07) as usize],
            InstrumentKind::N163 => duty,
            InstrumentKind::S5b => 0x02,
            InstrumentKind::Famicom => duty,
        }
    }

    /// Dispatch one pattern row: effects first, then the note column.
    pub fn handle_row(&mut self, row: &RowEvent<'_>, ctx: &RowContext<'_>) -> Option<KeyEvent> {
        self.inst_kind = ctx.instrument_kind;
        self.state.begin_row();

        for &effect in row.effects {
            self.state.apply_shared_effect(effect);
        }

        let event = match row.note {
            NoteEvent::None => {
                self.state.handle_empty_note();
                None
            }
            NoteEvent::Halt => {
                self.state.cut();
                Some(KeyEvent::off(self.id()))
            }
            NoteEvent::Release => {
                if self.state.release() {
                    Some(KeyEvent::off(self.id()))
                } else {
                    None
                }
            }
            NoteEvent::Note { octave, note } => Some(self.trigger_note(octave, note)),
        };

        if matches!(row.note, NoteEvent::Note { .. }) && self.state.note_needs_envelope_reset() {
            self.state.reset_envelope = true;
        }

        event
    }

    /// Emit this tick's register writes.
    pub fn refresh<W: RegisterSink>(&mut self, input: &TickInput, sink: &mut W) {
        let base = self.voice.base();
        let duty = self.state.duty_period & 0x03;
        let period = input.period.min(MAX_PERIOD);
        let timer_lo = (period & 0xFF) as u8;
        let timer_hi = (period >> 8) as u8;

        if !self.state.gate {
            sink.write(base, SILENCE_CTRL);
            self.state.last_period = None;
            return;
        }

        let envelope = &self.state.envelope;
        sink.write(
            base,
            (duty << 6)
                | (u8::from(envelope.loop_flag) << 5)
                | (u8::from(!envelope.hardware_envelope) << 4)
                | (input.volume & 0x0F),
        );

        match self.state.sweep.latched {
            Some(sweep) if sweep & 0x80 != 0 => {
                sink.write(base + 1, sweep);
                // A zero sweep byte has nothing left to ramp; normal
                // period writes resume on the next tick.
                let applied = sweep & 0x7F;
                self.state.sweep.latched = (applied != 0).then_some(applied);
                frame_counter_reset(sink);
                // A sweep engagement rewrites the full period so the sweep
                // unit never ramps from a stale target.
                sink.write(base + 2, timer_lo);
                sink.write(
                    base + 3,
                    timer_hi.wrapping_add(envelope.length_counter << 3),
                );
            }
            // Sweep still ramping: the period registers stay untouched.
            Some(_) => {}
            None => {
                sink.write(base + 1, SWEEP_DISABLED);
                sink.write(base + 2, timer_lo);

                let hi_changed = self
                    .state
                    .last_period
                    .map_or(true, |last| (last >> 8) as u8 != timer_hi);
                if hi_changed || self.state.reset_envelope {
                    sink.write(
                        base + 3,
                        timer_hi.wrapping_add(envelope.length_counter << 3),
                    );
                }
            }
        }

        self.state.last_period = Some(period);
        self.state.reset_envelope = false;
    }

    /// Write the silent power-on defaults to all four registers.
    pub fn clear_registers<W: RegisterSink>(&mut self, sink: &mut W) {
        let base = self.voice.base();
        sink.write(base, SILENCE_CTRL);
        sink.write(base + 1, SWEEP_DISABLED);
        sink.write(base + 2, 0x00);
        sink.write(base + 3, 0x00);
        self.state.last_period = None;
    }

    /// Reset the channel state and silence the voice.
    pub fn reset<W: RegisterSink>(&mut self, sink: &mut W) {
        self.state.reset();
        self.inst_kind = InstrumentKind::default();
        self.clear_registers(sink);
    }

    fn trigger_note(&mut self, octave: u8, note: u8) -> KeyEvent {
        let index = note_index(octave, note);
        self.state.trigger(index);

        let sweep = &mut self.state.sweep;
        if !sweep.engaged && (sweep.latched.is_some() || sweep.staged.is_some()) {
            // A note without a sweep effect disengages a leftover sweep.
            sweep.staged = None;
            sweep.latched = None;
            self.state.last_period = None;
        } else if sweep.engaged {
            sweep.latched = sweep.staged;
            self.state.last_period = None;
        }

        KeyEvent::on(self.id(), index)
    }
}
