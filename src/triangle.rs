//! Triangle channel.
//!
//! No sweep or duty; the voice gates on its linear counter instead. The
//! length counter load in `$400B` must not be rewritten every tick or it
//! keeps reloading the linear counter and mutes the channel, so the write is
//! suppressed unless the channel loops freely or an envelope restart is due.

use crate::channel::{ChannelId, KeyEvent, NoteEvent, RowContext, RowEvent, TickInput};
use crate::effects::Effect;
use crate::registers::{
    RegisterSink, TRIANGLE_LINEAR, TRIANGLE_TIMER_HI, TRIANGLE_TIMER_LO,
};
use crate::state::{note_index, ChannelState, MAX_PERIOD};

/// Maximum 7-bit linear counter reload value.
const LINEAR_COUNTER_MAX: u8 = 0x7F;

/// The triangle channel state machine.
#[derive(Debug, Clone)]
pub struct TriangleChannel {
    state: ChannelState,
    /// Linear counter reload; `None` until a row configures it, which reads
    /// as "loop at the maximum reload".
    linear_counter: Option<u8>,
}

impl TriangleChannel {
    /// Create the triangle channel.
    pub fn new() -> Self {
        Self {
            state: ChannelState::new(),
            linear_counter: None,
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

    /// Currently configured linear counter reload, if any.
    pub fn linear_counter(&self) -> Option<u8> {
        self.linear_counter
    }

    /// Dispatch one pattern row: effects first, then the note column.
    pub fn handle_row(&mut self, row: &RowEvent<'_>, _ctx: &RowContext<'_>) -> Option<KeyEvent> {
        self.state.begin_row();

        for &effect in row.effects {
            self.state.apply_shared_effect(effect);
            self.handle_effect(effect);
        }

        let event = match row.note {
            NoteEvent::None => {
                self.state.handle_empty_note();
                None
            }
            NoteEvent::Halt => {
                self.state.cut();
                Some(KeyEvent::off(ChannelId::Triangle))
            }
            NoteEvent::Release => {
                if self.state.release() {
                    Some(KeyEvent::off(ChannelId::Triangle))
                } else {
                    None
                }
            }
            NoteEvent::Note { octave, note } => {
                let index = note_index(octave, note);
                self.state.trigger(index);
                Some(KeyEvent::on(ChannelId::Triangle, index))
            }
        };

        if matches!(row.note, NoteEvent::Note { .. }) && self.state.note_needs_envelope_reset() {
            self.state.reset_envelope = true;
        }

        event
    }

    /// Emit this tick's register writes.
    pub fn refresh<W: RegisterSink>(&mut self, input: &TickInput, sink: &mut W) {
        let period = input.period.min(MAX_PERIOD);
        let timer_lo = (period & 0xFF) as u8;
        let timer_hi = (period >> 8) as u8;

        if self.state.inst_volume > 0 && input.volume > 0 && self.state.gate {
            let reload = self.linear_counter.unwrap_or(LINEAR_COUNTER_MAX);
            sink.write(
                TRIANGLE_LINEAR,
                (u8::from(self.state.envelope.loop_flag) << 7) | reload,
            );
            sink.write(TRIANGLE_TIMER_LO, timer_lo);
            if self.state.envelope.loop_flag || self.state.reset_envelope {
                sink.write(
                    TRIANGLE_TIMER_HI,
                    timer_hi.wrapping_add(self.state.envelope.length_counter << 3),
                );
            }
        } else {
            sink.write(TRIANGLE_LINEAR, 0);
        }

        self.state.reset_envelope = false;
    }

    /// Write the silent power-on defaults.
    pub fn clear_registers<W: RegisterSink>(&mut self, sink: &mut W) {
        sink.write(TRIANGLE_LINEAR, 0);
        sink.write(TRIANGLE_TIMER_LO, 0);
        sink.write(TRIANGLE_TIMER_HI, 0);
    }

    /// Reset the channel state and silence the voice.
    pub fn reset<W: RegisterSink>(&mut self, sink: &mut W) {
        self.state.reset();
        self.linear_counter = None;
        self.clear_registers(sink);
    }

    fn handle_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Volume(_) => {
                // Fixed-volume mode needs a concrete reload value.
                if self.linear_counter.is_none() {
                    self.linear_counter = Some(LINEAR_COUNTER_MAX);
                }
            }
            Effect::NoteCut(param) => {
                if param >= 0x80 {
                    self.linear_counter = Some(param - 0x80);
                    self.state.envelope.loop_flag = false;
                    self.state.reset_envelope = true;
                } else {
                    self.state.envelope.loop_flag = true;
                }
            }
            _ => {}
        }
    }
}

impl Default for TriangleChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_effect_defaults_the_linear_counter_once() {
        let mut channel = TriangleChannel::new();
        channel.handle_effect(Effect::Volume(0x05));
        assert_eq!(channel.linear_counter, Some(0x7F));

        channel.linear_counter = Some(0x10);
        channel.handle_effect(Effect::Volume(0x05));
        assert_eq!(channel.linear_counter, Some(0x10));
    }

    #[test]
    fn high_note_cut_reloads_the_linear_counter() {
        let mut channel = TriangleChannel::new();
        channel.handle_effect(Effect::NoteCut(0x85));
        assert_eq!(channel.linear_counter, Some(0x05));
        assert!(!channel.state.envelope.loop_flag);
        assert!(channel.state.reset_envelope);
    }

    #[test]
    fn release_reports_key_off_once() {
        let mut channel = TriangleChannel::new();
        let ctx = RowContext::default();
        let trigger = RowEvent {
            note: NoteEvent::Note { octave: 2, note: 5 },
            effects: &[],
        };
        channel.handle_row(&trigger, &ctx);

        let release = RowEvent {
            note: NoteEvent::Release,
            effects: &[],
        };
        assert_eq!(
            channel.handle_row(&release, &ctx),
            Some(KeyEvent::off(ChannelId::Triangle))
        );
        assert_eq!(channel.handle_row(&release, &ctx), None);
    }

    #[test]
    fn low_note_cut_restores_looping() {
        let mut channel = TriangleChannel::new();
        channel.state.envelope.loop_flag = false;
        channel.handle_effect(Effect::NoteCut(0x05));
        assert!(channel.state.envelope.loop_flag);
    }
}
