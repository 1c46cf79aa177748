//! Noise channel.
//!
//! Notes fold into a 4-bit noise period index carrying a high tag bit that
//! keeps noise pitches apart from tonal periods in the shared period
//! limiting. The hardware indexes noise periods in descending order, so the
//! refresh complements the low four period bits before writing them.

use crate::channel::{ChannelId, KeyEvent, NoteEvent, RowContext, RowEvent, TickInput};
use crate::registers::{RegisterSink, NOISE_CTRL, NOISE_LENGTH, NOISE_MODE, SILENCE_CTRL};
use crate::state::{note_index, ChannelState};

/// Tag bit distinguishing a noise pitch from a tonal period.
pub const NOISE_PITCH_TAG: u16 = 0x100;

/// The noise channel state machine.
#[derive(Debug, Clone, Default)]
pub struct NoiseChannel {
    state: ChannelState,
}

impl NoiseChannel {
    /// Create the noise channel.
    pub fn new() -> Self {
        Self {
            state: ChannelState::new(),
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

    /// Dispatch one pattern row: effects first, then the note column.
    pub fn handle_row(&mut self, row: &RowEvent<'_>, _ctx: &RowContext<'_>) -> Option<KeyEvent> {
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
                Some(KeyEvent::off(ChannelId::Noise))
            }
            NoteEvent::Release => {
                if self.state.release() {
                    Some(KeyEvent::off(ChannelId::Noise))
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
        // Hardware orders noise periods from fast to slow.
        let period = ((input.period & 0x0F) ^ 0x0F) as u8;
        let mode = (self.state.duty_period & 0x01) << 7;

        if !self.state.gate {
            sink.write(NOISE_CTRL, SILENCE_CTRL);
            return;
        }

        let envelope = &self.state.envelope;
        sink.write(
            NOISE_CTRL,
            (u8::from(envelope.loop_flag) << 5)
                | (u8::from(!envelope.hardware_envelope) << 4)
                | (input.volume & 0x0F),
        );
        sink.write(NOISE_MODE, mode | period);
        if envelope.loop_flag || self.state.reset_envelope {
            sink.write(NOISE_LENGTH, envelope.length_counter << 3);
        }

        self.state.reset_envelope = false;
    }

    /// Write the silent power-on defaults.
    pub fn clear_registers<W: RegisterSink>(&mut self, sink: &mut W) {
        sink.write(NOISE_CTRL, SILENCE_CTRL);
        sink.write(NOISE_MODE, 0);
        sink.write(NOISE_LENGTH, 0);
    }

    /// Reset the channel state and silence the voice.
    pub fn reset<W: RegisterSink>(&mut self, sink: &mut W) {
        self.state.reset();
        self.clear_registers(sink);
    }

    fn trigger_note(&mut self, octave: u8, note: u8) -> KeyEvent {
        let tagged = (note_index(octave, note) & 0x0F) | NOISE_PITCH_TAG;

        if self.state.porta_speed > 0 {
            // Portamento glides toward the new pitch instead of jumping.
            if self.state.period == 0 {
                self.state.period = tagged;
            }
            self.state.porta_target = tagged;
        } else {
            self.state.period = tagged;
        }

        // The arpeggio phase keeps running across noise retriggers.
        let arp_phase = self.state.arp_phase;
        self.state.trigger(tagged);
        self.state.arp_phase = arp_phase;

        KeyEvent::on(ChannelId::Noise, tagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Effect;

    #[test]
    fn notes_fold_into_tagged_noise_pitches() {
        let mut channel = NoiseChannel::new();
        let event = channel.trigger_note(2, 4);
        // Flat index 27 folds to 0x0B plus the tag bit.
        assert_eq!(event.note, Some(0x10B));
        assert_eq!(channel.state.period, 0x10B);
        assert!(channel.state.gate);
    }

    #[test]
    fn release_reports_key_off_once() {
        let mut channel = NoiseChannel::new();
        let ctx = RowContext::default();
        let trigger = RowEvent {
            note: NoteEvent::Note { octave: 2, note: 4 },
            effects: &[],
        };
        channel.handle_row(&trigger, &ctx);

        let release = RowEvent {
            note: NoteEvent::Release,
            effects: &[],
        };
        assert_eq!(
            channel.handle_row(&release, &ctx),
            Some(KeyEvent::off(ChannelId::Noise))
        );
        assert_eq!(channel.handle_row(&release, &ctx), None);
    }

    #[test]
    fn retrigger_keeps_the_arpeggio_phase() {
        let mut channel = NoiseChannel::new();
        channel.state.arp_phase = 2;
        channel.trigger_note(3, 1);
        assert_eq!(channel.state.arp_phase, 2);
    }

    #[test]
    fn portamento_targets_instead_of_jumping() {
        let mut channel = NoiseChannel::new();
        channel.trigger_note(2, 4);
        channel.state.apply_shared_effect(Effect::Portamento(0x20));
        channel.trigger_note(3, 1);
        assert_eq!(channel.state.period, 0x10B);
        assert_eq!(channel.state.porta_target, 0x104);
    }
}
