//! Shared 2A03 channel state.
//!
//! The four tone/noise voices share their envelope bookkeeping and most of
//! their note/effect dispatch; each channel owns one [`ChannelState`]
//! exclusively and the channel-specific refresh logic reads the shared
//! envelope and sweep fields from it. No state is aliased between channel
//! instances.

use crate::effects::Effect;

/// Upper bound for tonal channel timer periods (11 bits).
pub const MAX_PERIOD: u16 = 0x7FF;

/// Upper bound for channel volume.
pub const MAX_VOLUME: u8 = 0x0F;

/// Notes per octave in the pattern note scale.
pub const NOTE_RANGE: u8 = 12;

/// Flat note index for an octave/note pair (`note` is 1-based, as in
/// pattern rows).
pub fn note_index(octave: u8, note: u8) -> u16 {
    u16::from(octave) * u16::from(NOTE_RANGE) + u16::from(note) - 1
}

/// Originating instrument type of the value currently driving a channel.
///
/// Cross-chip instruments carry duty indices in their own scale; the pulse
/// channels remap them onto the 2A03 duty table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstrumentKind {
    /// Native 2A03 instrument; duty indices pass through.
    #[default]
    Famicom,
    /// VRC6 instrument; eight duty steps fold onto the four 2A03 ones.
    Vrc6,
    /// N163 instrument; duty indices pass through.
    N163,
    /// S5B instrument; square-only source, pinned to 50% duty.
    S5b,
}

/// Envelope and length counter configuration shared by the pulse, triangle
/// and noise voices.
///
/// `length_counter` doubles as the fixed volume value while the hardware
/// envelope is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// Hardware halt/loop bit.
    pub loop_flag: bool,
    /// Volume comes from the chip decay unit instead of the length field.
    pub hardware_envelope: bool,
    /// Length counter load (0..31).
    pub length_counter: u8,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            loop_flag: true,
            hardware_envelope: false,
            length_counter: 1,
        }
    }
}

/// Pulse sweep unit state.
///
/// `staged` holds the byte built from this row's sweep effect and `latched`
/// the byte the next refresh applies. Bit 7 of the latched byte marks it as
/// not yet written; the refresh clears it once the sweep register write and
/// its frame counter reset have been emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepUnit {
    /// Sweep byte staged by this row's effect columns.
    pub staged: Option<u8>,
    /// Sweep byte the refresh applies; bit 7 set means pending.
    pub latched: Option<u8>,
    /// A sweep effect appeared in the current row.
    pub engaged: bool,
}

/// Runtime state owned by one channel for its whole lifetime.
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    /// Channel audibly active (distinct from volume zero).
    pub gate: bool,
    /// Last triggered note index; the noise channel keeps its tag bit here.
    pub note: u16,
    /// Base period of the triggered note, before per-tick modulation.
    pub period: u16,
    /// Portamento glide target, valid while a portamento is active.
    pub porta_target: u16,
    /// Portamento speed from the last `3xx` effect; zero disables.
    pub porta_speed: u8,
    /// Current duty period (noise: LFSR mode selector).
    pub duty_period: u8,
    /// Duty period restored on every note trigger.
    pub default_duty: u8,
    /// Instrument volume, reset to maximum on note trigger.
    pub inst_volume: u8,
    /// Period last written out; `None` forces the next timer-high write.
    pub last_period: Option<u16>,
    /// A length counter / envelope restart write is due even if the period
    /// did not change.
    pub reset_envelope: bool,
    /// Note released but not yet cut.
    pub released: bool,
    /// Arpeggio phase owned by the sequencing engine; cleared on trigger.
    pub arp_phase: u8,
    /// Shared envelope configuration.
    pub envelope: EnvelopeConfig,
    /// Sweep unit bookkeeping (pulse channels only).
    pub sweep: SweepUnit,
}

impl ChannelState {
    /// Fresh channel state with the power-on envelope defaults.
    pub fn new() -> Self {
        Self {
            inst_volume: MAX_VOLUME,
            ..Self::default()
        }
    }

    /// Row-start bookkeeping shared by the tone/noise channels: the previous
    /// row's staged sweep is dropped before this row's effects run.
    pub fn begin_row(&mut self) {
        self.sweep.staged = None;
        self.sweep.engaged = false;
    }

    /// Shared custom effect dispatch. Returns `true` when the effect belongs
    /// to one of the shared families and was consumed.
    pub fn apply_shared_effect(&mut self, effect: Effect) -> bool {
        match effect {
            Effect::Volume(param) => {
                if param < 0x20 {
                    self.envelope.length_counter = param;
                    self.envelope.loop_flag = false;
                    self.reset_envelope = true;
                } else if (0xE0..0xE4).contains(&param) {
                    if !self.envelope.loop_flag || !self.envelope.hardware_envelope {
                        self.reset_envelope = true;
                    }
                    self.envelope.hardware_envelope = param & 0x01 != 0;
                    self.envelope.loop_flag = param & 0x02 == 0;
                }
                true
            }
            Effect::SweepUp(param) => {
                self.stage_sweep(0x88, param);
                true
            }
            Effect::SweepDown(param) => {
                self.stage_sweep(0x80, param);
                true
            }
            Effect::DutyCycle(param) => {
                self.duty_period = param;
                self.default_duty = param;
                true
            }
            Effect::Portamento(param) => {
                self.porta_speed = param;
                true
            }
            _ => false,
        }
    }

    /// No pitched note this row: a sweep engaged by this row's effects
    /// latches for the next refresh.
    pub fn handle_empty_note(&mut self) {
        if self.sweep.engaged {
            self.sweep.latched = self.sweep.staged;
        }
    }

    /// Whether a pitched note must restart the envelope. The envelope only
    /// keeps running across notes while it free-runs at a fixed volume.
    pub fn note_needs_envelope_reset(&self) -> bool {
        !self.envelope.loop_flag || self.envelope.hardware_envelope
    }

    /// Common note trigger bookkeeping.
    pub fn trigger(&mut self, note: u16) {
        self.note = note;
        self.gate = true;
        self.released = false;
        self.duty_period = self.default_duty;
        self.inst_volume = MAX_VOLUME;
        self.arp_phase = 0;
    }

    /// Note cut: drop the gate, leave the rest for the next trigger.
    pub fn cut(&mut self) {
        self.gate = false;
    }

    /// Note release. Returns `true` the first time it fires for a note.
    pub fn release(&mut self) -> bool {
        if self.released {
            false
        } else {
            self.released = true;
            true
        }
    }

    /// Restore power-on defaults.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn stage_sweep(&mut self, direction_tag: u8, param: u8) {
        // 0x77 clamps shift and period fields to the legal hardware bits.
        self.sweep.staged = Some(direction_tag | (param & 0x77));
        self.sweep.engaged = true;
        self.last_period = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_effect_low_range_sets_fixed_volume_mode() {
        let mut state = ChannelState::new();
        assert!(state.apply_shared_effect(Effect::Volume(0x15)));
        assert_eq!(state.envelope.length_counter, 0x15);
        assert!(!state.envelope.loop_flag);
        assert!(state.reset_envelope);
    }

    #[test]
    fn volume_effect_e_range_decodes_mode_bits() {
        let mut state = ChannelState::new();
        state.apply_shared_effect(Effect::Volume(0xE1));
        assert!(state.envelope.hardware_envelope);
        assert!(state.envelope.loop_flag);
        assert!(state.reset_envelope);

        state.reset_envelope = false;
        // Already looping with the hardware envelope on: no forced restart.
        state.apply_shared_effect(Effect::Volume(0xE1));
        assert!(!state.reset_envelope);

        state.apply_shared_effect(Effect::Volume(0xE2));
        assert!(!state.envelope.loop_flag);
        assert!(!state.envelope.hardware_envelope);
    }

    #[test]
    fn volume_effect_out_of_range_is_ignored() {
        let mut state = ChannelState::new();
        state.apply_shared_effect(Effect::Volume(0x80));
        assert_eq!(state.envelope, EnvelopeConfig::default());
        assert!(!state.reset_envelope);
    }

    #[test]
    fn sweep_effect_masks_to_legal_bits_and_forces_rewrite() {
        let mut state = ChannelState::new();
        state.last_period = Some(0x123);
        state.apply_shared_effect(Effect::SweepUp(0xFF));
        assert_eq!(state.sweep.staged, Some(0x88 | 0x77));
        assert!(state.sweep.engaged);
        assert_eq!(state.last_period, None);

        state.apply_shared_effect(Effect::SweepDown(0x12));
        assert_eq!(state.sweep.staged, Some(0x80 | 0x12));
    }

    #[test]
    fn empty_note_latches_an_engaged_sweep() {
        let mut state = ChannelState::new();
        state.apply_shared_effect(Effect::SweepDown(0x31));
        state.handle_empty_note();
        assert_eq!(state.sweep.latched, Some(0xB1));

        let mut idle = ChannelState::new();
        idle.handle_empty_note();
        assert_eq!(idle.sweep.latched, None);
    }

    #[test]
    fn envelope_reset_rule_matches_mode_table() {
        let mut state = ChannelState::new();
        // Power-on: free-running loop at fixed volume, no restart needed.
        assert!(!state.note_needs_envelope_reset());

        state.envelope.loop_flag = false;
        assert!(state.note_needs_envelope_reset());

        state.envelope.loop_flag = true;
        state.envelope.hardware_envelope = true;
        assert!(state.note_needs_envelope_reset());
    }

    #[test]
    fn note_index_is_flat_and_one_based() {
        assert_eq!(note_index(0, 1), 0);
        assert_eq!(note_index(3, 1), 36);
        assert_eq!(note_index(2, 12), 35);
    }
}
