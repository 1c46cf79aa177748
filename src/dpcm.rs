//! DPCM channel.
//!
//! Stages delta-modulation samples into the shared sample memory and drives
//! playback through `$4010-$4013`/`$4015`. The per-tick state machine runs
//! in a fixed order: a queued DAC poke always lands first so a concurrent
//! sample trigger cannot drop it, the retrigger counter runs next, then
//! release, cut and trigger write-out. Reordering any of these changes what
//! the hardware plays.

use crate::channel::{ChannelId, KeyEvent, NoteEvent, RowContext, RowEvent};
use crate::config::DriverConfig;
use crate::effects::Effect;
use crate::registers::{
    dpcm_restart, ChannelMask, RegisterSink, DMC_ADDR, DMC_DAC, DMC_FREQ, DMC_LEN, STATUS,
};
use crate::sample::SharedSampleMem;
use crate::state::note_index;

/// The DPCM channel state machine.
pub struct DpcmChannel {
    sample_mem: SharedSampleMem,
    config: DriverConfig,

    /// Channel writes registers until disabled by cut or release.
    enabled: bool,
    /// A staged sample waits for its trigger write-out.
    trigger: bool,
    /// Gate; dropped by note cut.
    gate: bool,
    /// Release requested, consumed by the next refresh.
    release: bool,

    /// Pending direct DAC write.
    dac: Option<u8>,
    /// Rate index for `$4010`.
    period: u8,
    /// Loop flag bit for `$4010` (`0x40` or zero).
    loop_flag: u8,
    /// Sample start offset from the `Yxx` effect, written to `$4012`.
    offset: u8,
    /// Sample length in `$4013` units.
    sample_length: u8,
    /// Loop region start for the second address write.
    loop_offset: u8,
    /// Loop region length in `$4013` units.
    loop_length: u8,
    /// Pitch override from the `Wxx` effect.
    custom_pitch: Option<u8>,

    /// Automatic retrigger period in ticks; zero disables.
    retrigger_period: u32,
    /// Ticks left until the next automatic retrigger.
    retrigger_counter: u32,

    /// Ticks left until a delayed note cut; zero is inactive.
    note_cut: u32,
    /// Ticks left until a delayed note release; zero is inactive.
    note_release: u32,
}

impl DpcmChannel {
    /// Create the DPCM channel around the shared sample memory.
    pub fn new(sample_mem: SharedSampleMem, config: DriverConfig) -> Self {
        Self {
            sample_mem,
            config,
            enabled: false,
            trigger: false,
            gate: false,
            release: false,
            dac: None,
            period: 0,
            loop_flag: 0,
            offset: 0,
            sample_length: 0,
            loop_offset: 0,
            loop_length: 0,
            custom_pitch: None,
            retrigger_period: 0,
            retrigger_counter: 0,
            note_cut: 0,
            note_release: 0,
        }
    }

    /// Whether the channel still emits writes.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Handle of the shared sample memory for the chip backend.
    pub fn sample_mem(&self) -> SharedSampleMem {
        self.sample_mem.clone()
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: DriverConfig) {
        self.config = config;
    }

    /// Dispatch one pattern row: effects first, then the note column.
    pub fn handle_row(&mut self, row: &RowEvent<'_>, ctx: &RowContext<'_>) -> Option<KeyEvent> {
        self.custom_pitch = None;
        self.retrigger_period = 0;

        // Any note column entry, halt and release included, supersedes a
        // pending delayed cut or release.
        if !matches!(row.note, NoteEvent::None) {
            self.note_cut = 0;
            self.note_release = 0;
        }

        for &effect in row.effects {
            self.handle_effect(effect);
        }

        match row.note {
            NoteEvent::None => None,
            NoteEvent::Halt => {
                self.gate = false;
                Some(KeyEvent::off(ChannelId::Dpcm))
            }
            NoteEvent::Release => {
                self.release = true;
                None
            }
            NoteEvent::Note { octave, note } => self.trigger_note(octave, note, ctx),
        }
    }

    /// Emit this tick's register writes.
    pub fn refresh<W: RegisterSink>(&mut self, sink: &mut W) {
        self.run_delayed_countdowns();

        if let Some(dac) = self.dac.take() {
            sink.write(DMC_DAC, dac);
        }

        if self.retrigger_period != 0 && self.retrigger_counter > 0 {
            self.retrigger_counter -= 1;
            if self.retrigger_counter == 0 {
                self.retrigger_counter = self.retrigger_period;
                self.enabled = true;
                self.trigger = true;
            }
        }

        if self.release {
            sink.write(STATUS, ChannelMask::TONAL.bits());
            self.enabled = false;
            self.release = false;
        }

        if !self.enabled {
            return;
        }

        if !self.gate {
            sink.write(STATUS, ChannelMask::TONAL.bits());
            if self.config.reset_dac_on_halt {
                // Restores the full triangle/noise output range.
                sink.write(DMC_DAC, 0);
            }
            self.enabled = false;
        } else if self.trigger {
            sink.write(DMC_FREQ, (self.period & 0x0F) | self.loop_flag);
            sink.write(DMC_ADDR, self.offset);
            sink.write(DMC_LEN, self.sample_length);
            dpcm_restart(sink);

            if self.loop_offset > 0 {
                sink.write(DMC_ADDR, self.loop_offset);
                sink.write(DMC_LEN, self.loop_length);
            }

            self.trigger = false;
        }
    }

    /// Silence the channel and zero the sample-position registers.
    pub fn clear_registers<W: RegisterSink>(&mut self, sink: &mut W) {
        sink.write(STATUS, ChannelMask::TONAL.bits());
        sink.write(DMC_FREQ, 0);
        sink.write(DMC_DAC, 0);
        sink.write(DMC_ADDR, 0);
        sink.write(DMC_LEN, 0);
        self.offset = 0;
        self.dac = None;
    }

    /// Reset playback state and silence the channel.
    pub fn reset<W: RegisterSink>(&mut self, sink: &mut W) {
        let config = self.config;
        *self = Self::new(self.sample_mem.clone(), config);
        self.clear_registers(sink);
    }

    fn handle_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Dac(param) => self.dac = Some(param & 0x7F),
            Effect::SampleOffset(param) => self.offset = param,
            Effect::DpcmPitch(param) => self.custom_pitch = Some(param),
            Effect::Retrigger(param) => {
                self.retrigger_period = u32::from(param) + 1;
                if self.retrigger_counter == 0 {
                    self.retrigger_counter = self.retrigger_period;
                }
            }
            Effect::NoteCut(param) => {
                if param < 0x80 {
                    self.note_cut = u32::from(param) + 1;
                }
            }
            Effect::NoteRelease(param) => {
                if param < 0x80 {
                    self.note_release = u32::from(param) + 1;
                }
            }
            _ => {}
        }
    }

    fn trigger_note(&mut self, octave: u8, note: u8, ctx: &RowContext<'_>) -> Option<KeyEvent> {
        let key = KeyEvent::on(ChannelId::Dpcm, note_index(octave, note));

        // A missing instrument, assignment or sample is a valid authoring
        // state: the trigger is a silent no-op.
        let Some(instrument) = ctx.dpcm_instrument else {
            return None;
        };
        let Some(assignment) = instrument.assignment(octave, note) else {
            return Some(key);
        };
        let Some(sample) = ctx.samples.and_then(|bank| bank.get(assignment.sample)) else {
            return Some(key);
        };

        let size = sample.len();
        self.sample_mem.lock().load(sample.data());

        let pitch_byte = assignment.pitch;
        self.loop_flag = (pitch_byte & 0x80) >> 1;
        let pitch = self.custom_pitch.unwrap_or(pitch_byte);
        self.period = pitch & 0x0F;

        self.loop_offset = assignment.loop_offset;
        self.sample_length = ((size >> 4) as u8).wrapping_sub(self.offset.wrapping_shl(2));
        self.loop_length = (size as u8).wrapping_sub(self.loop_offset);

        self.enabled = true;
        self.trigger = true;
        self.gate = true;

        if let Some(delta) = assignment.initial_delta {
            // A manual DAC effect in the same row wins over the instrument.
            if self.dac.is_none() {
                self.dac = Some(delta);
            }
        }

        self.retrigger_counter = self.retrigger_period;

        Some(key)
    }

    fn run_delayed_countdowns(&mut self) {
        if self.note_release > 0 {
            self.note_release -= 1;
            if self.note_release == 0 {
                self.release = true;
            }
        }
        if self.note_cut > 0 {
            self.note_cut -= 1;
            if self.note_cut == 0 {
                self.gate = false;
            }
        }
    }
}
