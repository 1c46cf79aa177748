//! DPCM sample staging and playback register sequences.

use std::sync::Arc;

use parking_lot::Mutex;

use rp2a03_driver::{
    DpcmAssignment, DpcmChannel, DpcmInstrument, DpcmSample, DriverConfig, Effect, NoteEvent,
    RowContext, RowEvent, SampleBank, SampleMem, WriteLog,
};

struct Fixture {
    channel: DpcmChannel,
    instrument: DpcmInstrument,
    samples: SampleBank,
}

impl Fixture {
    fn new(pitch: u8, loop_offset: u8, initial_delta: Option<u8>) -> Self {
        Self::with_config(pitch, loop_offset, initial_delta, DriverConfig::default())
    }

    fn with_config(
        pitch: u8,
        loop_offset: u8,
        initial_delta: Option<u8>,
        config: DriverConfig,
    ) -> Self {
        let mut samples = SampleBank::new();
        let index = samples.add(DpcmSample::new(vec![0xAA; 160]).unwrap());

        let mut instrument = DpcmInstrument::new();
        instrument.assign(
            3,
            1,
            DpcmAssignment {
                sample: index,
                pitch,
                loop_offset,
                initial_delta,
            },
        );

        let channel = DpcmChannel::new(Arc::new(Mutex::new(SampleMem::new())), config);
        Self {
            channel,
            instrument,
            samples,
        }
    }

    fn row(&mut self, note: NoteEvent, effects: &[Effect]) {
        let ctx = RowContext {
            dpcm_instrument: Some(&self.instrument),
            samples: Some(&self.samples),
            ..RowContext::default()
        };
        self.channel.handle_row(&RowEvent { note, effects }, &ctx);
    }

    fn note_row(&mut self, effects: &[Effect]) {
        self.row(NoteEvent::Note { octave: 3, note: 1 }, effects);
    }
}

#[test]
fn oversized_samples_are_rejected_before_staging() -> anyhow::Result<()> {
    let sample = DpcmSample::new(vec![0x55; 16])?;
    assert_eq!(sample.len(), 16);
    assert!(DpcmSample::new(vec![0; 5000]).is_err());
    Ok(())
}

#[test]
fn note_trigger_stages_the_sample_and_pulses_the_status_register() {
    let mut fx = Fixture::new(0x05, 0, None);
    let mut log = WriteLog::new();

    fx.note_row(&[]);
    fx.channel.refresh(&mut log);

    // 160 bytes pack to 10 length units; no loop region follows.
    assert_eq!(
        log.writes(),
        &[
            (0x4010, 0x05),
            (0x4012, 0x00),
            (0x4013, 10),
            (0x4015, 0x0F),
            (0x4015, 0x1F),
        ]
    );

    // The staged sample is in the shared memory before the trigger lands.
    assert_eq!(fx.channel.sample_mem().lock().len(), 160);

    // Steady state: nothing left to write while the sample plays.
    log.clear();
    fx.channel.refresh(&mut log);
    assert!(log.writes().is_empty());
}

#[test]
fn looped_sample_rewrites_the_loop_region_after_the_trigger() {
    let mut fx = Fixture::new(0x85, 3, None);
    let mut log = WriteLog::new();

    fx.note_row(&[]);
    fx.channel.refresh(&mut log);

    assert_eq!(
        log.writes(),
        &[
            (0x4010, 0x45), // rate 5 with the loop bit
            (0x4012, 0x00),
            (0x4013, 10),
            (0x4015, 0x0F),
            (0x4015, 0x1F),
            (0x4012, 3),
            (0x4013, 157),
        ]
    );
}

#[test]
fn sample_offset_effect_shifts_the_start_address() {
    let mut fx = Fixture::new(0x05, 0, None);
    let mut log = WriteLog::new();

    fx.note_row(&[Effect::SampleOffset(0x01)]);
    fx.channel.refresh(&mut log);

    // One offset unit skips four length units of sample.
    assert_eq!(log.writes()[1], (0x4012, 0x01));
    assert_eq!(log.writes()[2], (0x4013, 6));
}

#[test]
fn pitch_override_effect_replaces_the_rate_for_one_row() {
    let mut fx = Fixture::new(0x05, 0, None);
    let mut log = WriteLog::new();

    fx.note_row(&[Effect::DpcmPitch(0x0C)]);
    fx.channel.refresh(&mut log);
    assert_eq!(log.writes()[0], (0x4010, 0x0C));

    // The override does not stick: the next trigger uses the instrument rate.
    log.clear();
    fx.note_row(&[]);
    fx.channel.refresh(&mut log);
    assert_eq!(log.writes()[0], (0x4010, 0x05));
}

#[test]
fn dac_effect_wins_over_the_instrument_delta_and_lands_first() {
    let mut fx = Fixture::new(0x05, 0, Some(0x10));
    let mut log = WriteLog::new();

    fx.note_row(&[Effect::Dac(0x30)]);
    fx.channel.refresh(&mut log);
    assert_eq!(log.writes()[0], (0x4011, 0x30));
    assert_eq!(log.writes()[1], (0x4010, 0x05));
}

#[test]
fn instrument_delta_is_written_when_no_dac_effect_competes() {
    let mut fx = Fixture::new(0x05, 0, Some(0x10));
    let mut log = WriteLog::new();

    fx.note_row(&[]);
    fx.channel.refresh(&mut log);
    assert_eq!(log.writes()[0], (0x4011, 0x10));
}

#[test]
fn retrigger_effect_replays_the_sample_on_schedule() {
    let mut fx = Fixture::new(0x05, 0, None);
    let mut log = WriteLog::new();

    fx.note_row(&[Effect::Retrigger(0x01)]);
    fx.channel.refresh(&mut log);
    log.clear();

    // Two-tick period: the tick after next replays the staged sample.
    fx.channel.refresh(&mut log);
    assert_eq!(
        log.writes(),
        &[
            (0x4010, 0x05),
            (0x4012, 0x00),
            (0x4013, 10),
            (0x4015, 0x0F),
            (0x4015, 0x1F),
        ]
    );
}

#[test]
fn delayed_cut_silences_and_resets_the_dac() {
    let mut fx = Fixture::new(0x05, 0, None);
    let mut log = WriteLog::new();

    fx.note_row(&[]);
    fx.channel.refresh(&mut log);
    log.clear();

    fx.row(NoteEvent::None, &[Effect::NoteCut(0x01)]);
    fx.channel.refresh(&mut log);
    assert!(log.writes().is_empty());

    fx.channel.refresh(&mut log);
    assert_eq!(log.writes(), &[(0x4015, 0x0F), (0x4011, 0x00)]);
    assert!(!fx.channel.enabled());
}

#[test]
fn halt_skips_the_dac_reset_when_configured_off() {
    let config = DriverConfig {
        reset_dac_on_halt: false,
    };
    let mut fx = Fixture::with_config(0x05, 0, None, config);
    let mut log = WriteLog::new();

    fx.note_row(&[]);
    fx.channel.refresh(&mut log);
    log.clear();

    fx.row(NoteEvent::Halt, &[]);
    fx.channel.refresh(&mut log);
    assert_eq!(log.writes(), &[(0x4015, 0x0F)]);
}

#[test]
fn halt_cancels_a_pending_delayed_release() {
    let mut fx = Fixture::new(0x05, 0, None);
    let mut log = WriteLog::new();

    fx.note_row(&[]);
    fx.channel.refresh(&mut log);
    log.clear();

    fx.row(NoteEvent::None, &[Effect::NoteRelease(0x02)]);
    fx.channel.refresh(&mut log);
    assert!(log.writes().is_empty());

    fx.row(NoteEvent::Halt, &[]);
    fx.channel.refresh(&mut log);
    assert_eq!(log.writes(), &[(0x4015, 0x0F), (0x4011, 0x00)]);

    // The armed release died with the halt; no stray status writes follow.
    log.clear();
    fx.channel.refresh(&mut log);
    fx.channel.refresh(&mut log);
    assert!(log.writes().is_empty());
}

#[test]
fn release_stops_playback_with_a_single_status_write() {
    let mut fx = Fixture::new(0x05, 0, None);
    let mut log = WriteLog::new();

    fx.note_row(&[]);
    fx.channel.refresh(&mut log);
    log.clear();

    fx.row(NoteEvent::Release, &[]);
    fx.channel.refresh(&mut log);
    assert_eq!(log.writes(), &[(0x4015, 0x0F)]);

    log.clear();
    fx.channel.refresh(&mut log);
    assert!(log.writes().is_empty());
}
