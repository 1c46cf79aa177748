//! Per-row effect commands consumed from the sequencing engine.

/// One effect column entry, already split into command and parameter by the
/// pattern layer.
///
/// Parameters are raw hardware bit fields: values outside the documented
/// ranges are accepted as-is, mirroring the chip, which has no validation
/// layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// `Exx` - length counter load / envelope mode control.
    Volume(u8),
    /// `Hxy` - engage the pulse sweep unit ramping the period upwards.
    SweepUp(u8),
    /// `Ixy` - engage the pulse sweep unit ramping the period downwards.
    SweepDown(u8),
    /// `Vxx` - select the duty period (noise: LFSR mode bit).
    DutyCycle(u8),
    /// `3xx` - portamento speed; while nonzero, note triggers become glide
    /// targets instead of immediate period changes.
    Portamento(u8),
    /// `Zxx` - queue a direct DPCM DAC write.
    Dac(u8),
    /// `Yxx` - DPCM sample start offset.
    SampleOffset(u8),
    /// `Wxx` - override the DPCM sample pitch index for this row.
    DpcmPitch(u8),
    /// `Xxx` - automatic DPCM sample retrigger period.
    Retrigger(u8),
    /// `Sxx` - delayed note cut. The triangle channel reinterprets the high
    /// parameter range as a linear counter reload.
    NoteCut(u8),
    /// `Lxx` - delayed note release.
    NoteRelease(u8),
}
