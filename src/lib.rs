//! NES/Famicom 2A03 channel driver.
//!
//! Translates the per-tick output of a music sequencer (notes, effect
//! commands and precomputed pitch/volume envelopes) into the exact ordered
//! register writes the 2A03 sound hardware needs, reproducing the chip
//! level quirks a real Famicom exhibits:
//!
//! - the sweep unit reset trick (frame counter `$4017 = $80, $00` after
//!   every sweep register write)
//! - duty/envelope/volume packing in the pulse and noise control registers
//! - timer-high write suppression, so the pulse duty sequencer and the
//!   triangle linear counter are not audibly reset every tick
//! - DPCM sample staging, the `$4015` disable/enable restart pulse,
//!   automatic retriggering and direct DAC pokes
//!
//! The crate renders no audio and interprets no instruments; it sits
//! between a sequencing engine (which supplies notes, effects and modulated
//! period/volume scalars) and a register-level chip backend implementing
//! [`RegisterSink`].
//!
//! # Quick start
//! ```
//! use rp2a03_driver::{
//!     Apu2a03Driver, ChannelId, DriverConfig, NoteEvent, RowContext, RowEvent, TickInput,
//!     WriteLog,
//! };
//!
//! let mut driver = Apu2a03Driver::new(DriverConfig::default());
//! let mut log = WriteLog::new();
//! driver.reset(&mut log);
//! log.clear();
//!
//! // Row start: pulse 1 gets a pitched note.
//! let row = RowEvent {
//!     note: NoteEvent::Note { octave: 3, note: 1 },
//!     effects: &[],
//! };
//! driver
//!     .channel_mut(ChannelId::Pulse1)
//!     .handle_row(&row, &RowContext::default());
//!
//! // Tick: the engine already folded vibrato/volume envelopes in.
//! let tick = TickInput { period: 0x1AB, volume: 15 };
//! driver.channel_mut(ChannelId::Pulse1).refresh(&tick, &mut log);
//!
//! for (address, value) in log.writes() {
//!     // feed the chip backend
//!     let _ = (address, value);
//! }
//! ```

#![warn(missing_docs)]

pub mod channel;
pub mod config;
pub mod dpcm;
pub mod driver;
pub mod effects;
pub mod noise;
pub mod pulse;
pub mod registers;
pub mod sample;
pub mod state;
pub mod triangle;

/// Error types for driver operations.
///
/// The per-tick core is total over its inputs: malformed effect parameters
/// are raw hardware bit patterns and missing samples are silent no-ops.
/// Errors only surface at the authoring-time edges.
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    /// DPCM sample data was empty.
    #[error("DPCM sample is empty")]
    EmptySample,

    /// DPCM sample exceeds the hardware address range.
    #[error("DPCM sample too large: {size} bytes (max 4081)")]
    SampleTooLarge {
        /// Rejected sample size in bytes.
        size: usize,
    },
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

// Public API exports
pub use channel::{Channel, ChannelId, KeyEvent, NoteEvent, RowContext, RowEvent, TickInput};
pub use config::DriverConfig;
pub use dpcm::DpcmChannel;
pub use driver::Apu2a03Driver;
pub use effects::Effect;
pub use noise::NoiseChannel;
pub use pulse::{PulseChannel, PulseVoice};
pub use registers::{ChannelMask, RegisterSink, WriteLog};
pub use sample::{
    DpcmAssignment, DpcmInstrument, DpcmSample, SampleBank, SampleMem, SharedSampleMem,
};
pub use state::{ChannelState, EnvelopeConfig, InstrumentKind, SweepUnit};
pub use triangle::TriangleChannel;
