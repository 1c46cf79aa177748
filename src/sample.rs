//! DPCM sample storage.
//!
//! The chip backend reads delta-modulation bytes from a shared sample
//! memory mapped at `$C000`. The DPCM channel's note trigger replaces that
//! buffer wholesale before it emits the matching enable writes, so the
//! backend never sees a half-staged sample paired with a trigger. The
//! document side contributes a [`SampleBank`] of validated samples and
//! per-octave/note [`DpcmInstrument`] assignments.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{DriverError, Result};

/// Hardware limit for one DPCM sample: `$4013` encodes at most
/// `255 * 16 + 1` bytes.
pub const MAX_SAMPLE_SIZE: usize = 4081;

/// Sample memory handle shared between the driver and the chip backend.
pub type SharedSampleMem = Arc<Mutex<SampleMem>>;

/// The shared DPCM sample buffer.
#[derive(Debug, Default, Clone)]
pub struct SampleMem {
    data: Vec<u8>,
}

impl SampleMem {
    /// Create an empty sample memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer contents with a freshly staged sample.
    pub fn load(&mut self, bytes: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(bytes);
    }

    /// Staged sample size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether any sample is staged.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read one byte the way the sample reader does: addresses start at
    /// `$C000` and wrap within the staged data.
    pub fn read(&self, address: u16) -> u8 {
        if self.data.is_empty() {
            return 0;
        }
        let offset = (address as usize).wrapping_sub(0xC000) % self.data.len();
        self.data[offset]
    }

    /// Staged bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// One validated delta-modulation sample.
#[derive(Debug, Clone)]
pub struct DpcmSample {
    data: Vec<u8>,
}

impl DpcmSample {
    /// Wrap raw sample bytes, rejecting sizes the hardware cannot address.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        if data.is_empty() {
            return Err(DriverError::EmptySample);
        }
        if data.len() > MAX_SAMPLE_SIZE {
            return Err(DriverError::SampleTooLarge { size: data.len() });
        }
        Ok(Self { data })
    }

    /// Sample size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Never true; empty samples are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw sample bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Document-side sample container addressed by the per-note assignments.
#[derive(Debug, Default, Clone)]
pub struct SampleBank {
    samples: Vec<DpcmSample>,
}

impl SampleBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample, returning its bank index.
    pub fn add(&mut self, sample: DpcmSample) -> usize {
        self.samples.push(sample);
        self.samples.len() - 1
    }

    /// Look up a sample by bank index.
    pub fn get(&self, index: usize) -> Option<&DpcmSample> {
        self.samples.get(index)
    }

    /// Number of samples in the bank.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the bank holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Per-note sample binding inside a 2A03 instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpcmAssignment {
    /// Index into the sample bank.
    pub sample: usize,
    /// Pitch byte: low nibble rate index, bit 7 loop flag.
    pub pitch: u8,
    /// Loop point in `$4012` address units; zero means no loop region.
    pub loop_offset: u8,
    /// Initial delta counter value, if the instrument specifies one.
    pub initial_delta: Option<u8>,
}

/// Per-octave/note DPCM sample assignments of one instrument.
#[derive(Debug, Default, Clone)]
pub struct DpcmInstrument {
    assignments: HashMap<(u8, u8), DpcmAssignment>,
}

impl DpcmInstrument {
    /// Create an instrument with no assignments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a sample to an octave/note pair (`note` is 1-based).
    pub fn assign(&mut self, octave: u8, note: u8, assignment: DpcmAssignment) {
        self.assignments.insert((octave, note), assignment);
    }

    /// Assignment for an octave/note pair, if any.
    pub fn assignment(&self, octave: u8, note: u8) -> Option<DpcmAssignment> {
        self.assignments.get(&(octave, note)).copied()
    }
}
