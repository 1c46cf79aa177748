//! Driver configuration.

use serde::{Deserialize, Serialize};

/// Host-controlled behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Write `$4011 = 0` when a DPCM note is cut. Restores the full
    /// triangle/noise output range at the cost of a possible pop; hosts
    /// that keep the DPCM level across cuts during interactive editing
    /// turn this off.
    pub reset_dac_on_halt: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            reset_dac_on_halt: true,
        }
    }
}
