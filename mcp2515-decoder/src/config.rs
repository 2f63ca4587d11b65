//! Decoder configuration types
//!
//! The decoder needs very little configuration: a few switches for how strictly
//! anomalies are reported and how much detail each event carries. Reporting and
//! output selection live in the application layer.

use crate::instruction::InstructionKind;
use serde::{Deserialize, Serialize};

/// Configuration for the decoder library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Accept repeated READ STATUS / RX STATUS response bytes without a warning
    ///
    /// The controller keeps returning the status byte for as long as the host keeps
    /// clocking, so identical repeats are normal traffic.
    #[serde(default = "default_true")]
    pub accept_repeated_status: bool,

    /// Warn when READ/WRITE/BIT MODIFY addresses a register outside the map
    #[serde(default = "default_true")]
    pub warn_unresolved_registers: bool,

    /// Attach per-field segments (instruction, register, mask, data) to events
    #[serde(default = "default_true")]
    pub include_segments: bool,

    /// Optional: only emit events of these instruction kinds from file decoding
    #[serde(default)]
    pub kind_filter: Option<Vec<InstructionKind>>,
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            accept_repeated_status: true,
            warn_unresolved_registers: true,
            include_segments: true,
            kind_filter: None,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: accept or flag repeated status bytes
    pub fn with_repeated_status(mut self, accept: bool) -> Self {
        self.accept_repeated_status = accept;
        self
    }

    /// Builder method: enable or disable unresolved-register warnings
    pub fn with_unresolved_register_warnings(mut self, enabled: bool) -> Self {
        self.warn_unresolved_registers = enabled;
        self
    }

    /// Builder method: enable or disable per-field segments
    pub fn with_segments(mut self, enabled: bool) -> Self {
        self.include_segments = enabled;
        self
    }

    /// Builder method: set instruction kind filter
    pub fn with_kind_filter(mut self, kinds: Vec<InstructionKind>) -> Self {
        self.kind_filter = Some(kinds);
        self
    }

    /// Check if events of this kind should be emitted
    pub fn should_emit(&self, kind: InstructionKind) -> bool {
        match &self.kind_filter {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        }
    }
}
