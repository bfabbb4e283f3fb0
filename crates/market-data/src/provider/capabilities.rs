//! Provider capabilities.
//!
//! This module defines the structure describing which instruments a
//! provider can value.

use crate::models::{InstrumentCode, InstrumentKind};

/// Describes the capabilities of a quote provider.
///
/// Used by the aggregator to skip providers in a fallback chain that cannot
/// handle the instrument at hand.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Instrument kinds this provider supports.
    pub instrument_kinds: &'static [InstrumentKind],
}

impl ProviderCapabilities {
    /// Whether `code` parses to an instrument kind this provider handles.
    pub fn supports(&self, code: &str) -> bool {
        InstrumentCode::parse(code)
            .map(|parsed| self.instrument_kinds.contains(&parsed.kind()))
            .unwrap_or(false)
    }
}
