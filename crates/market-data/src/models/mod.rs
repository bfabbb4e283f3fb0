//! Market data models
//!
//! This module contains the core data types shared by every provider:
//! - `instrument` - Instrument codes (InstrumentCode) and their kind
//! - `quote` - The canonical quote record (FundQuote)

mod instrument;
mod quote;

pub use instrument::{InstrumentCode, InstrumentKind};
pub use quote::FundQuote;
