//! State codec: environment bit-strings to table rows and back
//!
//! The environment reports its state as a fixed-width string of `0`/`1`
//! characters. The high bits carry the platform the player stands on and
//! the low bits the direction it faces. The table is addressed by the
//! value of the whole string read as a base-2 integer.

use serde::{Deserialize, Serialize};

use crate::{RLError, Result};

/// Sub-fields of a decoded state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateFields {
    /// Platform ordinal (high bits)
    pub platform: usize,
    /// Direction ordinal (low bits)
    pub direction: usize,
}

/// Converts raw state strings into dense table indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCodec {
    platform_bits: usize,
    direction_bits: usize,
    num_states: usize,
}

impl StateCodec {
    /// Create a codec for `platform_bits + direction_bits` wide states
    ///
    /// `num_states` must fit in the combined width.
    pub fn new(platform_bits: usize, direction_bits: usize, num_states: usize) -> Result<Self> {
        if platform_bits == 0 || direction_bits == 0 {
            return Err(RLError::InvalidConfig(
                "state sub-fields need at least one bit each".to_string(),
            ));
        }
        let width = platform_bits + direction_bits;
        if width >= usize::BITS as usize {
            return Err(RLError::InvalidConfig(format!(
                "state width of {width} bits is too wide"
            )));
        }
        if num_states == 0 || num_states > 1 << width {
            return Err(RLError::InvalidConfig(format!(
                "num_states {num_states} does not fit in a {width}-bit state"
            )));
        }
        Ok(Self {
            platform_bits,
            direction_bits,
            num_states,
        })
    }

    /// Total width of a raw state in bits
    #[must_use]
    pub fn width(&self) -> usize {
        self.platform_bits + self.direction_bits
    }

    /// Number of addressable states
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Decode a raw bit-string into a table row
    pub fn decode(&self, raw: &str) -> Result<usize> {
        let value = self.parse_bits(raw)?;
        self.decode_value(value)
    }

    /// Bound-check an already parsed state value
    pub fn decode_value(&self, value: usize) -> Result<usize> {
        if value >= self.num_states {
            return Err(RLError::InvalidState(format!(
                "state value {value} outside [0, {})",
                self.num_states
            )));
        }
        Ok(value)
    }

    /// Split a raw bit-string into its platform and direction ordinals
    pub fn fields(&self, raw: &str) -> Result<StateFields> {
        let value = self.parse_bits(raw)?;
        Ok(self.split(value))
    }

    /// Split a table row into its platform and direction ordinals
    pub fn fields_of(&self, index: usize) -> Result<StateFields> {
        self.decode_value(index).map(|value| self.split(value))
    }

    /// Encode a table row back into the environment's bit-string form
    pub fn encode(&self, index: usize) -> Result<String> {
        let value = self.decode_value(index)?;
        Ok(format!("{value:0width$b}", width = self.width()))
    }

    fn split(&self, value: usize) -> StateFields {
        let mask = (1 << self.direction_bits) - 1;
        StateFields {
            platform: value >> self.direction_bits,
            direction: value & mask,
        }
    }

    fn parse_bits(&self, raw: &str) -> Result<usize> {
        if raw.len() != self.width() {
            return Err(RLError::InvalidState(format!(
                "expected {} bits, got {:?}",
                self.width(),
                raw
            )));
        }
        raw.bytes().try_fold(0usize, |acc, bit| match bit {
            b'0' => Ok(acc << 1),
            b'1' => Ok((acc << 1) | 1),
            _ => Err(RLError::InvalidState(format!(
                "non-binary character in state {raw:?}"
            ))),
        })
    }
}
