use serde::{Deserialize, Serialize};

use super::error::ScaleError;

/// The current-limit class of the channel, as written in the nda header.
///
/// The class selects the fixed-point scale of the current, capacity, and energy fields.
/// Within a class each record's current-range code picks the actual divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrentLimit {
    Class10,
    Class6000,
    Class50000,
    Class100000,
}

impl TryFrom<u32> for CurrentLimit {
    type Error = ScaleError;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(Self::Class10),
            6000 => Ok(Self::Class6000),
            50000 => Ok(Self::Class50000),
            100000 => Ok(Self::Class100000),
            _ => Err(ScaleError::UnknownCurrentLimit(value)),
        }
    }
}

impl CurrentLimit {
    pub const ALL: [CurrentLimit; 4] = [
        Self::Class10,
        Self::Class6000,
        Self::Class50000,
        Self::Class100000,
    ];

    /// The raw value stored in the header
    pub fn value(&self) -> u32 {
        match self {
            Self::Class10 => 10,
            Self::Class6000 => 6000,
            Self::Class50000 => 50000,
            Self::Class100000 => 100000,
        }
    }

    /// Divisor for the current-range code of a record. Unlisted codes fall back to 1.
    pub fn divisor(&self, current_range: i32) -> f64 {
        let divisor: u32 = match (self, current_range) {
            (Self::Class10, 1) => 10_000,
            (Self::Class10, 10) => 1_000,
            (Self::Class6000, 0) => 1_000_000,
            (Self::Class6000, 100) => 100_000,
            (Self::Class6000, 6000) => 10_000,
            (Self::Class50000, 0) | (Self::Class50000, 50000) => 10_000,
            (Self::Class100000, code) => match code.unsigned_abs() {
                0 | 10000 | 50000 | 100000 => 100_000,
                _ => 1,
            },
            _ => 1,
        };
        divisor as f64
    }

    /// Extra division applied on top of the divisor to current, capacity, and energy.
    ///
    /// Only the 10 class needs it; its divisors alone are 1000x too small.
    pub fn correction(&self) -> f64 {
        match self {
            Self::Class10 => 1_000.0,
            _ => 1.0,
        }
    }

    /// Total factor applied to a raw current value
    pub fn current_factor(&self, current_range: i32) -> f64 {
        self.divisor(current_range) * self.correction()
    }
}
