//! Demand signalled by a subscriber to its publisher.
//!
//! A `Demand` is either unlimited or a finite count of additional values the
//! downstream is willing to receive. Demands accumulate with [`Demand::combine`],
//! which saturates instead of overflowing.

use std::{fmt, ops::Add};

use crate::errors::{Result, TapError};

/// How many more values a subscriber is willing to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Demand {
    /// No upper bound. Absorbs any further request.
    Unlimited,
    /// A finite number of additional values.
    Count(usize),
}

impl Demand {
    /// Largest finite count. Combining counts saturates at this value.
    pub const MAX_COUNT: usize = usize::MAX;

    /// Demand without an upper bound.
    #[must_use]
    pub fn unlimited() -> Self {
        Demand::Unlimited
    }

    /// A demand for zero values.
    #[must_use]
    pub fn none() -> Self {
        Demand::Count(0)
    }

    /// Creates a finite demand for `n` values.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::InvalidDemand`] if `n` is negative.
    pub fn count(n: i64) -> Result<Self> {
        usize::try_from(n)
            .map(Demand::Count)
            .map_err(|_| TapError::InvalidDemand { requested: n })
    }

    /// Adds two demands together.
    ///
    /// `Unlimited` plus anything is `Unlimited`. Two counts are summed,
    /// saturating at [`Demand::MAX_COUNT`].
    #[must_use]
    pub fn combine(a: Demand, b: Demand) -> Demand {
        match (a, b) {
            (Demand::Count(a), Demand::Count(b)) => Demand::Count(a.saturating_add(b)),
            _ => Demand::Unlimited,
        }
    }

    /// Demand left after one value has been delivered against it.
    #[must_use]
    pub fn decrement(self) -> Demand {
        match self {
            Demand::Unlimited => Demand::Unlimited,
            Demand::Count(n) => Demand::Count(n.saturating_sub(1)),
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        matches!(self, Demand::Count(0))
    }

    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Demand::Unlimited)
    }
}

impl Default for Demand {
    fn default() -> Self {
        Demand::none()
    }
}

impl Add for Demand {
    type Output = Demand;

    fn add(self, rhs: Demand) -> Demand {
        Demand::combine(self, rhs)
    }
}

impl From<usize> for Demand {
    fn from(n: usize) -> Self {
        Demand::Count(n)
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Demand::Unlimited => f.write_str("unlimited"),
            Demand::Count(n) => write!(f, "{}", n),
        }
    }
}
