use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Rates tried when none are given on the command line.
pub const STANDARD_BAUD_RATES: &[u32] = &[9600, 14400, 19200, 38400, 57600, 115200];

/// The candidate baud rates, ascending and without duplicates.
///
/// A list is never empty and never contains zero.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RateList(Vec<u32>);

impl RateList {
    /// Build a list from arbitrary rates. They are sorted and de-duplicated.
    pub fn new(mut rates: Vec<u32>) -> Result<Self> {
        if rates.is_empty() || rates.contains(&0) {
            return Err(Error::InvalidRateList(format!("{:?}", rates)));
        }
        rates.sort_unstable();
        rates.dedup();
        Ok(RateList(rates))
    }

    /// The [`STANDARD_BAUD_RATES`].
    pub fn standard() -> Self {
        RateList(STANDARD_BAUD_RATES.to_vec())
    }

    /// The rates in probing order.
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of rates in one pass.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for symmetry with [`RateList::len`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `baud_rate` is a candidate.
    pub fn contains(&self, baud_rate: u32) -> bool {
        self.0.binary_search(&baud_rate).is_ok()
    }

    /// Endless iterator over the rates, wrapping after the last one.
    pub fn cycle(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied().cycle()
    }
}

impl Default for RateList {
    fn default() -> Self {
        RateList::standard()
    }
}

impl FromStr for RateList {
    type Err = Error;

    /// Parses `"9600,19200, 115200"`.
    fn from_str(s: &str) -> Result<Self> {
        let rates = s
            .split(',')
            .map(str::trim)
            .filter(|rate| !rate.is_empty())
            .map(|rate| rate.parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| Error::InvalidRateList(s.to_string()))?;
        RateList::new(rates).map_err(|_| Error::InvalidRateList(s.to_string()))
    }
}

impl fmt::Display for RateList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rates = self.0.iter();
        if let Some(first) = rates.next() {
            write!(f, "{}", first)?;
        }
        for rate in rates {
            write!(f, ", {}", rate)?;
        }
        Ok(())
    }
}
