//! Sample lookup by time.
//!
//! Every channel stores its sample times as an ascending, duplicate-free
//! list. Continuous-time reads bracket the requested time between two stored
//! samples and blend them; outside the sampled range the end sample is held.

use crate::util::{Chrono, Error, Result};

/// Result of a sample lookup by time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleInterval {
    /// Floor sample index.
    pub floor_index: usize,
    /// Ceil sample index.
    pub ceil_index: usize,
    /// Interpolation factor (0.0 = floor, 1.0 = ceil).
    pub alpha: f64,
}

impl SampleInterval {
    /// Create for exact sample (no interpolation needed).
    pub fn exact(index: usize) -> Self {
        Self {
            floor_index: index,
            ceil_index: index,
            alpha: 0.0,
        }
    }

    /// Create for interpolation between two samples.
    pub fn lerp(floor: usize, ceil: usize, alpha: f64) -> Self {
        Self {
            floor_index: floor,
            ceil_index: ceil,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Check if this is an exact sample (no interpolation).
    pub fn is_exact(&self) -> bool {
        self.floor_index == self.ceil_index || self.alpha == 0.0
    }

    /// Index holding the nearest sample.
    pub fn nearest_index(&self) -> usize {
        if self.alpha < 0.5 {
            self.floor_index
        } else {
            self.ceil_index
        }
    }

    /// Bracket `time` within ascending `times`.
    pub fn find(times: &[Chrono], time: Chrono) -> Result<Self> {
        if !time.is_finite() {
            return Err(Error::invalid_argument(format!("sample time {} is not finite", time)));
        }
        let n = times.len();
        if n == 0 {
            return Err(Error::not_found("channel has no samples"));
        }
        if time <= times[0] {
            return Ok(Self::exact(0));
        }
        if time >= times[n - 1] {
            return Ok(Self::exact(n - 1));
        }

        // Largest index with times[i] <= time
        let floor = times.partition_point(|&t| t <= time) - 1;
        if times[floor] == time {
            return Ok(Self::exact(floor));
        }
        let ceil = floor + 1;
        let alpha = (time - times[floor]) / (times[ceil] - times[floor]);
        Ok(Self::lerp(floor, ceil, alpha))
    }
}

/// Merge `extra` into the ascending, duplicate-free `times`.
pub fn merge_times(times: &mut Vec<Chrono>, extra: &[Chrono]) {
    times.extend_from_slice(extra);
    times.sort_by(|a, b| a.total_cmp(b));
    times.dedup();
}
