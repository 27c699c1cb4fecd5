//! Time remap curves built from successive link samples.

use crate::core::SampleInterval;
use crate::util::{Chrono, Error, Result};

/// Piecewise-linear mapping from overlay (virtual) time to target time.
///
/// Knots are `(virtual, target)` pairs in ascending virtual time. Outside
/// the first and last knot the curve is clamped.
#[derive(Clone, Debug, PartialEq)]
pub struct RemapCurve {
    virtual_times: Vec<Chrono>,
    target_times: Vec<Chrono>,
}

impl RemapCurve {
    pub fn new(knots: impl IntoIterator<Item = (Chrono, Chrono)>) -> Result<Self> {
        let (virtual_times, target_times): (Vec<_>, Vec<_>) = knots.into_iter().unzip();
        if virtual_times.is_empty() {
            return Err(Error::invalid_argument("remap curve needs at least one knot"));
        }
        if virtual_times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invalid_argument("remap knots must have ascending times"));
        }
        Ok(Self {
            virtual_times,
            target_times,
        })
    }

    /// Number of knots, which is also the number of virtual samples.
    pub fn len(&self) -> usize {
        self.virtual_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.virtual_times.is_empty()
    }

    fn check(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(Error::SampleOutOfBounds {
                index,
                count: self.len(),
            });
        }
        Ok(())
    }

    pub fn virtual_time(&self, index: usize) -> Result<Chrono> {
        self.check(index)?;
        Ok(self.virtual_times[index])
    }

    pub fn target_time(&self, index: usize) -> Result<Chrono> {
        self.check(index)?;
        Ok(self.target_times[index])
    }

    /// Target time for a virtual time.
    pub fn evaluate(&self, time: Chrono) -> Chrono {
        match SampleInterval::find(&self.virtual_times, time) {
            Ok(s) => {
                let a = self.target_times[s.floor_index];
                let b = self.target_times[s.ceil_index];
                a + (b - a) * s.alpha
            }
            // Non-finite times pass through and fail at the target read
            Err(_) => time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_speed() {
        let curve = RemapCurve::new([(1.0, 0.0), (2.0, 3.0)]).unwrap();
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.evaluate(1.5), 1.5);
        assert_eq!(curve.evaluate(1.25), 0.75);
        assert_eq!(curve.target_time(1).unwrap(), 3.0);
        assert_eq!(curve.virtual_time(0).unwrap(), 1.0);
        assert!(curve.target_time(2).is_err());
    }

    #[test]
    fn test_clamped_outside_knots() {
        let curve = RemapCurve::new([(0.0, 0.0), (1.0, 0.5), (2.0, 1.0)]).unwrap();
        assert_eq!(curve.evaluate(-10.0), 0.0);
        assert_eq!(curve.evaluate(10.0), 1.0);
        assert_eq!(curve.evaluate(1.0), 0.5);
    }

    #[test]
    fn test_rejects_bad_knots() {
        assert!(RemapCurve::new(Vec::new()).is_err());
        assert!(RemapCurve::new([(1.0, 0.0), (1.0, 2.0)]).is_err());
    }
}
