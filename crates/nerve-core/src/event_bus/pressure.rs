//! Metabolic pressure.
//!
//! A 0-100 load signal set by whoever monitors the host. The drain loop
//! consults it for every event: above 50 events below priority 2 are shed,
//! above 80 events below priority 3 are shed. The two bands are checked
//! independently; since they nest, an event is shed at most once.

use std::sync::atomic::{AtomicU64, Ordering};

use super::envelope::Priority;

/// Pressure above which the critical band applies.
pub const CRITICAL_PRESSURE: f64 = 80.0;

/// Pressure above which the elevated band applies.
pub const ELEVATED_PRESSURE: f64 = 50.0;

/// Band that caused an event to be shed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShedBand {
    /// Pressure > 80, priority < 3.
    Critical,
    /// Pressure > 50, priority < 2.
    Elevated,
}

impl std::fmt::Display for ShedBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShedBand::Critical => write!(f, "critical"),
            ShedBand::Elevated => write!(f, "elevated"),
        }
    }
}

/// Current load score shared between the bus handle and its drain cycles
#[derive(Debug, Default)]
pub struct MetabolicPressure {
    bits: AtomicU64,
}

impl MetabolicPressure {
    /// Create a controller at zero pressure
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new score clamped to [0, 100] and return it.
    ///
    /// NaN is treated as zero.
    pub fn set(&self, score: f64) -> f64 {
        let clamped = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 100.0)
        };
        self.bits.store(clamped.to_bits(), Ordering::Relaxed);

        if clamped > CRITICAL_PRESSURE {
            tracing::warn!(
                pressure = clamped,
                "Critical metabolic pressure, initiating systemic task shedding"
            );
        }
        clamped
    }

    /// Current score
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Band that sheds an event of this priority at the current score, if any
    pub fn shed_band(&self, priority: Priority) -> Option<ShedBand> {
        let pressure = self.get();
        let level = priority.level();

        if pressure > CRITICAL_PRESSURE && level < 3 {
            return Some(ShedBand::Critical);
        }
        if pressure > ELEVATED_PRESSURE && level < 2 {
            return Some(ShedBand::Elevated);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        let pressure = MetabolicPressure::new();
        assert_eq!(pressure.get(), 0.0);
        assert_eq!(pressure.set(150.0), 100.0);
        assert_eq!(pressure.set(-3.0), 0.0);
        assert_eq!(pressure.set(f64::NAN), 0.0);
        assert_eq!(pressure.set(42.5), 42.5);
        assert_eq!(pressure.get(), 42.5);
    }

    #[test]
    fn test_no_shedding_at_rest() {
        let pressure = MetabolicPressure::new();
        assert_eq!(pressure.shed_band(Priority::TELEMETRY), None);
        pressure.set(50.0);
        assert_eq!(pressure.shed_band(Priority::TELEMETRY), None);
    }

    #[test]
    fn test_elevated_band() {
        let pressure = MetabolicPressure::new();
        pressure.set(60.0);
        assert_eq!(pressure.shed_band(Priority::LOW), Some(ShedBand::Elevated));
        assert_eq!(pressure.shed_band(Priority::NORMAL), None);
    }

    #[test]
    fn test_critical_band() {
        let pressure = MetabolicPressure::new();
        pressure.set(90.0);
        assert_eq!(pressure.shed_band(Priority::TELEMETRY), Some(ShedBand::Critical));
        assert_eq!(pressure.shed_band(Priority::NORMAL), Some(ShedBand::Critical));
        assert_eq!(pressure.shed_band(Priority::HIGH), None);
        assert_eq!(pressure.shed_band(Priority::URGENT), None);
    }
}
