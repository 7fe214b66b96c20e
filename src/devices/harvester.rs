use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::harvester_trace::FileHarvester;
use super::types::Harvester;
use crate::sim::clock::SimTime;

/// Harvester whose power is redrawn uniformly from `[min_power_w, max_power_w]`
/// every `update_interval`.
#[derive(Debug, Clone)]
pub struct ConstantRangeHarvester {
    pub min_power_w: f64,
    pub max_power_w: f64,
    update_interval: Duration,
    power_w: f64,
    last_update: SimTime,
    total_energy_j: f64,
    rng: StdRng,
}

impl ConstantRangeHarvester {
    /// Creates a harvester and draws its first power sample.
    ///
    /// # Arguments
    ///
    /// * `min_power_w` - Lower bound of the power draw (W)
    /// * `max_power_w` - Upper bound of the power draw (W)
    /// * `update_interval` - Resampling cadence
    /// * `seed` - Random seed for reproducible draws
    ///
    /// # Panics
    ///
    /// Panics if `min_power_w < 0`, `min_power_w > max_power_w` or the
    /// interval is zero.
    pub fn new(min_power_w: f64, max_power_w: f64, update_interval: Duration, seed: u64) -> Self {
        assert!(min_power_w >= 0.0 && min_power_w <= max_power_w);
        assert!(!update_interval.is_zero());
        let mut h = Self {
            min_power_w,
            max_power_w,
            update_interval,
            power_w: 0.0,
            last_update: SimTime::ZERO,
            total_energy_j: 0.0,
            rng: StdRng::seed_from_u64(seed),
        };
        h.power_w = h.draw();
        h
    }

    fn draw(&mut self) -> f64 {
        if self.max_power_w > self.min_power_w {
            self.rng.random_range(self.min_power_w..=self.max_power_w)
        } else {
            self.min_power_w
        }
    }
}

impl Harvester for ConstantRangeHarvester {
    fn power_w(&self) -> f64 {
        self.power_w
    }

    fn resample(&mut self, now: SimTime) -> f64 {
        self.total_energy_j += self.power_w * now.saturating_since(self.last_update).as_secs_f64();
        self.last_update = now;
        self.power_w = self.draw();
        self.power_w
    }

    fn update_interval(&self) -> Duration {
        self.update_interval
    }

    fn total_energy_harvested_j(&self) -> f64 {
        self.total_energy_j
    }

    fn harvester_type(&self) -> &'static str {
        "ConstantRange"
    }
}

/// Harvester variants selectable from configuration.
#[derive(Debug, Clone)]
pub enum HarvesterKind {
    Constant(ConstantRangeHarvester),
    File(FileHarvester),
    /// No harvesting at all.
    Disabled,
}

impl Harvester for HarvesterKind {
    fn power_w(&self) -> f64 {
        match self {
            HarvesterKind::Constant(h) => h.power_w(),
            HarvesterKind::File(h) => h.power_w(),
            HarvesterKind::Disabled => 0.0,
        }
    }

    fn resample(&mut self, now: SimTime) -> f64 {
        match self {
            HarvesterKind::Constant(h) => h.resample(now),
            HarvesterKind::File(h) => h.resample(now),
            HarvesterKind::Disabled => 0.0,
        }
    }

    fn update_interval(&self) -> Duration {
        match self {
            HarvesterKind::Constant(h) => h.update_interval(),
            HarvesterKind::File(h) => h.update_interval(),
            HarvesterKind::Disabled => Duration::ZERO,
        }
    }

    fn total_energy_harvested_j(&self) -> f64 {
        match self {
            HarvesterKind::Constant(h) => h.total_energy_harvested_j(),
            HarvesterKind::File(h) => h.total_energy_harvested_j(),
            HarvesterKind::Disabled => 0.0,
        }
    }

    fn harvester_type(&self) -> &'static str {
        match self {
            HarvesterKind::Constant(h) => h.harvester_type(),
            HarvesterKind::File(h) => h.harvester_type(),
            HarvesterKind::Disabled => "Disabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: f64) -> SimTime {
        SimTime::from_secs_f64(s)
    }

    #[test]
    fn power_stays_in_range() {
        let mut h = ConstantRangeHarvester::new(0.001, 0.005, Duration::from_secs(10), 42);
        for i in 0..500 {
            let p = h.resample(t(i as f64 * 10.0));
            assert!((0.001..=0.005).contains(&p));
        }
    }

    #[test]
    fn same_seed_is_reproducible() {
        let mut a = ConstantRangeHarvester::new(0.0, 1.0, Duration::from_secs(1), 7);
        let mut b = ConstantRangeHarvester::new(0.0, 1.0, Duration::from_secs(1), 7);
        for i in 1..20 {
            assert_eq!(a.resample(t(i as f64)), b.resample(t(i as f64)));
        }
    }

    #[test]
    fn degenerate_range_is_constant() {
        let mut h = ConstantRangeHarvester::new(0.002, 0.002, Duration::from_secs(1), 1);
        assert_eq!(h.power_w(), 0.002);
        assert_eq!(h.resample(t(1.0)), 0.002);
    }

    #[test]
    fn energy_accumulates_previous_power() {
        let mut h = ConstantRangeHarvester::new(0.01, 0.01, Duration::from_secs(10), 1);
        h.resample(t(10.0));
        h.resample(t(25.0));
        assert!((h.total_energy_harvested_j() - 0.25).abs() < 1e-12);
    }

    #[test]
    #[should_panic]
    fn negative_min_power_panics() {
        ConstantRangeHarvester::new(-0.1, 0.1, Duration::from_secs(1), 0);
    }

    #[test]
    fn disabled_harvester_is_zero() {
        let mut h = HarvesterKind::Disabled;
        assert_eq!(h.power_w(), 0.0);
        assert_eq!(h.resample(t(5.0)), 0.0);
        assert_eq!(h.update_interval(), Duration::ZERO);
        assert_eq!(h.harvester_type(), "Disabled");
    }
}
