use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::telemetry::{Battery, FireDetection, Location, Movement, TelemetryReading};

const MOVEMENT_RANGE: f64 = 0.0005;
const BATTERY_DRAIN_PER_READ: f64 = 0.1;
const FIRE_PROBABILITY: f64 = 0.2;

/// Stand-in for a real drone link: a random walk around the starting point.
pub struct DroneSimulator {
    reading: TelemetryReading,
    rng: StdRng,
}

impl DroneSimulator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            reading: TelemetryReading {
                drone_id: Some("DRONE_001".to_string()),
                location: Location { lat: 40.95, lon: 24.5, altitude: 50.2 },
                movement: Movement { speed: 5.3, heading: 120.5 },
                battery: Battery { percentage: 78.0, voltage: 11.1 },
                fire_detection: FireDetection { detected: false, confidence: 0.0, temperature: 0.0 },
            },
            rng,
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> &TelemetryReading {
        &self.reading
    }

    /// Advances the walk by one read and returns the new reading.
    pub fn next_reading(&mut self) -> TelemetryReading {
        let rng = &mut self.rng;
        let r = &mut self.reading;

        r.location.lat += rng.gen_range(-MOVEMENT_RANGE..MOVEMENT_RANGE);
        r.location.lon += rng.gen_range(-MOVEMENT_RANGE..MOVEMENT_RANGE);
        r.location.altitude = rng.gen_range(45.0..55.0);
        r.movement.speed = rng.gen_range(4.0..6.0);
        r.battery.percentage = (r.battery.percentage - BATTERY_DRAIN_PER_READ).max(0.0);

        let detected = rng.gen_bool(FIRE_PROBABILITY);
        r.fire_detection.detected = detected;
        r.fire_detection.confidence = if detected { rng.gen_range(0.7..0.95) } else { 0.0 };
        r.fire_detection.temperature = if detected { rng.gen_range(200.0..300.0) } else { 0.0 };

        r.clone()
    }
}

impl Default for DroneSimulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_stays_within_bounds() {
        let mut sim = DroneSimulator::seeded(7);
        let mut previous = sim.current().clone();
        for _ in 0..500 {
            let r = sim.next_reading();
            assert!((r.location.lat - previous.location.lat).abs() <= MOVEMENT_RANGE);
            assert!((r.location.lon - previous.location.lon).abs() <= MOVEMENT_RANGE);
            assert!((45.0..55.0).contains(&r.location.altitude));
            assert!((4.0..6.0).contains(&r.movement.speed));
            if r.fire_detection.detected {
                assert!((0.7..0.95).contains(&r.fire_detection.confidence));
            } else {
                assert_eq!(r.fire_detection.confidence, 0.0);
                assert_eq!(r.fire_detection.temperature, 0.0);
            }
            previous = r;
        }
    }

    #[test]
    fn battery_drains_but_never_goes_negative() {
        let mut sim = DroneSimulator::seeded(1);
        let first = sim.next_reading().battery.percentage;
        assert!((first - 77.9).abs() < 1e-9);
        for _ in 0..1000 {
            sim.next_reading();
        }
        assert_eq!(sim.current().battery.percentage, 0.0);
    }
}
