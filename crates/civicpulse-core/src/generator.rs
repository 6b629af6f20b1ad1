//! Synthetic sensor readings.
//!
//! Each call to [`EventGenerator::generate`] produces exactly four events
//! per zone (traffic, weather, health, agriculture) that share one
//! generation timestamp. The numbers follow simple distributions shaped
//! by the zone's static attributes:
//!
//! | Domain  | Model |
//! |---------|-------|
//! | traffic | volume scales with density and a diurnal peak; speed falls as volume rises, clamped to `[5, 60]` |
//! | weather | ~30 C base, hotter in industrial/commercial zones; rain on 10% of readings |
//! | health  | zone vulnerability perturbed by at most 0.02, clamped to `[0, 1]` |
//! | agri    | supply boosted in farm zones; price rises with logistics dependency |
//!
//! Randomness is injected so tests can run against a seeded RNG.

use civicpulse_types::{Domain, Event, Zone, ZoneType};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::payload::{AgriReading, HealthReading, TrafficReading, WeatherReading};
use crate::zones::ZoneRegistry;

/// Multiplier applied to traffic volume during peak hours.
const PEAK_MULTIPLIER: f64 = 1.0;

/// Multiplier applied to traffic volume outside peak hours.
const OFF_PEAK_MULTIPLIER: f64 = 0.6;

/// Lowest reportable average speed (km/h).
pub const MIN_SPEED: f64 = 5.0;

/// Highest reportable average speed (km/h).
pub const MAX_SPEED: f64 = 60.0;

/// Probability that a weather reading reports no rain at all.
const DRY_PROBABILITY: f64 = 0.9;

/// Largest perturbation applied to a zone's baseline vulnerability.
const VULNERABILITY_JITTER: f64 = 0.02;

/// Hour of day (UTC, 0-23) for an epoch-seconds timestamp.
pub const fn hour_of_day(ts: i64) -> i64 {
    ts.rem_euclid(86_400) / 3_600
}

/// Diurnal traffic multiplier: full volume 08:00-10:59 and 17:00-19:59.
pub const fn peak_multiplier(ts: i64) -> f64 {
    match hour_of_day(ts) {
        8..=10 | 17..=19 => PEAK_MULTIPLIER,
        _ => OFF_PEAK_MULTIPLIER,
    }
}

/// Produces one batch of domain readings per zone per tick.
#[derive(Debug, Clone)]
pub struct EventGenerator<R = SmallRng> {
    registry: ZoneRegistry,
    rng: R,
}

impl EventGenerator<SmallRng> {
    /// Create a generator with a fixed seed for reproducible runs.
    pub fn seeded(registry: ZoneRegistry, seed: u64) -> Self {
        Self::with_rng(registry, SmallRng::seed_from_u64(seed))
    }

    /// Create a generator seeded from the thread-local RNG.
    pub fn from_entropy(registry: ZoneRegistry) -> Self {
        Self::with_rng(registry, SmallRng::from_rng(&mut rand::rng()))
    }
}

impl<R: Rng> EventGenerator<R> {
    /// Create a generator around an arbitrary RNG.
    pub const fn with_rng(registry: ZoneRegistry, rng: R) -> Self {
        Self { registry, rng }
    }

    /// The registry this generator draws zones from.
    pub const fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Generate four events for every zone, all stamped with `ts`.
    pub fn generate(&mut self, ts: i64) -> Vec<Event> {
        let peak = peak_multiplier(ts);
        let mut events = Vec::with_capacity(self.registry.len().saturating_mul(4));
        for zone in self.registry.zones() {
            let payloads = [
                (Domain::Traffic, traffic_reading(zone, peak, &mut self.rng).to_payload()),
                (Domain::Weather, weather_reading(zone, &mut self.rng).to_payload()),
                (Domain::Health, health_reading(zone, &mut self.rng).to_payload()),
                (Domain::Agri, agri_reading(zone, &mut self.rng).to_payload()),
            ];
            for (domain, payload) in payloads {
                events.push(Event {
                    ts,
                    zone_id: zone.zone_id.clone(),
                    domain,
                    payload,
                });
            }
        }
        tracing::debug!(ts, count = events.len(), "Generated synthetic readings");
        events
    }
}

/// Traffic volume from density and the diurnal multiplier; speed derived
/// inversely from volume.
pub fn traffic_reading(zone: &Zone, peak: f64, rng: &mut impl Rng) -> TrafficReading {
    let base_volume = 800.0f64.mul_add(zone.pop_density, 200.0);
    let volume = base_volume * peak * rng.random_range(0.8..1.2);
    let speed = (volume / 1000.0).mul_add(-20.0, 45.0) + rng.random_range(-3.0..3.0);
    TrafficReading {
        volume,
        avg_speed: speed.clamp(MIN_SPEED, MAX_SPEED),
    }
}

/// Temperature with a heat-island offset, humidity, and occasional rain.
pub fn weather_reading(zone: &Zone, rng: &mut impl Rng) -> WeatherReading {
    let base_temp = 30.0 + rng.random_range(-1.5..1.5);
    let offset = if zone.zone_type.is_heat_island() {
        rng.random_range(0.5..1.5)
    } else {
        0.0
    };
    let humidity = 55.0 + rng.random_range(-10.0..10.0);
    let rain_mm = if rng.random_bool(DRY_PROBABILITY) {
        0.0
    } else {
        rng.random_range(0.0..15.0)
    };
    WeatherReading {
        temp_c: base_temp + offset,
        humidity,
        rain_mm,
    }
}

/// The zone's baseline vulnerability with a small perturbation.
pub fn health_reading(zone: &Zone, rng: &mut impl Rng) -> HealthReading {
    let jitter = rng.random_range(-VULNERABILITY_JITTER..VULNERABILITY_JITTER);
    HealthReading {
        baseline_vulnerability: (zone.baseline_vulnerability + jitter).clamp(0.0, 1.0),
    }
}

/// Supply boosted for farm zones; price rises with logistics dependency.
pub fn agri_reading(zone: &Zone, rng: &mut impl Rng) -> AgriReading {
    let farm_bonus = if zone.zone_type == ZoneType::Agri { 700.0 } else { 0.0 };
    let supply_units = 1000.0 + farm_bonus + rng.random_range(-120.0..120.0);
    let price_index = zone.logistics_dependency.mul_add(15.0, 100.0) + rng.random_range(-3.0..3.0);
    AgriReading {
        supply_units,
        price_index,
    }
}

#[cfg(test)]
mod tests {
    use civicpulse_types::ZoneId;

    use super::*;
    use crate::payload::{FIELD_AVG_SPEED, FIELD_VULNERABILITY, required_f64};

    /// 2026-01-01 09:00:00 UTC.
    const MORNING_PEAK: i64 = 1_767_258_000;
    /// 2026-01-01 03:00:00 UTC.
    const NIGHT: i64 = 1_767_236_400;

    #[test]
    fn peak_hours_are_inclusive_ranges() {
        assert!((peak_multiplier(MORNING_PEAK) - 1.0).abs() < f64::EPSILON);
        assert!((peak_multiplier(NIGHT) - 0.6).abs() < f64::EPSILON);
        // 10:59 is still peak, 11:00 is not.
        assert!((peak_multiplier(MORNING_PEAK + 2 * 3_600 - 1) - 1.0).abs() < f64::EPSILON);
        assert!((peak_multiplier(MORNING_PEAK + 2 * 3_600) - 0.6).abs() < f64::EPSILON);
        assert_eq!(hour_of_day(MORNING_PEAK), 9);
    }

    #[test]
    fn four_events_per_zone_share_one_timestamp() {
        let mut generator = EventGenerator::seeded(ZoneRegistry::default_city(), 7);
        let events = generator.generate(MORNING_PEAK);
        assert_eq!(events.len(), 40);
        assert!(events.iter().all(|e| e.ts == MORNING_PEAK));

        let z01: Vec<Domain> = events
            .iter()
            .filter(|e| e.zone_id == ZoneId::from("Z01"))
            .map(|e| e.domain)
            .collect();
        assert_eq!(z01, Domain::ALL.to_vec());
    }

    #[test]
    fn speed_and_vulnerability_stay_in_range() {
        let mut generator = EventGenerator::seeded(ZoneRegistry::default_city(), 99);
        for tick in 0..200 {
            let ts = NIGHT + tick * 1_800;
            for event in generator.generate(ts) {
                match event.domain {
                    Domain::Traffic => {
                        let speed = required_f64(&event.payload, FIELD_AVG_SPEED).unwrap_or(-1.0);
                        assert!((MIN_SPEED..=MAX_SPEED).contains(&speed), "speed {speed}");
                    }
                    Domain::Health => {
                        let v = required_f64(&event.payload, FIELD_VULNERABILITY).unwrap_or(-1.0);
                        assert!((0.0..=1.0).contains(&v), "vulnerability {v}");
                    }
                    Domain::Weather | Domain::Agri => {}
                }
            }
        }
    }

    #[test]
    fn vulnerability_is_clamped_at_the_edges() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut zone = ZoneRegistry::default_city().zones().first().cloned().unwrap_or_else(|| {
            Zone {
                zone_id: ZoneId::from("T"),
                name: String::new(),
                zone_type: ZoneType::Mixed,
                pop_density: 0.5,
                baseline_vulnerability: 0.5,
                logistics_dependency: 0.5,
            }
        });
        zone.baseline_vulnerability = 1.0;
        for _ in 0..100 {
            let v = health_reading(&zone, &mut rng).baseline_vulnerability;
            assert!(v <= 1.0 && v >= 0.98);
        }
        zone.baseline_vulnerability = 0.0;
        for _ in 0..100 {
            let v = health_reading(&zone, &mut rng).baseline_vulnerability;
            assert!(v >= 0.0 && v <= 0.02);
        }
    }

    #[test]
    fn rain_is_mostly_absent() {
        let registry = ZoneRegistry::default_city();
        let mut rng = SmallRng::seed_from_u64(2024);
        let Some(zone) = registry.zones().first() else {
            return;
        };
        let samples = 5_000;
        let dry = (0..samples)
            .filter(|_| weather_reading(zone, &mut rng).rain_mm == 0.0)
            .count();
        // Expect ~90% dry readings.
        assert!(dry > 4_300 && dry < 4_700, "dry = {dry}");
    }

    #[test]
    fn farm_zones_have_higher_supply() {
        let registry = ZoneRegistry::default_city();
        let mut rng = SmallRng::seed_from_u64(5);
        let farm = registry.get(&ZoneId::from("Z10"));
        let city = registry.get(&ZoneId::from("Z01"));
        if let (Some(farm), Some(city)) = (farm, city) {
            let farm_supply = agri_reading(farm, &mut rng).supply_units;
            let city_supply = agri_reading(city, &mut rng).supply_units;
            assert!(farm_supply > 1_500.0);
            assert!(city_supply < 1_200.0);
        }
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let mut a = EventGenerator::seeded(ZoneRegistry::default_city(), 11);
        let mut b = EventGenerator::seeded(ZoneRegistry::default_city(), 11);
        assert_eq!(a.generate(NIGHT), b.generate(NIGHT));
    }
}
