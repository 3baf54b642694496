//! Nursery metrics
//!
//! Simulated vital and environment readouts for the dashboard: movement,
//! temperature, humidity, air quality and sleep stats. One explicit state
//! struct owns the values; a background task steps them on the same cadence
//! the dashboard advertises.

pub mod sensors;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensors::{AirQuality, RandomWalk};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Event channel the dashboard listens on for metric updates
pub const METRICS_EVENT: &str = "metrics://update";

/// Movement step cadence
pub const MOVEMENT_TICK: Duration = Duration::from_secs(5);

/// Environment step cadence
pub const ENVIRONMENT_TICK: Duration = Duration::from_secs(30);

/// A dashboard snapshot of the nursery
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NurseryMetrics {
    /// Movements per minute
    pub movement_mpm: u32,
    pub temperature_c: i32,
    pub humidity_pct: u32,
    pub air_quality: AirQuality,
    pub sleep_started_at: DateTime<Utc>,
    pub sleep_minutes: i64,
    pub wake_ups: u32,
    pub updated_at: DateTime<Utc>,
}

/// Steps the simulated sensors and produces snapshots
pub struct MonitorSimulator {
    movement: RandomWalk,
    temperature: RandomWalk,
    humidity: RandomWalk,
    air_quality: AirQuality,
    sleep_started_at: DateTime<Utc>,
    wake_ups: u32,
    rng: StdRng,
}

impl MonitorSimulator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            movement: RandomWalk::new(31.0, 20.0, 50.0, 3.0),
            temperature: RandomWalk::new(22.0, 18.0, 26.0, 1.0),
            humidity: RandomWalk::new(40.0, 30.0, 70.0, 5.0),
            air_quality: AirQuality::Good,
            sleep_started_at: Utc::now() - ChronoDuration::minutes(4 * 60 + 40),
            wake_ups: 2,
            rng,
        }
    }

    pub fn tick_movement(&mut self) {
        self.movement.step(&mut self.rng);
    }

    pub fn tick_environment(&mut self) {
        self.temperature.step(&mut self.rng);
        self.humidity.step(&mut self.rng);
        // Air quality shifts rarely.
        if self.rng.gen_bool(0.1) {
            self.air_quality = AirQuality::roll(&mut self.rng);
        }
    }

    /// Step everything at once, e.g. for pull-to-refresh
    pub fn refresh(&mut self) {
        self.tick_movement();
        self.tick_environment();
    }

    pub fn snapshot(&self) -> NurseryMetrics {
        let now = Utc::now();
        NurseryMetrics {
            movement_mpm: self.movement.value().round() as u32,
            temperature_c: self.temperature.value().round() as i32,
            humidity_pct: self.humidity.value().round() as u32,
            air_quality: self.air_quality,
            sleep_started_at: self.sleep_started_at,
            sleep_minutes: (now - self.sleep_started_at).num_minutes(),
            wake_ups: self.wake_ups,
            updated_at: now,
        }
    }
}

impl Default for MonitorSimulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to the simulator
#[derive(Clone)]
pub struct MonitorState {
    simulator: Arc<Mutex<MonitorSimulator>>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            simulator: Arc::new(Mutex::new(MonitorSimulator::new())),
        }
    }

    pub fn snapshot(&self) -> NurseryMetrics {
        self.simulator.lock().snapshot()
    }

    pub fn refresh(&self) -> NurseryMetrics {
        let mut simulator = self.simulator.lock();
        simulator.refresh();
        simulator.snapshot()
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Step the simulation on the dashboard cadence, publishing each snapshot.
/// Runs until the owning task is dropped.
pub async fn run_simulation<F>(state: MonitorState, publish: F)
where
    F: Fn(NurseryMetrics) + Send + 'static,
{
    let mut movement = tokio::time::interval(MOVEMENT_TICK);
    let mut environment = tokio::time::interval(ENVIRONMENT_TICK);
    // The first tick of an interval fires immediately; skip it so the
    // initial values survive until the first real cadence step.
    movement.tick().await;
    environment.tick().await;

    loop {
        tokio::select! {
            _ = movement.tick() => {
                let mut simulator = state.simulator.lock();
                simulator.tick_movement();
                publish(simulator.snapshot());
            }
            _ = environment.tick() => {
                let mut simulator = state.simulator.lock();
                simulator.tick_environment();
                publish(simulator.snapshot());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MonitorSimulator {
        MonitorSimulator::with_rng(StdRng::seed_from_u64(42))
    }

    #[test]
    fn initial_snapshot_matches_the_dashboard_defaults() {
        let snapshot = seeded().snapshot();
        assert_eq!(snapshot.movement_mpm, 31);
        assert_eq!(snapshot.temperature_c, 22);
        assert_eq!(snapshot.humidity_pct, 40);
        assert_eq!(snapshot.air_quality, AirQuality::Good);
        assert_eq!(snapshot.wake_ups, 2);
        assert_eq!(snapshot.sleep_minutes, 4 * 60 + 40);
    }

    #[test]
    fn readouts_stay_plausible_over_time() {
        let mut simulator = seeded();
        for _ in 0..500 {
            simulator.refresh();
            let snapshot = simulator.snapshot();
            assert!((20..=50).contains(&snapshot.movement_mpm));
            assert!((18..=26).contains(&snapshot.temperature_c));
            assert!((30..=70).contains(&snapshot.humidity_pct));
        }
    }
}
