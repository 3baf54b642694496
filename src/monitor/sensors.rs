//! Simulated sensor value generators
//!
//! Bounded random walks: each step nudges the value by a uniform delta and
//! clamps it to the sensor's plausible range.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A value that drifts within fixed bounds
#[derive(Debug, Clone)]
pub struct RandomWalk {
    value: f64,
    min: f64,
    max: f64,
    max_step: f64,
}

impl RandomWalk {
    pub fn new(value: f64, min: f64, max: f64, max_step: f64) -> Self {
        Self {
            value: value.clamp(min, max),
            min,
            max,
            max_step,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn step(&mut self, rng: &mut impl Rng) -> f64 {
        let delta = rng.gen_range(-self.max_step..=self.max_step);
        self.value = (self.value + delta).clamp(self.min, self.max);
        self.value
    }
}

/// Air quality readout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AirQuality {
    Good,
    Fair,
    Poor,
}

impl AirQuality {
    pub fn roll(rng: &mut impl Rng) -> Self {
        match rng.gen_range(0..3) {
            0 => AirQuality::Good,
            1 => AirQuality::Fair,
            _ => AirQuality::Poor,
        }
    }
}
