use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::SimTime;

/// Cartesian vector in metres (positions) or metres per second (velocities).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a vector.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x.mul_add(other.x, self.y.mul_add(other.y, self.z * other.z))
    }

    /// Euclidean length.
    #[must_use]
    pub fn magnitude(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (other - self).magnitude()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Identification friend-or-foe classification of a track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Iff {
    /// Not yet classified.
    #[default]
    Unknown,
    /// Friendly.
    Friend,
    /// Neutral.
    Neutral,
    /// Hostile.
    Foe,
}

impl Iff {
    /// Friendly and neutral tracks are non-hostile; unknown tracks are kept.
    #[must_use]
    pub const fn is_ally(self) -> bool {
        matches!(self, Self::Friend | Self::Neutral)
    }
}

/// Perceived threat track as handed over by the perception and track collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    /// Track identifier, unique per perceiving platform.
    pub track_id: u64,
    /// Truth name of the tracked target, when known.
    #[serde(default)]
    pub target_name: Option<String>,
    /// Time of the last update.
    pub time: SimTime,
    /// Last known position.
    #[serde(default)]
    pub position: Option<Vec3>,
    /// Last known velocity.
    #[serde(default)]
    pub velocity: Option<Vec3>,
    /// Classification.
    #[serde(default)]
    pub iff: Iff,
}

impl TrackSnapshot {
    /// Creates a located track without velocity.
    #[must_use]
    pub fn located(track_id: u64, target_name: impl Into<String>, time: SimTime, position: Vec3) -> Self {
        Self {
            track_id,
            target_name: Some(target_name.into()),
            time,
            position: Some(position),
            velocity: None,
            iff: Iff::Unknown,
        }
    }

    /// Adds a velocity.
    #[must_use]
    pub const fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Sets the classification.
    #[must_use]
    pub const fn with_iff(mut self, iff: Iff) -> Self {
        self.iff = iff;
        self
    }

    /// True when the track carries a position.
    #[must_use]
    pub const fn is_located(&self) -> bool {
        self.position.is_some()
    }

    /// True when the track carries a velocity.
    #[must_use]
    pub const fn is_speed_valid(&self) -> bool {
        self.velocity.is_some()
    }

    /// Dead-reckons the position to `time`. Tracks without velocity stay where they were.
    #[must_use]
    pub fn extrapolate(&self, time: SimTime) -> Option<Vec3> {
        let position = self.position?;
        Some(match self.velocity {
            Some(velocity) => position + velocity * (time - self.time),
            None => position,
        })
    }

    /// Display label: target name or the numeric track id.
    #[must_use]
    pub fn label(&self) -> String {
        self.target_name
            .clone()
            .unwrap_or_else(|| format!("track-{}", self.track_id))
    }
}
