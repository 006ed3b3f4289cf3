//! Scoring strategies for single (task, asset) pairings.

/// Closing-geometry intercept solver.
pub mod intercept;

use std::fmt;

use crate::{
    error::TaskerError,
    model::{Asset, SimTime, Task, TrackSnapshot},
    script::{EvaluateFn, ScriptFunction, ScriptScope, ScriptSignature},
};

/// Scores a pairing. Implementations are pure: the same inputs give the same score.
pub trait Evaluator: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    /// Scores assigning `task` to `asset`; `track` is the task's resolved target track.
    fn evaluate(&self, time: SimTime, task: &Task, asset: &Asset, track: Option<&TrackSnapshot>) -> f64;
}

/// Uniform score of 1, so profit reduces to task priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleEvaluator;

impl Evaluator for SimpleEvaluator {
    fn name(&self) -> &str {
        "simple"
    }

    fn evaluate(&self, _: SimTime, _: &Task, _: &Asset, _: Option<&TrackSnapshot>) -> f64 {
        1.0
    }
}

/// Inverse distance from the asset to the extrapolated track.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceEvaluator;

impl DistanceEvaluator {
    /// Score for co-located pairs.
    pub const COINCIDENT_SCORE: f64 = 100.0;
}

impl Evaluator for DistanceEvaluator {
    fn name(&self) -> &str {
        "distance"
    }

    #[allow(clippy::float_cmp)]
    fn evaluate(&self, time: SimTime, _: &Task, asset: &Asset, track: Option<&TrackSnapshot>) -> f64 {
        let Some(location) = track.and_then(|track| track.extrapolate(time)) else {
            return 0.0;
        };
        let distance = location.distance(asset.position);
        if distance == 0.0 {
            Self::COINCIDENT_SCORE
        } else {
            1.0 / distance
        }
    }
}

/// Inverse of the earliest intercept time from the asset to the track.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterceptTimeEvaluator;

impl Evaluator for InterceptTimeEvaluator {
    fn name(&self) -> &str {
        "intercept_time"
    }

    fn evaluate(&self, time: SimTime, _: &Task, asset: &Asset, track: Option<&TrackSnapshot>) -> f64 {
        let Some(track) = track.filter(|track| track.is_located() && track.is_speed_valid()) else {
            return 0.0;
        };
        let (Some(location), Some(velocity)) = (track.extrapolate(time), track.velocity) else {
            return 0.0;
        };
        intercept::intercept_time(asset.position, asset.speed(), location, velocity)
            .map_or(0.0, |t| 1.0 / t)
    }
}

/// Forwards scoring to a `(task, asset)` script function.
pub struct ScriptEvaluator {
    function_name: String,
    function: EvaluateFn,
}

impl ScriptEvaluator {
    /// Binds to `function_name`, searching `scope` outward. Fails if absent or mistyped.
    pub fn new(scope: &ScriptScope, function_name: &str) -> Result<Self, TaskerError> {
        match scope.resolve(function_name, ScriptSignature::Evaluate)? {
            ScriptFunction::Evaluate(function) => Ok(Self {
                function_name: function_name.to_string(),
                function,
            }),
            other => Err(TaskerError::ScriptSignature {
                name: function_name.to_string(),
                expected: ScriptSignature::Evaluate,
                found: other.signature(),
            }),
        }
    }
}

impl fmt::Debug for ScriptEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptEvaluator")
            .field("function", &self.function_name)
            .finish()
    }
}

impl Evaluator for ScriptEvaluator {
    fn name(&self) -> &str {
        &self.function_name
    }

    fn evaluate(&self, _: SimTime, task: &Task, asset: &Asset, _: Option<&TrackSnapshot>) -> f64 {
        (self.function)(task, asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResourceKind, TaskResource, Vec3};

    fn task() -> Task {
        Task::new(Some("bandit".into()), "WEAPON", TaskResource::of(ResourceKind::Weapon))
    }

    #[test]
    fn distance_scores() {
        let asset = Asset::new(1, "a", Vec3::ZERO);
        let track = TrackSnapshot::located(1, "bandit", 0.0, Vec3::new(0.0, 0.0, 0.0))
            .with_velocity(Vec3::new(10.0, 0.0, 0.0));
        let evaluator = DistanceEvaluator;
        assert_eq!(evaluator.evaluate(0.0, &task(), &asset, Some(&track)), 100.0);
        let later = evaluator.evaluate(2.0, &task(), &asset, Some(&track));
        assert!((later - 0.05).abs() < 1e-12);
        assert_eq!(evaluator.evaluate(2.0, &task(), &asset, None), 0.0);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let asset = Asset::new(1, "a", Vec3::new(3.0, 4.0, 0.0)).with_velocity(Vec3::new(200.0, 0.0, 0.0));
        let track = TrackSnapshot::located(1, "bandit", 0.0, Vec3::new(5000.0, 0.0, 0.0))
            .with_velocity(Vec3::new(-50.0, 0.0, 0.0));
        for evaluator in [&DistanceEvaluator as &dyn Evaluator, &InterceptTimeEvaluator] {
            let first = evaluator.evaluate(1.0, &task(), &asset, Some(&track));
            let second = evaluator.evaluate(1.0, &task(), &asset, Some(&track));
            assert_eq!(first.to_bits(), second.to_bits());
        }
    }

    #[test]
    fn intercept_requires_velocity() {
        let asset = Asset::new(1, "a", Vec3::ZERO).with_velocity(Vec3::new(100.0, 0.0, 0.0));
        let located = TrackSnapshot::located(1, "bandit", 0.0, Vec3::new(1000.0, 0.0, 0.0));
        assert_eq!(InterceptTimeEvaluator.evaluate(0.0, &task(), &asset, Some(&located)), 0.0);
        let moving = located.with_velocity(Vec3::new(-100.0, 0.0, 0.0));
        let score = InterceptTimeEvaluator.evaluate(0.0, &task(), &asset, Some(&moving));
        assert!((score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn script_evaluator_binds_at_construction() {
        let scope = ScriptScope::new("global")
            .with_function("by_priority", ScriptFunction::evaluate(|task, _| task.priority * 2.0))
            .with_function("wrong", ScriptFunction::generate(|_, _| Vec::new()));
        let evaluator = ScriptEvaluator::new(&scope, "by_priority").unwrap();
        let asset = Asset::new(1, "a", Vec3::ZERO);
        assert_eq!(evaluator.evaluate(0.0, &task().with_priority(3.0), &asset, None), 6.0);
        assert!(ScriptEvaluator::new(&scope, "wrong").is_err());
        assert!(ScriptEvaluator::new(&scope, "absent").is_err());
    }
}
