//! Task generation strategies turning perceived threats into candidate tasks.

use std::fmt;

use crate::{
    error::TaskerError,
    model::{Asset, ResourceKind, SimTime, Task, TaskResource, TrackSnapshot},
    script::{GenerateFn, ScriptFunction, ScriptScope, ScriptSignature},
};

/// Produces the candidate task list once per cycle.
pub trait Generator: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    /// Generates tasks from the current threats and assets.
    fn generate_tasks(&self, time: SimTime, threats: &[TrackSnapshot], assets: &[Asset]) -> Vec<Task>;
}

/// One task per threat, requiring a fixed resource kind, at priority 1.
#[derive(Debug, Clone, Copy)]
pub struct SimpleGenerator {
    kind: ResourceKind,
}

impl SimpleGenerator {
    /// Weapon tasks.
    #[must_use]
    pub const fn weapon() -> Self {
        Self {
            kind: ResourceKind::Weapon,
        }
    }

    /// Jammer tasks.
    #[must_use]
    pub const fn jammer() -> Self {
        Self {
            kind: ResourceKind::Jammer,
        }
    }

    /// Sensor tasks.
    #[must_use]
    pub const fn sensor() -> Self {
        Self {
            kind: ResourceKind::Sensor,
        }
    }

    /// Resource kind requested by generated tasks.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn resource(&self) -> TaskResource {
        match self.kind {
            ResourceKind::Weapon => TaskResource::weapon(1),
            ResourceKind::Jammer => TaskResource::jammer(0.0, 0.0),
            ResourceKind::Sensor => TaskResource::sensor(""),
            other => TaskResource::of(other),
        }
    }
}

impl Generator for SimpleGenerator {
    fn name(&self) -> &str {
        match self.kind {
            ResourceKind::Weapon => "simple_weapon",
            ResourceKind::Jammer => "simple_jammer",
            ResourceKind::Sensor => "simple_sensor",
            _ => "simple",
        }
    }

    fn generate_tasks(&self, _: SimTime, threats: &[TrackSnapshot], _: &[Asset]) -> Vec<Task> {
        threats
            .iter()
            .map(|track| Task::against(track, self.resource()).with_priority(1.0))
            .collect()
    }
}

/// Forwards generation to a `(threats, assets)` script function.
pub struct ScriptGenerator {
    function_name: String,
    function: GenerateFn,
}

impl ScriptGenerator {
    /// Binds to `function_name`, searching `scope` outward.
    pub fn new(scope: &ScriptScope, function_name: &str) -> Result<Self, TaskerError> {
        match scope.resolve(function_name, ScriptSignature::Generate)? {
            ScriptFunction::Generate(function) => Ok(Self {
                function_name: function_name.to_string(),
                function,
            }),
            other => Err(TaskerError::ScriptSignature {
                name: function_name.to_string(),
                expected: ScriptSignature::Generate,
                found: other.signature(),
            }),
        }
    }
}

impl fmt::Debug for ScriptGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptGenerator")
            .field("function", &self.function_name)
            .finish()
    }
}

impl Generator for ScriptGenerator {
    fn name(&self) -> &str {
        &self.function_name
    }

    fn generate_tasks(&self, _: SimTime, threats: &[TrackSnapshot], assets: &[Asset]) -> Vec<Task> {
        (self.function)(threats, assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vec3;

    fn threats() -> Vec<TrackSnapshot> {
        vec![
            TrackSnapshot::located(1, "bandit-1", 0.0, Vec3::ZERO),
            TrackSnapshot::located(2, "bandit-2", 0.0, Vec3::ZERO),
        ]
    }

    #[test]
    fn simple_generators_emit_one_task_per_threat() {
        for (generator, kind) in [
            (SimpleGenerator::weapon(), ResourceKind::Weapon),
            (SimpleGenerator::jammer(), ResourceKind::Jammer),
            (SimpleGenerator::sensor(), ResourceKind::Sensor),
        ] {
            let tasks = generator.generate_tasks(0.0, &threats(), &[]);
            assert_eq!(tasks.len(), 2);
            assert!(tasks.iter().all(|task| task.resource.kind == kind));
            assert!(tasks.iter().all(|task| (task.priority - 1.0).abs() < f64::EPSILON));
            assert_eq!(tasks[1].target.as_deref(), Some("bandit-2"));
            assert_eq!(tasks[1].track_id, Some(2));
        }
    }

    #[test]
    fn regenerated_tasks_keep_their_ids() {
        let generator = SimpleGenerator::weapon();
        let first = generator.generate_tasks(0.0, &threats(), &[]);
        let second = generator.generate_tasks(5.0, &threats(), &[]);
        assert_eq!(first[0].id, second[0].id);
        assert_ne!(first[0].id, first[1].id);
    }

    #[test]
    fn script_generator_receives_both_arrays() {
        let scope = ScriptScope::new("global").with_function(
            "pairs",
            ScriptFunction::generate(|threats, assets| {
                threats
                    .iter()
                    .take(assets.len())
                    .map(|track| Task::against(track, TaskResource::of(ResourceKind::Uplink)))
                    .collect()
            }),
        );
        let generator = ScriptGenerator::new(&scope, "pairs").unwrap();
        let assets = [Asset::new(9, "relay", Vec3::ZERO)];
        let tasks = generator.generate_tasks(0.0, &threats(), &assets);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_type, "UPLINK");
    }
}
