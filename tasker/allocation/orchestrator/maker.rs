use std::sync::Arc;

use serde_json::json;
use shared_logging::LogLevel;
use tracing::warn;

use crate::{
    allocator::Allocator,
    config::{AllocatorPass, TaskerConfig},
    error::TaskerError,
    model::PlatformIndex,
    registry::{StrategyRegistry, StrategySelection},
    script::ScriptScope,
    telemetry::{TaskerTelemetry, CONFIG_DEGRADED},
};

use super::{collaborators::Collaborators, QuantumTasker, ScopedAllocator, Strategies};

/// Builder used to configure a [`QuantumTasker`].
#[derive(Debug, Clone)]
pub struct QuantumTaskerBuilder {
    owner: PlatformIndex,
    collaborators: Collaborators,
    registry: Option<Arc<StrategyRegistry>>,
    scope: Option<Arc<ScriptScope>>,
    config: TaskerConfig,
    telemetry: Option<TaskerTelemetry>,
}

impl QuantumTaskerBuilder {
    /// Creates a new builder for the tasker on platform `owner`.
    #[must_use]
    pub fn new(owner: PlatformIndex, collaborators: Collaborators) -> Self {
        Self {
            owner,
            collaborators,
            registry: None,
            scope: None,
            config: TaskerConfig::default(),
            telemetry: None,
        }
    }

    /// Uses `registry` instead of the built-in strategies.
    #[must_use]
    pub fn registry(mut self, registry: Arc<StrategyRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Scope searched for `custom` strategy functions.
    #[must_use]
    pub fn script_scope(mut self, scope: Arc<ScriptScope>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Applies a configuration.
    #[must_use]
    pub fn config(mut self, config: TaskerConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches telemetry used by the tasker.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TaskerTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Finalizes the configuration.
    ///
    /// Strategies that cannot be created are reported and left unset; the tasker still
    /// runs with whatever slots were filled.
    #[must_use]
    pub fn build(self) -> QuantumTasker {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(StrategyRegistry::with_builtins()));
        let mut degraded = Degraded {
            telemetry: self.telemetry.as_ref(),
            errors: Vec::new(),
        };
        let scope = self.scope.as_deref();

        let generator = self.config.generator.as_ref().and_then(|selection| {
            degraded.absorb("generator", selection, registry.create_generator(selection, scope))
        });
        let evaluator = self.config.evaluator.as_ref().and_then(|selection| {
            degraded.absorb("evaluator", selection, registry.create_evaluator(selection, scope))
        });

        let create = |selection: &StrategySelection| registry.create_allocator(selection, scope);
        let mut primary = Vec::new();
        for entry in self.config.allocators_for(AllocatorPass::Primary) {
            if let Some(allocator) = degraded.absorb("allocator", &entry.strategy, create(&entry.strategy)) {
                primary.push(ScopedAllocator {
                    allocator,
                    task_type: entry.task_type.clone(),
                });
            }
        }
        let extra_tasks = degraded.extra_pass(&self.config, AllocatorPass::ExtraTasks, create);
        let extra_assets = degraded.extra_pass(&self.config, AllocatorPass::ExtraAssets, create);
        let errors = degraded.errors;

        let strategies = Strategies {
            generator,
            evaluator,
            primary,
            extra_tasks,
            extra_assets,
            policy: self.config.reallocation_strategy.policy(),
        };
        QuantumTasker::from_parts(
            self.owner,
            self.collaborators,
            self.config,
            strategies,
            errors,
            self.telemetry,
        )
    }
}

struct Degraded<'a> {
    telemetry: Option<&'a TaskerTelemetry>,
    errors: Vec<TaskerError>,
}

impl Degraded<'_> {
    fn absorb<T>(
        &mut self,
        slot: &str,
        selection: &StrategySelection,
        result: Result<T, TaskerError>,
    ) -> Option<T> {
        match result {
            Ok(strategy) => Some(strategy),
            Err(err) => {
                warn!(slot, %selection, error = %err, "strategy slot left unset");
                self.report(slot, selection, err);
                None
            }
        }
    }

    /// First allocator configured for an extra pass; further entries and task-type scopes
    /// are reported and ignored.
    fn extra_pass(
        &mut self,
        config: &TaskerConfig,
        pass: AllocatorPass,
        create: impl Fn(&StrategySelection) -> Result<Box<dyn Allocator>, TaskerError>,
    ) -> Option<Box<dyn Allocator>> {
        let mut entries = config.allocators_for(pass);
        let first = entries.next()?;
        for ignored in entries {
            warn!(?pass, selection = %ignored.strategy, "extra allocator ignored");
            self.report(
                "allocator",
                &ignored.strategy,
                TaskerError::Config(format!("only one {pass:?} allocator is used")),
            );
        }
        if first.task_type.is_some() {
            warn!(?pass, "task_type ignored on extra pass");
            self.report(
                "allocator",
                &first.strategy,
                TaskerError::Config(format!("task_type applies to primary allocators only, not {pass:?}")),
            );
        }
        self.absorb("allocator", &first.strategy, create(&first.strategy))
    }

    fn report(&mut self, slot: &str, selection: &StrategySelection, err: TaskerError) {
        if let Some(tel) = self.telemetry {
            let payload = json!({
                "slot": slot,
                "selection": selection.to_string(),
                "error": err.to_string(),
            });
            let _ = tel.log(0.0, LogLevel::Error, CONFIG_DEGRADED, payload.clone());
            let _ = tel.event(0.0, CONFIG_DEGRADED, payload);
        }
        self.errors.push(err);
    }
}
