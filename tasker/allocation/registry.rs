//! Name-keyed factories for allocators, evaluators and generators.
//!
//! Built once at scenario load, then shared read-only.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    allocator::{
        Allocator, GreedyIsolatedAllocator, GreedyPriorityAllocator, GreedyProfitAllocator,
        GreedyValueAllocator, OptimalProfitAllocator, ScriptAllocator, SimpleAllocator,
    },
    error::TaskerError,
    evaluator::{DistanceEvaluator, Evaluator, InterceptTimeEvaluator, ScriptEvaluator, SimpleEvaluator},
    generator::{Generator, ScriptGenerator, SimpleGenerator},
    script::ScriptScope,
};

type AllocatorFactory = Arc<dyn Fn() -> Box<dyn Allocator> + Send + Sync>;
type EvaluatorFactory = Arc<dyn Fn() -> Box<dyn Evaluator> + Send + Sync>;
type GeneratorFactory = Arc<dyn Fn() -> Box<dyn Generator> + Send + Sync>;

/// Which strategy fills a slot: a registered name or a script function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategySelection {
    /// Built-in or registered strategy name.
    Named(String),
    /// Script function name.
    Custom {
        /// Function to bind.
        custom: String,
    },
}

impl StrategySelection {
    /// Selects a registered strategy.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Selects a script function.
    #[must_use]
    pub fn custom(function: impl Into<String>) -> Self {
        Self::Custom {
            custom: function.into(),
        }
    }
}

impl fmt::Display for StrategySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Custom { custom } => write!(f, "custom {custom}"),
        }
    }
}

/// Registry of strategy factories.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    allocators: IndexMap<String, AllocatorFactory>,
    evaluators: IndexMap<String, EvaluatorFactory>,
    generators: IndexMap<String, GeneratorFactory>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("allocators", &self.allocator_names())
            .field("evaluators", &self.evaluator_names())
            .field("generators", &self.generator_names())
            .finish()
    }
}

impl StrategyRegistry {
    /// Registry holding the built-in strategies.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.register_allocator("simple", || Box::<SimpleAllocator>::default());
        registry.register_allocator("greedy_isolated", || Box::<GreedyIsolatedAllocator>::default());
        registry.register_allocator("greedy_priority", || Box::<GreedyPriorityAllocator>::default());
        registry.register_allocator("greedy_value", || Box::<GreedyValueAllocator>::default());
        registry.register_allocator("greedy_profit", || Box::<GreedyProfitAllocator>::default());
        registry.register_allocator("optimal_profit", || Box::<OptimalProfitAllocator>::default());

        registry.register_evaluator("simple", || Box::new(SimpleEvaluator));
        registry.register_evaluator("distance", || Box::new(DistanceEvaluator));
        registry.register_evaluator("intercept_time", || Box::new(InterceptTimeEvaluator));

        registry.register_generator("simple_weapon", || Box::new(SimpleGenerator::weapon()));
        registry.register_generator("simple_jammer", || Box::new(SimpleGenerator::jammer()));
        registry.register_generator("simple_sensor", || Box::new(SimpleGenerator::sensor()));
        registry
    }

    /// Registers or replaces an allocator factory.
    pub fn register_allocator(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Allocator> + Send + Sync + 'static,
    ) {
        self.allocators.insert(name.into(), Arc::new(factory));
    }

    /// Registers or replaces an evaluator factory.
    pub fn register_evaluator(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Evaluator> + Send + Sync + 'static,
    ) {
        self.evaluators.insert(name.into(), Arc::new(factory));
    }

    /// Registers or replaces a generator factory.
    pub fn register_generator(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Generator> + Send + Sync + 'static,
    ) {
        self.generators.insert(name.into(), Arc::new(factory));
    }

    /// Builds the selected allocator.
    pub fn create_allocator(
        &self,
        selection: &StrategySelection,
        scope: Option<&ScriptScope>,
    ) -> Result<Box<dyn Allocator>, TaskerError> {
        match selection {
            StrategySelection::Named(name) => self
                .allocators
                .get(name)
                .map(|factory| factory())
                .ok_or_else(|| TaskerError::UnknownAllocator(name.clone())),
            StrategySelection::Custom { custom } => {
                let scope = scope.ok_or_else(|| TaskerError::NoScriptScope(custom.clone()))?;
                Ok(Box::new(ScriptAllocator::new(scope, custom)?))
            }
        }
    }

    /// Builds the selected evaluator.
    pub fn create_evaluator(
        &self,
        selection: &StrategySelection,
        scope: Option<&ScriptScope>,
    ) -> Result<Box<dyn Evaluator>, TaskerError> {
        match selection {
            StrategySelection::Named(name) => self
                .evaluators
                .get(name)
                .map(|factory| factory())
                .ok_or_else(|| TaskerError::UnknownEvaluator(name.clone())),
            StrategySelection::Custom { custom } => {
                let scope = scope.ok_or_else(|| TaskerError::NoScriptScope(custom.clone()))?;
                Ok(Box::new(ScriptEvaluator::new(scope, custom)?))
            }
        }
    }

    /// Builds the selected generator.
    pub fn create_generator(
        &self,
        selection: &StrategySelection,
        scope: Option<&ScriptScope>,
    ) -> Result<Box<dyn Generator>, TaskerError> {
        match selection {
            StrategySelection::Named(name) => self
                .generators
                .get(name)
                .map(|factory| factory())
                .ok_or_else(|| TaskerError::UnknownGenerator(name.clone())),
            StrategySelection::Custom { custom } => {
                let scope = scope.ok_or_else(|| TaskerError::NoScriptScope(custom.clone()))?;
                Ok(Box::new(ScriptGenerator::new(scope, custom)?))
            }
        }
    }

    /// Registered allocator names, in registration order.
    #[must_use]
    pub fn allocator_names(&self) -> Vec<&str> {
        self.allocators.keys().map(String::as_str).collect()
    }

    /// Registered evaluator names.
    #[must_use]
    pub fn evaluator_names(&self) -> Vec<&str> {
        self.evaluators.keys().map(String::as_str).collect()
    }

    /// Registered generator names.
    #[must_use]
    pub fn generator_names(&self) -> Vec<&str> {
        self.generators.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptFunction;

    #[test]
    fn builtins_create_by_name() {
        let registry = StrategyRegistry::with_builtins();
        for name in registry.allocator_names() {
            let allocator = registry
                .create_allocator(&StrategySelection::named(name), None)
                .unwrap();
            assert_eq!(allocator.name(), name);
        }
        let evaluator = registry
            .create_evaluator(&StrategySelection::named("distance"), None)
            .unwrap();
        assert_eq!(evaluator.name(), "distance");
        let generator = registry
            .create_generator(&StrategySelection::named("simple_jammer"), None)
            .unwrap();
        assert_eq!(generator.name(), "simple_jammer");
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        let registry = StrategyRegistry::with_builtins();
        assert_eq!(
            registry
                .create_allocator(&StrategySelection::named("auction"), None)
                .err(),
            Some(TaskerError::UnknownAllocator("auction".into()))
        );
        assert!(registry
            .create_generator(&StrategySelection::named("nope"), None)
            .is_err());
    }

    #[test]
    fn custom_selection_needs_a_scope() {
        let registry = StrategyRegistry::with_builtins();
        let selection = StrategySelection::custom("score");
        assert!(matches!(
            registry.create_evaluator(&selection, None),
            Err(TaskerError::NoScriptScope(_))
        ));
        let scope = ScriptScope::new("global").with_function("score", ScriptFunction::evaluate(|_, _| 1.0));
        let evaluator = registry.create_evaluator(&selection, Some(&scope)).unwrap();
        assert_eq!(evaluator.name(), "score");
    }

    #[test]
    fn selection_parses_from_toml_shapes() {
        #[derive(Deserialize)]
        struct Slot {
            slot: StrategySelection,
        }
        let named: Slot = toml::from_str(r#"slot = "greedy_value""#).unwrap();
        assert_eq!(named.slot, StrategySelection::named("greedy_value"));
        let custom: Slot = toml::from_str(r#"slot = { custom = "my_alloc" }"#).unwrap();
        assert_eq!(custom.slot, StrategySelection::custom("my_alloc"));
    }
}
