//! Host-side bridge for user-authored strategy functions.
//!
//! Script functions live in named scopes. Lookups start at the local scope and walk outward
//! through parents, the way a nested script context resolves globals.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::TaskerError,
    matrix::Grid,
    model::{Asset, Task, TrackSnapshot},
};

/// `(task, asset) -> score`
pub type EvaluateFn = Arc<dyn Fn(&Task, &Asset) -> f64 + Send + Sync>;
/// `(threats, assets) -> tasks`
pub type GenerateFn = Arc<dyn Fn(&[TrackSnapshot], &[Asset]) -> Vec<Task> + Send + Sync>;
/// `(values, assets, tasks) -> asset column => task row`
pub type AllocateFn = Arc<dyn Fn(&Grid, &[Asset], &[Task]) -> IndexMap<usize, usize> + Send + Sync>;

/// Shape of a script function, checked when a strategy binds to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptSignature {
    /// `(Task, Asset) -> double`
    Evaluate,
    /// `(Array<Track>, Array<Asset>) -> Array<Task>`
    Generate,
    /// `(Array<Array<double>>, Array<Asset>, Array<Task>) -> Map<int, int>`
    Allocate,
}

impl fmt::Display for ScriptSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Evaluate => "(Task, Asset) -> double",
            Self::Generate => "(Array<Track>, Array<Asset>) -> Array<Task>",
            Self::Allocate => "(Array<Array<double>>, Array<Asset>, Array<Task>) -> Map<int, int>",
        })
    }
}

/// A callable registered in a script scope.
#[derive(Clone)]
pub enum ScriptFunction {
    /// Scoring function.
    Evaluate(EvaluateFn),
    /// Task generation function.
    Generate(GenerateFn),
    /// Allocation function.
    Allocate(AllocateFn),
}

impl ScriptFunction {
    /// Wraps a scoring closure.
    pub fn evaluate(f: impl Fn(&Task, &Asset) -> f64 + Send + Sync + 'static) -> Self {
        Self::Evaluate(Arc::new(f))
    }

    /// Wraps a generation closure.
    pub fn generate(
        f: impl Fn(&[TrackSnapshot], &[Asset]) -> Vec<Task> + Send + Sync + 'static,
    ) -> Self {
        Self::Generate(Arc::new(f))
    }

    /// Wraps an allocation closure.
    pub fn allocate(
        f: impl Fn(&Grid, &[Asset], &[Task]) -> IndexMap<usize, usize> + Send + Sync + 'static,
    ) -> Self {
        Self::Allocate(Arc::new(f))
    }

    /// The function's signature.
    #[must_use]
    pub const fn signature(&self) -> ScriptSignature {
        match self {
            Self::Evaluate(_) => ScriptSignature::Evaluate,
            Self::Generate(_) => ScriptSignature::Generate,
            Self::Allocate(_) => ScriptSignature::Allocate,
        }
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptFunction({})", self.signature())
    }
}

/// Named scope of script functions with an optional enclosing scope.
#[derive(Debug, Clone, Default)]
pub struct ScriptScope {
    name: String,
    functions: IndexMap<String, ScriptFunction>,
    parent: Option<Arc<ScriptScope>>,
}

impl ScriptScope {
    /// Creates a root scope.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: IndexMap::new(),
            parent: None,
        }
    }

    /// Creates a scope nested inside `parent`.
    #[must_use]
    pub fn nested(name: impl Into<String>, parent: Arc<Self>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new(name)
        }
    }

    /// Registers a function, replacing any local function of the same name.
    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>, function: ScriptFunction) -> Self {
        self.define(name, function);
        self
    }

    /// Registers a function in place.
    pub fn define(&mut self, name: impl Into<String>, function: ScriptFunction) {
        self.functions.insert(name.into(), function);
    }

    /// Scope name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finds `name` here or in the nearest enclosing scope that defines it.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ScriptFunction> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(function) = current.functions.get(name) {
                return Some(function);
            }
            scope = current.parent.as_deref();
        }
        None
    }

    /// Finds `name` and checks it has the `expected` signature.
    pub fn resolve(&self, name: &str, expected: ScriptSignature) -> Result<ScriptFunction, TaskerError> {
        let function = self
            .find(name)
            .ok_or_else(|| TaskerError::ScriptNotFound(name.to_string()))?;
        if function.signature() != expected {
            return Err(TaskerError::ScriptSignature {
                name: name.to_string(),
                expected,
                found: function.signature(),
            });
        }
        Ok(function.clone())
    }
}
