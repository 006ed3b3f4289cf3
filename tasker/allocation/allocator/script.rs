use std::fmt;

use tracing::warn;

use crate::{
    error::TaskerError,
    matrix::Matrix,
    script::{AllocateFn, ScriptFunction, ScriptScope, ScriptSignature},
};

use super::{Allocation, AllocationBook, Allocator};

/// Forwards allocation to a `(values, assets, tasks) -> asset => task` script function.
pub struct ScriptAllocator {
    function_name: String,
    function: AllocateFn,
    book: AllocationBook,
}

impl ScriptAllocator {
    /// Binds to `function_name`, searching `scope` outward.
    pub fn new(scope: &ScriptScope, function_name: &str) -> Result<Self, TaskerError> {
        match scope.resolve(function_name, ScriptSignature::Allocate)? {
            ScriptFunction::Allocate(function) => Ok(Self {
                function_name: function_name.to_string(),
                function,
                book: AllocationBook::default(),
            }),
            other => Err(TaskerError::ScriptSignature {
                name: function_name.to_string(),
                expected: ScriptSignature::Allocate,
                found: other.signature(),
            }),
        }
    }
}

impl fmt::Debug for ScriptAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptAllocator")
            .field("function", &self.function_name)
            .field("allocated", &self.book.len())
            .finish()
    }
}

impl Allocator for ScriptAllocator {
    fn name(&self) -> &str {
        &self.function_name
    }

    fn make_allocations(&mut self, matrix: &Matrix) -> Vec<Allocation> {
        let mapping = (self.function)(matrix.values(), matrix.assets(), matrix.tasks());
        let mut allocations = Vec::with_capacity(mapping.len());
        for (asset, task) in mapping {
            if asset >= matrix.assets().len() || task >= matrix.tasks().len() {
                warn!(
                    function = %self.function_name,
                    asset,
                    task,
                    "script allocation references an index outside the matrix"
                );
                continue;
            }
            allocations.push(Allocation::new(matrix, task, asset));
        }
        self.book.rebuild(&allocations);
        allocations
    }

    fn book(&self) -> &AllocationBook {
        &self.book
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::fixtures::{matrix, pairs};
    use indexmap::IndexMap;

    fn reverse_scope() -> ScriptScope {
        ScriptScope::new("global").with_function(
            "reverse",
            ScriptFunction::allocate(|values, assets, tasks| {
                assert_eq!(values.len(), tasks.len());
                (0..assets.len().min(tasks.len()))
                    .map(|asset| (asset, tasks.len() - 1 - asset))
                    .chain(std::iter::once((99, 0)))
                    .collect::<IndexMap<_, _>>()
            }),
        )
    }

    #[test]
    fn maps_script_result_and_skips_bad_indices() {
        let matrix = matrix(&[&[1.0, 1.0], &[1.0, 1.0]], &[1.0, 1.0]);
        let mut allocator = ScriptAllocator::new(&reverse_scope(), "reverse").unwrap();
        let allocations = allocator.make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(0, 1), (1, 0)]);
        assert_eq!(allocator.name(), "reverse");
    }

    #[test]
    fn rejects_mistyped_function() {
        let scope = ScriptScope::new("global")
            .with_function("score", ScriptFunction::evaluate(|_, _| 0.0));
        assert!(ScriptAllocator::new(&scope, "score").is_err());
    }
}
