//! Built-in aggregation functions

pub mod aggregate;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::Value;
use ahash::AHashMap;
use std::sync::OnceLock;

/// Function implementation signature
///
/// Functions are pure: arguments in, number out.
pub type FunctionImpl = fn(&[Value]) -> FormulaResult<f64>;

/// Function definition
pub struct FunctionDef {
    /// Function name, matched case-sensitively
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };
        registry.register_aggregate_functions();
        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Check arity and run a function
    pub fn call(&self, name: &str, args: &[Value]) -> FormulaResult<f64> {
        let def = self
            .get(name)
            .ok_or_else(|| FormulaError::UnsupportedFunction(name.to_string()))?;

        if args.len() < def.min_args {
            return Err(FormulaError::function(
                name,
                format!("expects at least {} argument, got {}", def.min_args, args.len()),
            ));
        }
        if let Some(max) = def.max_args {
            if args.len() > max {
                return Err(FormulaError::function(
                    name,
                    format!("expects at most {} arguments, got {}", max, args.len()),
                ));
            }
        }

        (def.implementation)(args)
    }

    fn register_aggregate_functions(&mut self) {
        // Variadic reducers over every sample of every argument
        let reducers: [(&'static str, FunctionImpl); 7] = [
            ("lst", aggregate::fn_lst),
            ("snm", aggregate::fn_snm),
            ("ave", aggregate::fn_ave),
            ("count", aggregate::fn_count),
            ("max", aggregate::fn_max),
            ("min", aggregate::fn_min),
            ("sum", aggregate::fn_sum),
        ];
        for (name, implementation) in reducers {
            self.register(FunctionDef {
                name,
                min_args: 1,
                max_args: None,
                implementation,
            });
        }

        // TAVE(series[, total])
        self.register(FunctionDef {
            name: "tave",
            min_args: 1,
            max_args: Some(2),
            implementation: aggregate::fn_tave,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The shared registry of built-in functions
pub fn registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}
