use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxBuildHasher;
use smol_str::SmolStr;

use crate::eval::error::EvalError;
use crate::number::Number;

use super::error::RegistryError;
use super::normalize_name;

pub type Callable = Arc<dyn Fn(&[Number]) -> Result<Number, EvalError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Accepts any number of arguments.
    Dynamic,
}

#[derive(Clone)]
pub struct FunctionInfo {
    pub name: SmolStr,
    pub arity: Arity,
    pub is_idempotent: bool,
    pub is_overwritable: bool,
    pub function: Callable,
}

impl FunctionInfo {
    pub fn is_dynamic(&self) -> bool {
        self.arity == Arity::Dynamic
    }

    /// Fixed number of parameters, `None` for dynamic functions.
    pub fn number_of_parameters(&self) -> Option<usize> {
        match self.arity {
            Arity::Fixed(n) => Some(n),
            Arity::Dynamic => None,
        }
    }

    pub fn call(&self, args: &[Number]) -> Result<Number, EvalError> {
        (self.function)(args)
    }
}

impl fmt::Debug for FunctionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionInfo")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("is_idempotent", &self.is_idempotent)
            .field("is_overwritable", &self.is_overwritable)
            .finish_non_exhaustive()
    }
}

/// Thread-safe table of the functions a formula may call.
#[derive(Debug)]
pub struct FunctionRegistry {
    case_sensitive: bool,
    functions: DashMap<SmolStr, Arc<FunctionInfo>, FxBuildHasher>,
}

impl FunctionRegistry {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            functions: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Name under which `name` is stored.
    pub fn canonical_name(&self, name: &str) -> Result<SmolStr, RegistryError> {
        normalize_name(name, self.case_sensitive)
    }

    /// Adds or replaces a function.
    ///
    /// Replacing an entry registered as not overwritable fails and leaves the registry unchanged.
    pub fn register_function(
        &self,
        name: &str,
        arity: Arity,
        is_idempotent: bool,
        is_overwritable: bool,
        function: Callable,
    ) -> Result<(), RegistryError> {
        let name = self.canonical_name(name)?;
        let info = Arc::new(FunctionInfo {
            name: name.clone(),
            arity,
            is_idempotent,
            is_overwritable,
            function,
        });

        match self.functions.entry(name) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_overwritable {
                    return Err(RegistryError::FunctionNotOverwritable(entry.key().clone()));
                }
                entry.insert(info);
            }
            Entry::Vacant(entry) => {
                entry.insert(info);
            }
        }

        Ok(())
    }

    /// Stores a locked function without the overwrite check, for tables filled at construction.
    pub(crate) fn insert(&self, name: &'static str, arity: Arity, is_idempotent: bool, function: Callable) {
        let name = SmolStr::new_static(name);
        let info = Arc::new(FunctionInfo {
            name: name.clone(),
            arity,
            is_idempotent,
            is_overwritable: false,
            function,
        });
        self.functions.insert(name, info);
    }

    pub fn function_info(&self, name: &str) -> Result<Arc<FunctionInfo>, RegistryError> {
        let name = self.canonical_name(name)?;
        self.functions
            .get(&name)
            .map(|info| Arc::clone(info.value()))
            .ok_or(RegistryError::FunctionNotFound(name))
    }

    pub fn is_function_name(&self, name: &str) -> Result<bool, RegistryError> {
        let name = self.canonical_name(name)?;
        Ok(self.functions.contains_key(&name))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
