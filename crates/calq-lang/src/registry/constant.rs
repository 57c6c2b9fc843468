use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxBuildHasher;
use smol_str::SmolStr;

use crate::number::Number;

use super::error::RegistryError;
use super::normalize_name;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantInfo {
    pub name: SmolStr,
    pub value: Number,
    pub is_overwritable: bool,
}

/// Thread-safe table of named constants.
#[derive(Debug)]
pub struct ConstantRegistry {
    case_sensitive: bool,
    constants: DashMap<SmolStr, ConstantInfo, FxBuildHasher>,
}

impl ConstantRegistry {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            constants: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Adds or replaces a constant, unless the existing entry is not overwritable.
    pub fn register_constant(&self, name: &str, value: Number, is_overwritable: bool) -> Result<(), RegistryError> {
        let name = normalize_name(name, self.case_sensitive)?;
        let info = ConstantInfo {
            name: name.clone(),
            value,
            is_overwritable,
        };

        match self.constants.entry(name) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_overwritable {
                    return Err(RegistryError::ConstantNotOverwritable(entry.key().clone()));
                }
                entry.insert(info);
            }
            Entry::Vacant(entry) => {
                entry.insert(info);
            }
        }

        Ok(())
    }

    pub(crate) fn insert(&self, name: &'static str, value: Number) {
        let name = SmolStr::new_static(name);
        self.constants.insert(
            name.clone(),
            ConstantInfo {
                name,
                value,
                is_overwritable: false,
            },
        );
    }

    pub fn constant_info(&self, name: &str) -> Result<ConstantInfo, RegistryError> {
        let name = normalize_name(name, self.case_sensitive)?;
        self.constants
            .get(&name)
            .map(|info| info.value().clone())
            .ok_or(RegistryError::ConstantNotFound(name))
    }

    pub fn is_constant_name(&self, name: &str) -> Result<bool, RegistryError> {
        let name = normalize_name(name, self.case_sensitive)?;
        Ok(self.constants.contains_key(&name))
    }

    /// Snapshot of every registered constant.
    pub fn iter(&self) -> impl Iterator<Item = ConstantInfo> {
        self.constants
            .iter()
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}
