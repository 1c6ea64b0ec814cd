//! Variable catalogs with flat memory layout.
//!
//! Integer variables and clocks live in two disjoint universes. Within one
//! catalog names are unique, ids are dense, and every variable occupies
//! `size` consecutive cells of its kind's memory region starting at its
//! flat offset.

use std::collections::HashMap;
use thiserror::Error;

/// Identifier of a declared variable, dense within its catalog.
pub type VarId = u32;

/// Variable declaration error.
#[derive(Debug, Error)]
pub enum DeclError {
    #[error("variable {0} is already declared")]
    Duplicate(String),
    #[error("variable {0} declared with size 0")]
    ZeroSize(String),
    #[error("variable {name} has initial value {initial} outside [{min}, {max}]")]
    InitialOutOfBounds {
        name: String,
        initial: i64,
        min: i64,
        max: i64,
    },
}

/// Attributes of a bounded integer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntVarInfo {
    /// Smallest admissible value.
    pub min: i64,
    /// Largest admissible value.
    pub max: i64,
    /// Value every cell of the variable starts from.
    pub initial: i64,
}

/// A declared variable and its layout position.
#[derive(Debug, Clone)]
pub struct VarData<I> {
    /// Variable name, unique within the catalog.
    pub name: String,
    /// Array size; 1 for scalars.
    pub size: u32,
    /// First cell of this variable in its kind's memory region.
    pub offset: u32,
    /// Kind-specific attributes.
    pub info: I,
}

/// A catalog of variables of one kind.
#[derive(Debug, Clone)]
pub struct Variables<I> {
    vars: Vec<VarData<I>>,
    index: HashMap<String, VarId>,
    layout_size: u32,
}

impl<I> Default for Variables<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Variables<I> {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            vars: Vec::new(),
            index: HashMap::new(),
            layout_size: 0,
        }
    }

    /// Declare a variable of `size` cells, returning its id.
    pub fn declare(&mut self, name: &str, size: u32, info: I) -> Result<VarId, DeclError> {
        if size == 0 {
            return Err(DeclError::ZeroSize(name.to_string()));
        }
        if self.index.contains_key(name) {
            return Err(DeclError::Duplicate(name.to_string()));
        }
        let id = self.vars.len() as VarId;
        self.index.insert(name.to_string(), id);
        self.vars.push(VarData {
            name: name.to_string(),
            size,
            offset: self.layout_size,
            info,
        });
        self.layout_size += size;
        Ok(id)
    }

    /// Look up a variable by name.
    pub fn lookup(&self, name: &str) -> Option<(VarId, &VarData<I>)> {
        let id = *self.index.get(name)?;
        Some((id, &self.vars[id as usize]))
    }

    /// Access a variable by id. Out-of-range ids are a programming error.
    pub fn get(&self, id: VarId) -> &VarData<I> {
        &self.vars[id as usize]
    }

    /// Iterate over all variables in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &VarData<I>)> {
        self.vars
            .iter()
            .enumerate()
            .map(|(id, data)| (id as VarId, data))
    }

    /// Number of declared variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no variable is declared.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Total number of flat cells across all variables.
    pub fn layout_size(&self) -> u32 {
        self.layout_size
    }
}

/// Catalog of bounded integer variables.
pub type IntVars = Variables<IntVarInfo>;

/// Catalog of clocks.
pub type Clocks = Variables<()>;
