//! Which elements have listeners in the current lifecycle generation.

use crate::host::ElementToken;
use std::collections::HashMap;

/// Element token to bound flag, for one lifecycle generation
#[derive(Debug, Default)]
pub struct BindingRegistry {
    entries: HashMap<ElementToken, bool>,
}

impl BindingRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether listeners are attached to `element`
    pub fn is_bound(&self, element: ElementToken) -> bool {
        self.entries.get(&element).copied().unwrap_or(false)
    }

    /// Record a binding; returns false if it was already bound
    pub fn mark_bound(&mut self, element: ElementToken) -> bool {
        !self.entries.insert(element, true).unwrap_or(false)
    }

    /// Forget every element; returns how many were bound
    pub fn clear(&mut self) -> usize {
        let bound = self.entries.values().filter(|b| **b).count();
        self.entries.clear();
        bound
    }

    /// Number of bound elements
    pub fn len(&self) -> usize {
        self.entries.values().filter(|b| **b).count()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
