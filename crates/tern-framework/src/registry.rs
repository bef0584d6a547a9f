//! Copy-on-write handler registry.
//!
//! The registry holds one immutable [`HandlerTable`] behind an
//! [`ArcSwap`]. Dispatch takes a snapshot with a single atomic load and
//! scans it without locks; the module manager builds a complete new table
//! and publishes it with a single atomic store. A dispatch pass therefore
//! sees either the old table or the new one in full, never a mixture.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::handler::{HandlerDescriptor, Priority};
use crate::rule::Rule;

/// One rule bound to one handler.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The compiled rule.
    pub rule: Rule,
    /// The handler it selects.
    pub handler: Arc<HandlerDescriptor>,
}

/// An immutable snapshot of every bound handler.
///
/// Bindings are grouped by priority tier and kept in registration order
/// within each tier.
#[derive(Debug, Default)]
pub struct HandlerTable {
    generation: u64,
    tiers: [Vec<Binding>; 3],
}

impl HandlerTable {
    /// Creates an empty table for `generation`.
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            tiers: Default::default(),
        }
    }

    /// Appends a binding to its handler's tier.
    pub fn push(&mut self, binding: Binding) {
        self.tiers[binding.handler.priority.index()].push(binding);
    }

    /// The generation this table was published as.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The bindings of one tier, in registration order.
    pub fn tier(&self, priority: Priority) -> &[Binding] {
        &self.tiers[priority.index()]
    }

    /// Every binding, in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        Priority::ALL.into_iter().flat_map(|p| self.tier(p).iter())
    }

    /// Total number of bindings.
    pub fn len(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }

    /// Returns `true` if no handler is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The live handler table.
#[derive(Debug)]
pub struct Registry {
    table: ArcSwap<HandlerTable>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry holding an empty generation-0 table.
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(HandlerTable::new(0)),
        }
    }

    /// Returns the current table.
    pub fn snapshot(&self) -> Arc<HandlerTable> {
        self.table.load_full()
    }

    /// Publishes `table`, replacing the current one.
    pub fn replace(&self, table: HandlerTable) {
        self.table.store(Arc::new(table));
    }

    /// Generation of the current table.
    pub fn generation(&self) -> u64 {
        self.table.load().generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Invocation;
    use crate::handler::{HandlerResult, HandlerSpec};
    use crate::rule::RuleCompiler;
    use crate::settings::BotSettings;

    async fn noop(_inv: Invocation) -> HandlerResult {
        Ok(())
    }

    fn bindings(name: &str, priority: Priority) -> Vec<Binding> {
        let compiler = RuleCompiler::new(&BotSettings::default());
        let (handler, rules) = HandlerSpec::new(name.to_string(), noop)
            .rule(".*")
            .priority(priority)
            .compile("m", 1, &compiler)
            .unwrap();
        rules
            .into_iter()
            .map(|rule| Binding {
                rule,
                handler: Arc::clone(&handler),
            })
            .collect()
    }

    #[test]
    fn test_tiers_keep_registration_order() {
        let mut table = HandlerTable::new(1);
        for b in bindings("low", Priority::Low) {
            table.push(b);
        }
        for b in bindings("first", Priority::Medium) {
            table.push(b);
        }
        for b in bindings("high", Priority::High) {
            table.push(b);
        }
        for b in bindings("second", Priority::Medium) {
            table.push(b);
        }

        let order: Vec<_> = table.iter().map(|b| b.handler.name.as_str()).collect();
        assert_eq!(order, vec!["high", "first", "second", "low"]);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_replace_swaps_snapshot() {
        let registry = Registry::new();
        let before = registry.snapshot();
        assert!(before.is_empty());

        let mut table = HandlerTable::new(7);
        for b in bindings("x", Priority::High) {
            table.push(b);
        }
        registry.replace(table);

        assert_eq!(registry.generation(), 7);
        assert_eq!(registry.snapshot().len(), 1);
        // A snapshot taken earlier is unaffected.
        assert!(before.is_empty());
    }
}
