//! Immutable event registry and the handle that swaps it.
//!
//! An [`EventRegistry`] is never mutated after it is built. Merges produce a
//! new registry, and [`RegistryHandle::replace`] swaps the whole snapshot so
//! a dispatch holding the old `Arc` finishes against a consistent view.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use hookbridge_types::{HookDefinition, HookEvent, HookMatcherGroup, HooksConfig};
use parking_lot::RwLock;

use crate::matcher::HookMatcher;

/// Owner id used for hooks loaded from the hooks directory.
pub const DIRECTORY_OWNER: &str = "directory";

/// Where a matcher group came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOrigin {
    /// Scope owner (`directory` or a skill name).
    pub owner: String,
    /// Directory substituted for `${CLAUDE_PLUGIN_ROOT}`.
    pub base_dir: PathBuf,
}

impl HookOrigin {
    pub fn new(owner: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            owner: owner.into(),
            base_dir: base_dir.into(),
        }
    }
}

/// A matcher group with its pattern compiled.
#[derive(Debug, Clone)]
pub struct MatcherGroup {
    matcher: HookMatcher,
    pub parallel: bool,
    pub hooks: Vec<HookDefinition>,
    pub origin: Arc<HookOrigin>,
}

impl MatcherGroup {
    pub fn new(group: &HookMatcherGroup, origin: Arc<HookOrigin>) -> Self {
        Self {
            matcher: HookMatcher::new(group.matcher.as_deref().unwrap_or_default()),
            parallel: group.parallel,
            hooks: group.hooks.clone(),
            origin,
        }
    }

    pub fn matcher(&self) -> &HookMatcher {
        &self.matcher
    }

    pub fn matches(&self, subject: &str) -> bool {
        self.matcher.matches(subject)
    }

    /// Back to the document form.
    pub fn to_config(&self) -> HookMatcherGroup {
        let pattern = self.matcher.pattern();
        HookMatcherGroup {
            matcher: (!pattern.is_empty()).then(|| pattern.to_string()),
            parallel: self.parallel,
            hooks: self.hooks.clone(),
        }
    }
}

/// Event name to ordered matcher groups.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: BTreeMap<HookEvent, Vec<Arc<MatcherGroup>>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a hooks document, tagging every group with `origin`.
    pub fn from_config(config: &HooksConfig, origin: HookOrigin) -> Self {
        let origin = Arc::new(origin);
        let events = config
            .hooks
            .iter()
            .filter(|(_, groups)| !groups.is_empty())
            .map(|(event, groups)| {
                let compiled = groups
                    .iter()
                    .map(|g| Arc::new(MatcherGroup::new(g, Arc::clone(&origin))))
                    .collect();
                (*event, compiled)
            })
            .collect();
        Self { events }
    }

    /// A new registry with `other`'s groups appended after this one's.
    pub fn merged_with(&self, other: &EventRegistry) -> Self {
        let mut events = self.events.clone();
        for (event, groups) in &other.events {
            events
                .entry(*event)
                .or_default()
                .extend(groups.iter().cloned());
        }
        Self { events }
    }

    /// Append-merge registries in order.
    pub fn merge_all<'a>(registries: impl IntoIterator<Item = &'a EventRegistry>) -> Self {
        registries
            .into_iter()
            .fold(Self::new(), |acc, r| acc.merged_with(r))
    }

    /// All groups for an event, in merge order.
    pub fn groups(&self, event: HookEvent) -> &[Arc<MatcherGroup>] {
        self.events.get(&event).map(Vec::as_slice).unwrap_or_default()
    }

    /// Groups for an event whose matcher accepts `subject`, in merge order.
    pub fn matching_groups(&self, event: HookEvent, subject: &str) -> Vec<Arc<MatcherGroup>> {
        self.groups(event)
            .iter()
            .filter(|g| g.matches(subject))
            .cloned()
            .collect()
    }

    /// Events that have at least one group.
    pub fn events(&self) -> impl Iterator<Item = HookEvent> + '_ {
        self.events.keys().copied()
    }

    /// Total number of hooks.
    pub fn len(&self) -> usize {
        self.events
            .values()
            .flat_map(|groups| groups.iter())
            .map(|g| g.hooks.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Back to the document form. Origins are dropped.
    pub fn to_config(&self) -> HooksConfig {
        HooksConfig {
            hooks: self
                .events
                .iter()
                .map(|(event, groups)| (*event, groups.iter().map(|g| g.to_config()).collect()))
                .collect(),
        }
    }
}

/// Shared, atomically replaceable registry snapshot.
#[derive(Debug, Clone, Default)]
pub struct RegistryHandle {
    current: Arc<RwLock<Arc<EventRegistry>>>,
}

impl RegistryHandle {
    pub fn new(registry: EventRegistry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// The current snapshot. Unaffected by later replacements.
    pub fn snapshot(&self) -> Arc<EventRegistry> {
        Arc::clone(&self.current.read())
    }

    /// Swap in a new registry, returning the previous one.
    pub fn replace(&self, registry: EventRegistry) -> Arc<EventRegistry> {
        std::mem::replace(&mut *self.current.write(), Arc::new(registry))
    }
}
