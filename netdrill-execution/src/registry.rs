//! Registry mapping action tags to their implementations

use crate::action::Action;
use crate::actions;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of the actions a script may dispatch to
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<&'static str, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in action
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(actions::discovery::DiscoveryAction));
        registry.register(Arc::new(actions::soft_limit::SoftLimitAction));
        registry.register(Arc::new(actions::groups::SampleAction));
        registry.register(Arc::new(actions::groups::ExceptAction));
        registry.register(Arc::new(actions::groups::JoinAction));
        registry.register(Arc::new(actions::keyloader::KeyloaderAction));
        registry.register(Arc::new(actions::traffic::PaymentsAction));
        registry.register(Arc::new(actions::traffic::ZkappsAction));
        registry.register(Arc::new(actions::stop::StopDaemonAction));
        registry.register(Arc::new(actions::stop::RestartAction));
        registry.register(Arc::new(actions::rotate::RotateAction));
        registry.register(Arc::new(actions::wait::WaitAction));
        registry.register(Arc::new(actions::fund::FundAction));
        registry
    }

    /// Register an action under its own name, replacing any previous one
    pub fn register(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.name(), action);
    }

    /// Get an action by tag
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
