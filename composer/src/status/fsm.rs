//! Lifecycle state machines of tracked entities
//!
//! The transition tables are provided by configuration. This module only
//! knows how to apply a table to a tracked entity.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::beans::Composite;
use crate::placement::RawComponent;

/// Error for events without a transition from the current state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No transition from state '{state}' on event '{event}'")]
pub struct TransitionError {
    pub state: String,
    pub event: String,
}

/// A transition that happened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: String,
    pub event: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
}

/// State machine wrapped by a tracked entity
pub trait LifecycleFsm<D>: Send + Sync {
    /// Current state
    fn state(&self) -> &str;

    /// Bean of the tracked entity
    fn data(&self) -> &D;

    /// Apply an event and return the new state
    fn handle(&mut self, event: &str) -> Result<String, TransitionError>;

    /// Transitions applied so far, oldest first
    fn history(&self) -> &[TransitionRecord] {
        &[]
    }
}

/// Builds the state machines of each kind of tracked entity
pub trait FsmFactory: Send + Sync {
    fn make_agent_fsm(&self, uid: &str) -> Box<dyn LifecycleFsm<String>>;

    fn make_component_fsm(&self, component: &RawComponent) -> Box<dyn LifecycleFsm<RawComponent>>;

    fn make_composite_fsm(&self, composite: &Composite) -> Box<dyn LifecycleFsm<Composite>>;
}

/// One row of a transition table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub event: String,
    pub to: String,
}

/// Transition table of one kind of entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTable {
    /// State of newly tracked entities
    pub initial: String,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::new("requested")
    }
}

impl TransitionTable {
    /// An empty table starting in `initial`
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            initial: initial.into(),
            transitions: Vec::new(),
        }
    }

    /// Add a transition row
    pub fn with_transition(
        mut self,
        from: impl Into<String>,
        event: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.transitions.push(Transition {
            from: from.into(),
            event: event.into(),
            to: to.into(),
        });
        self
    }

    /// Target state of `event` in `state`, if any
    pub fn next_state(&self, state: &str, event: &str) -> Option<&str> {
        self.transitions
            .iter()
            .find(|t| t.from == state && t.event == event)
            .map(|t| t.to.as_str())
    }

    /// Events accepted in `state`
    pub fn valid_events(&self, state: &str) -> Vec<&str> {
        self.transitions
            .iter()
            .filter(|t| t.from == state)
            .map(|t| t.event.as_str())
            .collect()
    }
}

/// State machine driven by a shared transition table
pub struct TableFsm<D> {
    table: Arc<TransitionTable>,
    state: String,
    data: D,
    history: Vec<TransitionRecord>,
}

impl<D> TableFsm<D> {
    pub fn new(table: Arc<TransitionTable>, data: D) -> Self {
        Self {
            state: table.initial.clone(),
            table,
            data,
            history: Vec::new(),
        }
    }
}

impl<D: Send + Sync> LifecycleFsm<D> for TableFsm<D> {
    fn state(&self) -> &str {
        &self.state
    }

    fn data(&self) -> &D {
        &self.data
    }

    fn handle(&mut self, event: &str) -> Result<String, TransitionError> {
        let to = self
            .table
            .next_state(&self.state, event)
            .ok_or_else(|| TransitionError {
                state: self.state.clone(),
                event: event.to_string(),
            })?
            .to_string();

        debug!(from = %self.state, event, to = %to, "State transition");
        self.history.push(TransitionRecord {
            from: std::mem::replace(&mut self.state, to.clone()),
            event: event.to_string(),
            to: to.clone(),
            timestamp: Utc::now(),
        });
        Ok(to)
    }

    fn history(&self) -> &[TransitionRecord] {
        &self.history
    }
}

/// Transition tables of agents, components and composites
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleTables {
    pub agent: TransitionTable,
    pub component: TransitionTable,
    pub composite: TransitionTable,
}

/// Factory of [`TableFsm`]s, one table per entity kind
#[derive(Debug, Clone)]
pub struct TableFsmFactory {
    agent: Arc<TransitionTable>,
    component: Arc<TransitionTable>,
    composite: Arc<TransitionTable>,
}

impl TableFsmFactory {
    pub fn new(tables: LifecycleTables) -> Self {
        Self {
            agent: Arc::new(tables.agent),
            component: Arc::new(tables.component),
            composite: Arc::new(tables.composite),
        }
    }
}

impl Default for TableFsmFactory {
    fn default() -> Self {
        Self::new(LifecycleTables::default())
    }
}

impl FsmFactory for TableFsmFactory {
    fn make_agent_fsm(&self, uid: &str) -> Box<dyn LifecycleFsm<String>> {
        Box::new(TableFsm::new(self.agent.clone(), uid.to_string()))
    }

    fn make_component_fsm(&self, component: &RawComponent) -> Box<dyn LifecycleFsm<RawComponent>> {
        Box::new(TableFsm::new(self.component.clone(), component.clone()))
    }

    fn make_composite_fsm(&self, composite: &Composite) -> Box<dyn LifecycleFsm<Composite>> {
        Box::new(TableFsm::new(self.composite.clone(), composite.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Arc<TransitionTable> {
        Arc::new(
            TransitionTable::new("requested")
                .with_transition("requested", "start", "running")
                .with_transition("running", "stop", "stopped")
                .with_transition("running", "fail", "requested"),
        )
    }

    #[test]
    fn test_table_fsm_follows_transitions() {
        let mut fsm = TableFsm::new(table(), "agent-1".to_string());
        assert_eq!(fsm.state(), "requested");

        assert_eq!(fsm.handle("start").unwrap(), "running");
        assert_eq!(fsm.handle("stop").unwrap(), "stopped");
        assert_eq!(fsm.state(), "stopped");
        assert_eq!(fsm.data(), "agent-1");

        let history = fsm.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from, "requested");
        assert_eq!(history[1].to, "stopped");
    }

    #[test]
    fn test_unknown_transition_keeps_state() {
        let mut fsm = TableFsm::new(table(), ());
        let err = fsm.handle("stop").unwrap_err();

        assert_eq!(err.state, "requested");
        assert_eq!(err.event, "stop");
        assert_eq!(fsm.state(), "requested");
        assert!(fsm.history().is_empty());
    }

    #[test]
    fn test_valid_events() {
        let table = table();
        assert_eq!(table.valid_events("running"), vec!["stop", "fail"]);
        assert!(table.valid_events("stopped").is_empty());
    }

    #[test]
    fn test_factory_uses_kind_tables() {
        let factory = TableFsmFactory::new(LifecycleTables {
            agent: TransitionTable::new("booting"),
            component: TransitionTable::new("waiting"),
            composite: TransitionTable::default(),
        });

        assert_eq!(factory.make_agent_fsm("a").state(), "booting");
        let component = RawComponent::new("c", "fc", "rust");
        assert_eq!(factory.make_component_fsm(&component).state(), "waiting");
        assert_eq!(
            factory.make_composite_fsm(&Composite::new("root")).state(),
            "requested"
        );
    }

    #[test]
    fn test_tables_from_toml() {
        let tables: LifecycleTables = toml::from_str(
            r#"
            [component]
            initial = "waiting"
            transitions = [
                { from = "waiting", event = "instantiated", to = "running" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(tables.component.next_state("waiting", "instantiated"), Some("running"));
        assert_eq!(tables.agent, TransitionTable::default());
    }
}
