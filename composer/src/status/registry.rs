//! Composer status: UID-indexed registry of tracked entities
//!
//! Agents, components, composites and compositions each live in their own
//! map behind their own lock, so readers of one registry never wait for
//! writers of another.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::beans::{Composite, Composition};
use super::fsm::{FsmFactory, LifecycleFsm, TransitionError, TransitionRecord};
use crate::placement::RawComponent;

/// Kind of entity tracked by the status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Agent,
    Component,
    Composite,
    Composition,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Agent => write!(f, "agent"),
            EntityKind::Component => write!(f, "component"),
            EntityKind::Composite => write!(f, "composite"),
            EntityKind::Composition => write!(f, "composition"),
        }
    }
}

/// Error type for status operations
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Already known {kind}: {uid}")]
    DuplicateUid { kind: EntityKind, uid: String },

    #[error("Unknown {kind}: {uid}")]
    UnknownUid { kind: EntityKind, uid: String },

    #[error("Transition of {kind} {uid} failed: {source}")]
    Transition {
        kind: EntityKind,
        uid: String,
        source: TransitionError,
    },

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for status operations
pub type StatusResult<T> = Result<T, StatusError>;

/// Shared reference to ComposerStatus
pub type SharedComposerStatus = Arc<ComposerStatus>;

/// An entity and the state machine following its lifecycle
pub struct TrackedEntity<D> {
    uid: String,
    fsm: Box<dyn LifecycleFsm<D>>,
}

impl<D> TrackedEntity<D> {
    pub fn new(uid: impl Into<String>, fsm: Box<dyn LifecycleFsm<D>>) -> Self {
        Self {
            uid: uid.into(),
            fsm,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn state(&self) -> &str {
        self.fsm.state()
    }

    pub fn data(&self) -> &D {
        self.fsm.data()
    }

    pub fn history(&self) -> &[TransitionRecord] {
        self.fsm.history()
    }

    fn handle(&mut self, kind: EntityKind, event: &str) -> StatusResult<String> {
        self.fsm
            .handle(event)
            .map_err(|source| StatusError::Transition {
                kind,
                uid: self.uid.clone(),
                source,
            })
    }
}

impl<D> std::fmt::Debug for TrackedEntity<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedEntity")
            .field("uid", &self.uid)
            .field("state", &self.fsm.state())
            .finish()
    }
}

/// Number of entries of each registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub agents: usize,
    pub components: usize,
    pub composites: usize,
    pub compositions: usize,
}

type Registry<D> = BTreeMap<String, TrackedEntity<D>>;

/// Lifecycle status of everything the composer manages
pub struct ComposerStatus {
    factory: Arc<dyn FsmFactory>,
    agents: RwLock<Registry<String>>,
    components: RwLock<Registry<RawComponent>>,
    composites: RwLock<Registry<Composite>>,
    compositions: RwLock<BTreeMap<String, Composition>>,
}

fn read<T>(lock: &RwLock<T>) -> StatusResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StatusError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> StatusResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StatusError::LockPoisoned)
}

fn unknown(kind: EntityKind, uid: &str) -> StatusError {
    StatusError::UnknownUid {
        kind,
        uid: uid.to_string(),
    }
}

fn duplicate(kind: EntityKind, uid: &str) -> StatusError {
    error!(%kind, uid, "Already known entity");
    StatusError::DuplicateUid {
        kind,
        uid: uid.to_string(),
    }
}

impl ComposerStatus {
    /// Create an empty status using the given state machine factory
    pub fn new(factory: Arc<dyn FsmFactory>) -> Self {
        Self {
            factory,
            agents: RwLock::new(BTreeMap::new()),
            components: RwLock::new(BTreeMap::new()),
            composites: RwLock::new(BTreeMap::new()),
            compositions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a shared reference to this status
    pub fn shared(self) -> SharedComposerStatus {
        Arc::new(self)
    }

    // =========================================================================
    // Agents
    // =========================================================================

    /// A new agent was requested on the isolate `uid`
    pub fn agent_requested(&self, uid: &str) -> StatusResult<String> {
        let mut agents = write(&self.agents)?;
        if agents.contains_key(uid) {
            return Err(duplicate(EntityKind::Agent, uid));
        }

        let fsm = self.factory.make_agent_fsm(uid);
        agents.insert(uid.to_string(), TrackedEntity::new(uid, fsm));
        debug!(uid, "Agent requested");
        Ok(uid.to_string())
    }

    /// Apply a transition event to an agent and return its new state
    pub fn agent_event(&self, uid: &str, event: &str) -> StatusResult<String> {
        let mut agents = write(&self.agents)?;
        agents
            .get_mut(uid)
            .ok_or_else(|| unknown(EntityKind::Agent, uid))?
            .handle(EntityKind::Agent, event)
    }

    /// Forget an agent
    pub fn remove_agent(&self, uid: &str) -> StatusResult<()> {
        write(&self.agents)?
            .remove(uid)
            .ok_or_else(|| unknown(EntityKind::Agent, uid))?;
        debug!(uid, "Agent removed");
        Ok(())
    }

    /// UIDs of the known agents
    pub fn get_agents(&self) -> StatusResult<Vec<String>> {
        Ok(read(&self.agents)?.keys().cloned().collect())
    }

    pub fn agent_state(&self, uid: &str) -> StatusResult<String> {
        read(&self.agents)?
            .get(uid)
            .map(|agent| agent.state().to_string())
            .ok_or_else(|| unknown(EntityKind::Agent, uid))
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// A new component was requested
    pub fn component_requested(&self, component: &RawComponent) -> StatusResult<String> {
        let uid = component.uid.as_str();
        let mut components = write(&self.components)?;
        if components.contains_key(uid) {
            return Err(duplicate(EntityKind::Component, uid));
        }

        let fsm = self.factory.make_component_fsm(component);
        components.insert(uid.to_string(), TrackedEntity::new(uid, fsm));
        debug!(uid, name = %component.name, "Component requested");
        Ok(uid.to_string())
    }

    /// Apply a transition event to a component and return its new state
    pub fn component_event(&self, uid: &str, event: &str) -> StatusResult<String> {
        let mut components = write(&self.components)?;
        components
            .get_mut(uid)
            .ok_or_else(|| unknown(EntityKind::Component, uid))?
            .handle(EntityKind::Component, event)
    }

    pub fn has_component(&self, uid: &str) -> StatusResult<bool> {
        Ok(read(&self.components)?.contains_key(uid))
    }

    /// Bean of the component with the given UID
    pub fn get_component(&self, uid: &str) -> StatusResult<RawComponent> {
        read(&self.components)?
            .get(uid)
            .map(|component| component.data().clone())
            .ok_or_else(|| unknown(EntityKind::Component, uid))
    }

    pub fn component_state(&self, uid: &str) -> StatusResult<String> {
        read(&self.components)?
            .get(uid)
            .map(|component| component.state().to_string())
            .ok_or_else(|| unknown(EntityKind::Component, uid))
    }

    /// Beans of the known components, optionally only those in `state`
    ///
    /// Each call reads the registry again.
    pub fn get_components(&self, state: Option<&str>) -> StatusResult<Vec<RawComponent>> {
        Ok(read(&self.components)?
            .values()
            .filter(|component| state.map_or(true, |state| component.state() == state))
            .map(|component| component.data().clone())
            .collect())
    }

    pub fn remove_component(&self, uid: &str) -> StatusResult<RawComponent> {
        let removed = write(&self.components)?
            .remove(uid)
            .ok_or_else(|| unknown(EntityKind::Component, uid))?;
        debug!(uid, "Component removed");
        Ok(removed.data().clone())
    }

    // =========================================================================
    // Composites and compositions
    // =========================================================================

    /// A new composite was requested
    pub fn composite_requested(&self, composite: &Composite) -> StatusResult<String> {
        let mut composites = write(&self.composites)?;
        if composites.contains_key(&composite.uid) {
            return Err(duplicate(EntityKind::Composite, &composite.uid));
        }
        self.insert_composite(&mut composites, composite);
        Ok(composite.uid.clone())
    }

    /// Apply a transition event to a composite and return its new state
    pub fn composite_event(&self, uid: &str, event: &str) -> StatusResult<String> {
        let mut composites = write(&self.composites)?;
        composites
            .get_mut(uid)
            .ok_or_else(|| unknown(EntityKind::Composite, uid))?
            .handle(EntityKind::Composite, event)
    }

    pub fn composite_state(&self, uid: &str) -> StatusResult<String> {
        read(&self.composites)?
            .get(uid)
            .map(|composite| composite.state().to_string())
            .ok_or_else(|| unknown(EntityKind::Composite, uid))
    }

    pub fn has_composition(&self, uid: &str) -> StatusResult<bool> {
        Ok(read(&self.compositions)?.contains_key(uid))
    }

    /// Store a composition and every composite of its tree
    ///
    /// Nothing is stored if the composition or one of its composites is
    /// already known.
    pub fn add_composition(&self, composition: &Composition) -> StatusResult<()> {
        let mut compositions = write(&self.compositions)?;
        if compositions.contains_key(&composition.uid) {
            return Err(duplicate(EntityKind::Composition, &composition.uid));
        }

        let tree = composition.root.walk();
        let mut composites = write(&self.composites)?;
        let mut seen = HashSet::new();
        for composite in &tree {
            if composites.contains_key(&composite.uid) || !seen.insert(composite.uid.as_str()) {
                return Err(duplicate(EntityKind::Composite, &composite.uid));
            }
        }

        compositions.insert(composition.uid.clone(), composition.clone());
        for composite in tree {
            self.insert_composite(&mut composites, composite);
        }

        info!(
            uid = %composition.uid,
            name = %composition.name,
            composites = composites.len(),
            "Composition stored"
        );
        Ok(())
    }

    /// Forget a composition and every composite of its tree
    pub fn remove_composition(&self, composition: &Composition) -> StatusResult<()> {
        let mut compositions = write(&self.compositions)?;
        if compositions.remove(&composition.uid).is_none() {
            return Err(unknown(EntityKind::Composition, &composition.uid));
        }

        let mut composites = write(&self.composites)?;
        for composite in composition.root.walk() {
            if composites.remove(&composite.uid).is_none() {
                warn!(uid = %composite.uid, "Composite already removed");
            }
        }

        info!(uid = %composition.uid, name = %composition.name, "Composition removed");
        Ok(())
    }

    fn insert_composite(&self, composites: &mut Registry<Composite>, composite: &Composite) {
        let fsm = self.factory.make_composite_fsm(composite);
        composites.insert(
            composite.uid.clone(),
            TrackedEntity::new(composite.uid.as_str(), fsm),
        );
        debug!(uid = %composite.uid, name = %composite.name, "Composite requested");
    }

    // =========================================================================
    // Whole status
    // =========================================================================

    pub fn counts(&self) -> StatusResult<StatusCounts> {
        // One guard at a time: never hold another registry while waiting
        let agents = read(&self.agents)?.len();
        let components = read(&self.components)?.len();
        let composites = read(&self.composites)?.len();
        let compositions = read(&self.compositions)?.len();
        Ok(StatusCounts {
            agents,
            components,
            composites,
            compositions,
        })
    }

    /// Forget everything
    pub fn teardown(&self) -> StatusResult<()> {
        write(&self.agents)?.clear();
        write(&self.components)?.clear();
        write(&self.composites)?.clear();
        write(&self.compositions)?.clear();
        info!("Composer status cleared");
        Ok(())
    }
}
