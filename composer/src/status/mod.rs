//! Lifecycle status of agents, components and composition trees
//!
//! The status indexes every tracked entity by UID and forwards transition
//! events to the state machine of that entity. State machines are built by
//! an [`FsmFactory`]; [`TableFsmFactory`] applies transition tables loaded
//! from configuration.

pub mod beans;
pub mod fsm;
pub mod registry;

pub use beans::{Composite, Composition};
pub use fsm::{
    FsmFactory, LifecycleFsm, LifecycleTables, TableFsm, TableFsmFactory, Transition,
    TransitionError, TransitionRecord, TransitionTable,
};
pub use registry::{
    ComposerStatus, EntityKind, SharedComposerStatus, StatusCounts, StatusError, StatusResult,
    TrackedEntity,
};
