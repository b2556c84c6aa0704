//! Isolate Composer Library
//!
//! This library provides the election-based placement engine of a node:
//! - Ranked ballots counted by pluggable vote engines (alternative vote)
//! - Placement criteria learning factory compatibility from lifecycle events
//! - Eligible isolates with negotiated or generated names
//! - A status registry following agents, components and composition trees
//!   through configurable state machines
//!
//! # Usage
//!
//! ```bash
//! # Count an election described in a TOML scenario
//! composer elect ballots.toml
//!
//! # Replay events and place a component
//! COMPOSER_NODE_NAME=node1 composer --config composer.toml place scenario.toml
//! ```

pub mod config;
pub mod placement;
pub mod status;
pub mod vote;

pub use config::{ComposerConfig, ConfigError};

// Re-export key vote types
pub use vote::{
    AlternativeVoteEngine, Ballot, BallotError, BallotMerge, Decision, VoteEngine, VoteError,
    VoteResults, WeightedBallot, WeightedReplication,
};

// Re-export key placement types
pub use placement::{
    CandidateId, CompatibilityCriterion, ComposerError, Criterion, EligibleIsolate, Event,
    IsolateCounter, NodeComposer, PlacementContext, PlacementDecision, RawComponent,
};

// Re-export key status types
pub use status::{
    ComposerStatus, Composite, Composition, FsmFactory, LifecycleFsm, SharedComposerStatus,
    StatusError, TableFsmFactory,
};
