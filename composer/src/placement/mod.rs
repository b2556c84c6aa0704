//! Component placement
//!
//! Placing a component is an election: criteria learn from lifecycle events
//! which component factories get along, then rank the candidate isolates on
//! ballots counted by a vote engine.
//!
//! ```text
//! Event ──► Criterion::handle_event        (learning)
//!
//! RawComponent ──► Criterion::vote ──► Ballot<CandidateId>
//!                                          │ BallotMerge
//!                                          ▼
//!                            VoteEngine::analyze ──► EligibleIsolate
//! ```

pub mod compatibility;
pub mod component;
pub mod composer;
pub mod criterion;
pub mod event;
pub mod isolate;

pub use compatibility::{
    CompatibilityConfig, CompatibilityCriterion, FactoryPair, InitialRating,
    COMPATIBILITY_CRITERION,
};
pub use component::{new_uid, RawComponent};
pub use composer::{ComposerError, ComposerResult, NodeComposer, PlacementContext, PlacementDecision};
pub use criterion::Criterion;
pub use event::{Event, EVENT_ISOLATE_LOST, EVENT_TIMER};
pub use isolate::{
    CandidateId, EligibleIsolate, IsolateCounter, IsolateDescriptor, NamingError, NamingResult,
    NamingState,
};
