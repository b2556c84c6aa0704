//! Voting core: ballots, tallies and counting engines
//!
//! # Flow
//!
//! ```text
//!  Criterion ──fills──▶ Ballot ──lock()──▶ BallotMerge ──▶ VoteEngine ──▶ winner
//!                                                              │
//!                                                              ▼
//!                                                         VoteResults
//! ```
//!
//! Ballots are generic over the candidate reference type. Placement elections
//! use [`crate::placement::CandidateId`], an index into the candidate list, so
//! that isolates which are not named yet can still be told apart.

pub mod alternative;
pub mod ballot;
pub mod engine;
pub mod merge;
pub mod results;

pub use alternative::{AlternativeVoteEngine, ALTERNATIVE_VOTE_KIND};
pub use ballot::{Ballot, BallotError, BallotResult};
pub use engine::{EngineOptions, EngineParameters, VoteEngine, VoteError, VoteResult};
pub use merge::{BallotMerge, WeightedBallot, WeightedReplication, MAX_BALLOT_COPIES};
pub use results::{Decision, RoundTally, VoteResults};
