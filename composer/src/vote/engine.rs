//! Vote engine capability
//!
//! An engine turns a set of locked ballots into a single elected candidate.
//! Engines are looked up by kind, so several counting methods can coexist.

use std::collections::BTreeMap;
use std::hash::Hash;

use super::ballot::{Ballot, BallotError};
use super::results::VoteResults;

/// Error type for vote engine operations
#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error("No candidates to elect")]
    NoCandidates,

    #[error("Unknown vote engine kind: {0}")]
    UnknownEngine(String),

    #[error("Ballot error: {0}")]
    Ballot(#[from] BallotError),
}

/// Result type for vote engine operations
pub type VoteResult<T> = Result<T, VoteError>;

/// Tunable option name -> human readable description
pub type EngineOptions = BTreeMap<String, String>;

/// Option name -> value, as given to an engine for one vote
pub type EngineParameters = BTreeMap<String, String>;

/// Counting method for an election
pub trait VoteEngine<C>: Send + Sync
where
    C: Clone + Eq + Hash,
{
    /// Kind of vote implemented by this engine
    fn kind(&self) -> &str;

    /// Options this engine understands
    fn options(&self) -> EngineOptions;

    /// Count the ballots and return the elected candidate
    ///
    /// `round` is the election round, starting at 1. Tallies of every
    /// counting step are written to `results`.
    fn analyze(
        &self,
        round: u32,
        ballots: &[Ballot<C>],
        candidates: &[C],
        parameters: &EngineParameters,
        results: &mut VoteResults<C>,
    ) -> VoteResult<C>;
}
