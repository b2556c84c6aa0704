//! Vote results: tallies of an election, round by round

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// How the winner of an election was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The winner reached the absolute majority
    AbsoluteMajority,
    /// The winner was one vote short of the majority and was elected anyway
    NearMajority,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::AbsoluteMajority => write!(f, "absolute_majority"),
            Decision::NearMajority => write!(f, "near_majority"),
        }
    }
}

/// Sorted tallies of one counting round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTally<C> {
    /// Counting round (1-indexed)
    pub round: usize,
    /// (votes, candidate), most voted first
    pub tallies: Vec<(usize, C)>,
    /// Absolute majority for this round
    pub majority: usize,
    /// Candidate eliminated at the end of this round, if any
    pub eliminated: Option<C>,
}

/// Aggregated results of an election
///
/// Candidates must be registered before counting: registration order breaks
/// ties between candidates holding the same number of votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResults<C> {
    order: Vec<C>,
    results: Vec<(usize, C)>,
    rounds: Vec<RoundTally<C>>,
    winner: Option<C>,
    decision: Option<Decision>,
}

impl<C> Default for VoteResults<C> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            results: Vec::new(),
            rounds: Vec::new(),
            winner: None,
            decision: None,
        }
    }
}

impl<C: Clone + Eq + Hash> VoteResults<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register candidates, keeping the first registration of each
    pub fn register<'a>(&mut self, candidates: impl IntoIterator<Item = &'a C>)
    where
        C: 'a,
    {
        for candidate in candidates {
            if !self.order.contains(candidate) {
                self.order.push(candidate.clone());
            }
        }
    }

    /// Store the given counts and return them as (votes, candidate) pairs,
    /// most voted first
    pub fn set_results(&mut self, counts: &HashMap<C, usize>) -> Vec<(usize, C)> {
        let unknown: Vec<C> = counts
            .keys()
            .filter(|c| !self.order.contains(c))
            .cloned()
            .collect();
        self.order.extend(unknown);

        let mut ranked: Vec<(usize, usize, C)> = counts
            .iter()
            .map(|(candidate, votes)| (*votes, self.rank_of(candidate), candidate.clone()))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        self.results = ranked
            .into_iter()
            .map(|(votes, _, candidate)| (votes, candidate))
            .collect();
        self.results.clone()
    }

    /// Latest sorted results
    pub fn results(&self) -> &[(usize, C)] {
        &self.results
    }

    /// Votes held by a candidate in the latest results
    pub fn votes_of(&self, candidate: &C) -> usize {
        self.results
            .iter()
            .find(|(_, c)| c == candidate)
            .map(|(votes, _)| *votes)
            .unwrap_or(0)
    }

    /// Total number of votes in the latest results
    pub fn total_votes(&self) -> usize {
        self.results.iter().map(|(votes, _)| votes).sum()
    }

    /// Record a finished counting round
    pub fn push_round(&mut self, round: RoundTally<C>) {
        self.rounds.push(round);
    }

    /// Every counting round, in order
    pub fn rounds(&self) -> &[RoundTally<C>] {
        &self.rounds
    }

    /// Record the elected candidate and how it was elected
    pub fn set_winner(&mut self, winner: C, decision: Decision) {
        self.winner = Some(winner);
        self.decision = Some(decision);
    }

    pub fn winner(&self) -> Option<&C> {
        self.winner.as_ref()
    }

    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    /// Map every candidate reference to another representation, e.g. to
    /// replace candidate indices by isolate names in reports
    pub fn map<D, F>(&self, mut f: F) -> VoteResults<D>
    where
        F: FnMut(&C) -> D,
    {
        let results = self.results.iter().map(|(v, c)| (*v, f(c))).collect();

        let mut rounds = Vec::with_capacity(self.rounds.len());
        for round in &self.rounds {
            rounds.push(RoundTally {
                round: round.round,
                tallies: round.tallies.iter().map(|(v, c)| (*v, f(c))).collect(),
                majority: round.majority,
                eliminated: round.eliminated.as_ref().map(&mut f),
            });
        }

        VoteResults {
            order: self.order.iter().map(&mut f).collect(),
            results,
            rounds,
            winner: self.winner.as_ref().map(&mut f),
            decision: self.decision,
        }
    }

    fn rank_of(&self, candidate: &C) -> usize {
        self.order
            .iter()
            .position(|c| c == candidate)
            .unwrap_or(self.order.len())
    }
}
