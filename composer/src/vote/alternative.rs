//! Alternative vote (instant-runoff) engine
//!
//! Every elector votes for its first preference. While no candidate holds
//! the absolute majority, the least voted candidate is eliminated and its
//! ballots are transferred to the next standing preference of each elector.
//!
//! A leader one vote short of the majority is elected directly, without
//! checking whether the runner-up could still catch up.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, info};

use super::ballot::Ballot;
use super::engine::{EngineOptions, EngineParameters, VoteEngine, VoteError, VoteResult};
use super::results::{Decision, RoundTally, VoteResults};

/// Kind of vote handled by [`AlternativeVoteEngine`]
pub const ALTERNATIVE_VOTE_KIND: &str = "alternative";

/// Instant-runoff counting
#[derive(Debug, Clone, Copy, Default)]
pub struct AlternativeVoteEngine;

impl AlternativeVoteEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Position of one elector in its own preference list
struct Elector<'a, C> {
    preferences: &'a [C],
    position: usize,
}

impl<'a, C: PartialEq> Elector<'a, C> {
    /// Move to the next preference that is still standing
    fn advance(&mut self, standing: &[C]) -> Option<&'a C> {
        let preferences = self.preferences;
        while self.position < preferences.len() {
            let candidate = &preferences[self.position];
            if standing.contains(candidate) {
                return Some(candidate);
            }
            self.position += 1;
        }
        None
    }
}

impl<C> VoteEngine<C> for AlternativeVoteEngine
where
    C: Clone + Eq + Hash + Debug + Send + Sync,
{
    fn kind(&self) -> &str {
        ALTERNATIVE_VOTE_KIND
    }

    fn options(&self) -> EngineOptions {
        EngineOptions::new()
    }

    fn analyze(
        &self,
        round: u32,
        ballots: &[Ballot<C>],
        candidates: &[C],
        _parameters: &EngineParameters,
        results: &mut VoteResults<C>,
    ) -> VoteResult<C> {
        if candidates.is_empty() {
            return Err(VoteError::NoCandidates);
        }

        let mut standing: Vec<C> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !standing.contains(candidate) {
                standing.push(candidate.clone());
            }
        }
        results.register(standing.iter());

        // First preferences; blank ballots abstain for the whole election
        let mut electors: Vec<Elector<'_, C>> = Vec::with_capacity(ballots.len());
        let mut assigned: HashMap<C, Vec<usize>> = HashMap::new();
        for ballot in ballots {
            let mut elector = Elector {
                preferences: ballot.preferences(),
                position: 0,
            };
            if let Some(candidate) = elector.advance(&standing) {
                assigned
                    .entry(candidate.clone())
                    .or_default()
                    .push(electors.len());
            }
            electors.push(elector);
        }

        let max_counts = standing.len();
        for count in 1..=max_counts {
            let tallies: HashMap<C, usize> = standing
                .iter()
                .map(|c| (c.clone(), assigned.get(c).map_or(0, Vec::len)))
                .collect();
            let sorted = results.set_results(&tallies);
            let total: usize = sorted.iter().map(|(votes, _)| votes).sum();
            let majority = total / 2 + 1;

            let Some((leader_votes, leader)) = sorted.first().cloned() else {
                unreachable!("alternative vote lost every standing candidate");
            };

            debug!(
                round,
                count,
                total,
                majority,
                leader = ?leader,
                leader_votes,
                "Counting alternative vote"
            );

            let decision = if leader_votes >= majority {
                Some(Decision::AbsoluteMajority)
            } else if leader_votes + 1 == majority {
                Some(Decision::NearMajority)
            } else {
                None
            };

            if let Some(decision) = decision {
                results.push_round(RoundTally {
                    round: count,
                    tallies: sorted,
                    majority,
                    eliminated: None,
                });
                results.set_winner(leader.clone(), decision);
                info!(
                    round,
                    counts = count,
                    winner = ?leader,
                    votes = leader_votes,
                    %decision,
                    "Candidate elected"
                );
                return Ok(leader);
            }

            let Some((_, loser)) = sorted.last().cloned() else {
                unreachable!("alternative vote lost every standing candidate");
            };
            standing.retain(|c| c != &loser);
            results.push_round(RoundTally {
                round: count,
                tallies: sorted,
                majority,
                eliminated: Some(loser.clone()),
            });

            let transferred = assigned.remove(&loser).unwrap_or_default();
            debug!(
                round,
                count,
                eliminated = ?loser,
                ballots = transferred.len(),
                "Candidate eliminated"
            );
            for index in transferred {
                if let Some(next) = electors[index].advance(&standing) {
                    assigned.entry(next.clone()).or_default().push(index);
                }
            }
        }

        unreachable!("alternative vote did not elect any of {max_counts} candidates");
    }
}
