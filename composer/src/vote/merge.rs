//! Merging ballots of several criteria into the electorate of one election

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ballot::Ballot;

/// Upper bound on the copies of one ballot in the merged electorate
pub const MAX_BALLOT_COPIES: usize = 100;

/// Ballot filled by a criterion, with the weight of that criterion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedBallot<C> {
    pub weight: f64,
    pub ballot: Ballot<C>,
}

/// Strategy turning weighted criterion ballots into the ballots counted by
/// the vote engine
pub trait BallotMerge<C>: Send + Sync {
    fn merge(&self, ballots: Vec<WeightedBallot<C>>) -> Vec<Ballot<C>>;
}

/// Each ballot is counted as many times as its weight, rounded to the nearest
/// integer and capped at [`MAX_BALLOT_COPIES`]. A weight of zero or less
/// removes the ballot.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedReplication;

impl<C: Clone + PartialEq> BallotMerge<C> for WeightedReplication {
    fn merge(&self, ballots: Vec<WeightedBallot<C>>) -> Vec<Ballot<C>> {
        let mut merged = Vec::new();
        for WeightedBallot { weight, ballot } in ballots {
            if !weight.is_finite() || weight <= 0.0 {
                continue;
            }
            let copies = weight.round() as usize;
            if copies > MAX_BALLOT_COPIES {
                warn!(elector = ballot.elector(), weight, "Ballot weight capped");
            }
            let copies = copies.min(MAX_BALLOT_COPIES);
            merged.extend(std::iter::repeat(ballot).take(copies));
        }
        merged
    }
}
