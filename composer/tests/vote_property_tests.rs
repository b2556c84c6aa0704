//! Vote property tests: deterministic sweeps over generated electorates.
//!
//! Tests verify:
//! - The alternative vote always elects exactly one standing candidate
//! - At most `candidates - 1` candidates are eliminated
//! - The winner holds the majority, or is flagged as one vote short
//! - Eliminated candidates never come back in later rounds

use composer::vote::{
    AlternativeVoteEngine, Ballot, Decision, EngineParameters, VoteEngine, VoteResults,
};

/// Small xorshift generator, enough to vary electorates reproducibly.
struct Electorate {
    state: u64,
}

impl Electorate {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1,
        }
    }

    fn next(&mut self, bound: usize) -> usize {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        (self.state % bound as u64) as usize
    }

    /// Ballots ranking a random subset of the candidates, some of them blank.
    fn ballots(&mut self, candidates: &[u32], count: usize) -> Vec<Ballot<u32>> {
        (0..count)
            .map(|i| {
                let length = self.next(candidates.len() + 1);
                let mut ranking = Vec::with_capacity(length);
                for _ in 0..length {
                    ranking.push(candidates[self.next(candidates.len())]);
                }
                Ballot::ranked(format!("elector-{i}"), ranking)
            })
            .collect()
    }
}

fn elect(ballots: &[Ballot<u32>], candidates: &[u32]) -> (u32, VoteResults<u32>) {
    let mut results = VoteResults::new();
    let winner = AlternativeVoteEngine::new()
        .analyze(1, ballots, candidates, &EngineParameters::new(), &mut results)
        .unwrap();
    (winner, results)
}

#[test]
fn test_single_winner_among_candidates() {
    for seed in 0..200 {
        let mut electorate = Electorate::new(seed);
        let candidates: Vec<u32> = (0..1 + electorate.next(6) as u32).collect();
        let count = electorate.next(30);
        let ballots = electorate.ballots(&candidates, count);

        let (winner, results) = elect(&ballots, &candidates);
        assert!(candidates.contains(&winner), "seed {seed}");
        assert_eq!(results.winner(), Some(&winner), "seed {seed}");
        assert!(results.decision().is_some(), "seed {seed}");
    }
}

#[test]
fn test_eliminations_bounded_by_candidate_count() {
    for seed in 0..200 {
        let mut electorate = Electorate::new(seed);
        let candidates: Vec<u32> = (0..1 + electorate.next(8) as u32).collect();
        let count = electorate.next(40);
        let ballots = electorate.ballots(&candidates, count);

        let (_, results) = elect(&ballots, &candidates);
        let eliminated = results
            .rounds()
            .iter()
            .filter(|round| round.eliminated.is_some())
            .count();

        assert!(eliminated < candidates.len(), "seed {seed}");
        assert_eq!(results.rounds().len(), eliminated + 1, "seed {seed}");
        assert!(results.rounds().last().unwrap().eliminated.is_none());
    }
}

#[test]
fn test_winner_holds_majority_or_is_flagged() {
    for seed in 0..200 {
        let mut electorate = Electorate::new(seed);
        let candidates: Vec<u32> = (0..2 + electorate.next(5) as u32).collect();
        let count = electorate.next(25);
        let ballots = electorate.ballots(&candidates, count);

        let (winner, results) = elect(&ballots, &candidates);
        let last = results.rounds().last().unwrap();
        let votes = last
            .tallies
            .iter()
            .find(|(_, candidate)| *candidate == winner)
            .map(|(votes, _)| *votes)
            .unwrap();

        match results.decision().unwrap() {
            Decision::AbsoluteMajority => assert!(votes >= last.majority, "seed {seed}"),
            Decision::NearMajority => assert_eq!(votes + 1, last.majority, "seed {seed}"),
        }
    }
}

#[test]
fn test_eliminated_candidates_stay_out() {
    for seed in 0..100 {
        let mut electorate = Electorate::new(seed);
        let candidates: Vec<u32> = (0..3 + electorate.next(5) as u32).collect();
        let count = 10 + electorate.next(30);
        let ballots = electorate.ballots(&candidates, count);

        let (_, results) = elect(&ballots, &candidates);
        let mut out = Vec::new();
        for round in results.rounds() {
            for (_, candidate) in &round.tallies {
                assert!(!out.contains(candidate), "seed {seed}");
            }
            if let Some(eliminated) = round.eliminated {
                out.push(eliminated);
            }
        }
    }
}

#[test]
fn test_unanimous_first_preference_wins_first_round() {
    let candidates = [1, 2, 3, 4];
    let ballots: Vec<Ballot<u32>> = (0..7)
        .map(|i| Ballot::ranked(format!("elector-{i}"), [3, 1]))
        .collect();

    let (winner, results) = elect(&ballots, &candidates);
    assert_eq!(winner, 3);
    assert_eq!(results.rounds().len(), 1);
    assert_eq!(results.decision(), Some(Decision::AbsoluteMajority));
}
