//! Compatibility criterion: learned affinity between component factories
//!
//! Each unordered pair of factories has a rating in `[0, 100]`. Pairs that
//! keep running together (timer events) slowly gain compatibility, pairs
//! that were hosted by a lost isolate lose it quickly. When placing a
//! component, an isolate is as compatible as its worst co-located factory.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn, Level};

use super::component::RawComponent;
use super::criterion::Criterion;
use super::event::{Event, EVENT_ISOLATE_LOST, EVENT_TIMER};
use super::isolate::{CandidateId, EligibleIsolate};
use crate::vote::Ballot;

/// Name of the compatibility criterion
pub const COMPATIBILITY_CRITERION: &str = "compatibility";

/// Score of an isolate without any conflicting factory
const FULL_COMPATIBILITY: f64 = 100.0;

/// Lowest possible rating
const MIN_RATING: f64 = 0.0;

/// Seed rating of a factory pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialRating {
    pub first: String,
    pub second: String,
    pub rating: f64,
}

/// Tuning of the compatibility criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibilityConfig {
    /// Rating of a pair never seen before
    pub default_rating: f64,
    /// Rating change on a timer (good) event
    pub timer_delta: f64,
    /// Rating change on an isolate lost (bad) event
    pub lost_delta: f64,
    /// Minimal score to vote for an isolate
    pub accept_threshold: f64,
    /// Scores below this one vote against an isolate
    pub reject_threshold: f64,
    /// Ratings known before any event
    pub initial_ratings: Vec<InitialRating>,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            default_rating: 50.0,
            timer_delta: 2.0,
            lost_delta: -5.0,
            accept_threshold: 50.0,
            reject_threshold: 30.0,
            initial_ratings: Vec::new(),
        }
    }
}

/// Unordered pair of factory names
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactoryPair(String, String);

impl FactoryPair {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }

    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }
}

impl std::fmt::Display for FactoryPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Votes for the isolates hosting the most compatible factories
#[derive(Debug, Clone, Default)]
pub struct CompatibilityCriterion {
    config: CompatibilityConfig,
    ratings: HashMap<FactoryPair, f64>,
}

impl CompatibilityCriterion {
    pub fn new() -> Self {
        Self::with_config(CompatibilityConfig::default())
    }

    /// Create a criterion, seeded with the configured initial ratings
    pub fn with_config(config: CompatibilityConfig) -> Self {
        let mut criterion = Self {
            config,
            ratings: HashMap::new(),
        };
        criterion.seed();
        criterion
    }

    pub fn config(&self) -> &CompatibilityConfig {
        &self.config
    }

    /// Rating of a pair of factories
    pub fn rating(&self, a: &str, b: &str) -> f64 {
        self.ratings
            .get(&FactoryPair::new(a, b))
            .copied()
            .unwrap_or(self.config.default_rating)
    }

    /// Force the rating of a pair, clamped to the valid range
    pub fn set_rating(&mut self, a: &str, b: &str, rating: f64) {
        self.ratings.insert(FactoryPair::new(a, b), clamp_rating(rating));
    }

    /// Every learned rating, ordered by pair
    pub fn ratings(&self) -> Vec<(FactoryPair, f64)> {
        let mut ratings: Vec<(FactoryPair, f64)> = self
            .ratings
            .iter()
            .map(|(pair, rating)| (pair.clone(), *rating))
            .collect();
        ratings.sort_by(|a, b| a.0.cmp(&b.0));
        ratings
    }

    /// Compatibility of `factory` with the components hosted by `candidate`
    pub fn score(&self, candidate: &EligibleIsolate, factory: &str) -> f64 {
        if candidate.is_empty() {
            return FULL_COMPATIBILITY;
        }

        candidate
            .factories()
            .into_iter()
            .filter(|hosted| *hosted != factory)
            .map(|hosted| self.rating(factory, hosted))
            .reduce(f64::min)
            .unwrap_or(FULL_COMPATIBILITY)
    }

    /// Factory x factory table of the learned ratings
    pub fn ratings_matrix(&self) -> String {
        let factories: BTreeSet<&str> = self
            .ratings
            .keys()
            .flat_map(|pair| [pair.first(), pair.second()])
            .collect();
        if factories.is_empty() {
            return String::new();
        }

        let width = factories
            .iter()
            .map(|f| f.len())
            .max()
            .unwrap_or(0)
            .max(6);

        let mut table = format!("{:width$}", "");
        for factory in &factories {
            table.push_str(&format!(" | {factory:>width$}"));
        }
        for row in &factories {
            table.push('\n');
            table.push_str(&format!("{row:width$}"));
            for column in &factories {
                let cell = match self.ratings.get(&FactoryPair::new(row, column)) {
                    Some(rating) if row != column => format!("{rating:.1}"),
                    _ => String::new(),
                };
                table.push_str(&format!(" | {cell:>width$}"));
            }
        }
        table
    }

    fn seed(&mut self) {
        let initial = std::mem::take(&mut self.config.initial_ratings);
        for seed in &initial {
            if seed.first != seed.second {
                self.set_rating(&seed.first, &seed.second, seed.rating);
            }
        }
        self.config.initial_ratings = initial;
    }
}

fn clamp_rating(rating: f64) -> f64 {
    if rating.is_nan() {
        MIN_RATING
    } else {
        rating.clamp(MIN_RATING, FULL_COMPATIBILITY)
    }
}

impl Criterion for CompatibilityCriterion {
    fn name(&self) -> &str {
        COMPATIBILITY_CRITERION
    }

    fn vote(
        &self,
        candidates: &[EligibleIsolate],
        subject: &RawComponent,
        ballot: &mut Ballot<CandidateId>,
    ) {
        let mut scores: Vec<(f64, CandidateId)> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| (self.score(candidate, &subject.factory), CandidateId(index)))
            .collect();

        // Stable: equally compatible candidates keep their order
        scores.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        for (score, candidate) in scores {
            let marked = if score >= self.config.accept_threshold {
                ballot.append_for(candidate)
            } else if score < self.config.reject_threshold {
                ballot.append_against(candidate)
            } else {
                Ok(())
            };

            if let Err(e) = marked {
                warn!(subject = %subject.name, "Compatibility vote dropped: {}", e);
                return;
            }
            debug!(subject = %subject.name, %candidate, score, "Compatibility score");
        }

        ballot.lock();
    }

    fn handle_event(&mut self, event: &Event) {
        let delta = match event.kind.as_str() {
            EVENT_ISOLATE_LOST | EVENT_TIMER if event.good => self.config.timer_delta,
            EVENT_ISOLATE_LOST | EVENT_TIMER => self.config.lost_delta,
            _ => return,
        };

        let factories: Vec<&str> = event
            .components
            .iter()
            .map(|component| component.factory.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        for (i, first) in factories.iter().enumerate() {
            for second in &factories[i + 1..] {
                let pair = FactoryPair::new(first, second);
                let default = self.config.default_rating;
                let rating = self.ratings.entry(pair).or_insert(default);
                *rating = clamp_rating(*rating + delta);
            }
        }

        debug!(
            source = %event.source_name,
            kind = %event.kind,
            delta,
            factories = factories.len(),
            "Compatibility ratings updated"
        );
        if tracing::enabled!(Level::DEBUG) && factories.len() > 1 {
            debug!("Compatibility matrix:\n{}", self.ratings_matrix());
        }
    }

    fn reset(&mut self) {
        self.ratings.clear();
        self.seed();
    }

    fn report(&self) -> Option<String> {
        Some(self.ratings_matrix())
    }
}
