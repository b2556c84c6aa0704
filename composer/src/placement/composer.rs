//! Node composer: runs placement elections on a node
//!
//! Every criterion fills a ballot over the candidate isolates, the ballots
//! are merged according to the criteria weights and the vote engine elects
//! the isolate hosting the component.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::compatibility::CompatibilityCriterion;
use super::component::RawComponent;
use super::criterion::Criterion;
use super::event::Event;
use super::isolate::{CandidateId, EligibleIsolate, IsolateCounter};
use crate::config::ComposerConfig;
use crate::status::{EntityKind, SharedComposerStatus, StatusError};
use crate::vote::{
    AlternativeVoteEngine, Ballot, BallotMerge, EngineParameters, VoteEngine, VoteError,
    VoteResults, WeightedBallot, WeightedReplication, ALTERNATIVE_VOTE_KIND,
};

/// Error type for placement operations
#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("Vote error: {0}")]
    Vote(#[from] VoteError),

    #[error("Status error: {0}")]
    Status(#[from] StatusError),
}

/// Result type for placement operations
pub type ComposerResult<T> = Result<T, ComposerError>;

/// What a node composer needs from the rest of the node
#[derive(Clone)]
pub struct PlacementContext {
    pub node_name: String,
    pub counter: Arc<IsolateCounter>,
    pub status: SharedComposerStatus,
}

impl PlacementContext {
    /// Context with a fresh isolate counter
    pub fn new(node_name: impl Into<String>, status: SharedComposerStatus) -> Self {
        Self {
            node_name: node_name.into(),
            counter: Arc::new(IsolateCounter::new()),
            status,
        }
    }
}

/// Outcome of a placement election
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementDecision {
    /// The placed component, with its isolate and node set
    pub component: RawComponent,
    /// Name of the elected isolate
    pub isolate: String,
    /// Index of the elected isolate in the candidates
    pub candidate: CandidateId,
    /// Whether the elected isolate is the neutral one offered by the composer
    pub new_isolate: bool,
    /// Election results, candidates designated by isolate name
    pub results: VoteResults<String>,
}

struct WeightedCriterion {
    weight: f64,
    criterion: Box<dyn Criterion>,
}

/// Places components on the isolates of a node
pub struct NodeComposer {
    context: PlacementContext,
    criteria: Vec<WeightedCriterion>,
    engine: Box<dyn VoteEngine<CandidateId>>,
    merge: Box<dyn BallotMerge<CandidateId>>,
    parameters: EngineParameters,
    offer_neutral_isolate: bool,
    elections: u32,
}

impl NodeComposer {
    /// Composer without criteria, counting with the alternative vote
    pub fn new(context: PlacementContext) -> Self {
        Self {
            context,
            criteria: Vec::new(),
            engine: Box::new(AlternativeVoteEngine::new()),
            merge: Box::new(WeightedReplication),
            parameters: EngineParameters::new(),
            offer_neutral_isolate: true,
            elections: 0,
        }
    }

    /// Composer with the engine and criteria described by `config`
    pub fn from_config(config: &ComposerConfig, context: PlacementContext) -> ComposerResult<Self> {
        let engine: Box<dyn VoteEngine<CandidateId>> = match config.engine_kind.as_str() {
            ALTERNATIVE_VOTE_KIND => Box::new(AlternativeVoteEngine::new()),
            other => return Err(VoteError::UnknownEngine(other.to_string()).into()),
        };

        let compatibility = CompatibilityCriterion::with_config(config.compatibility.clone());
        Ok(Self::new(context)
            .with_engine(engine)
            .with_criterion(Box::new(compatibility), config.compatibility_weight)
            .with_neutral_isolate(config.offer_neutral_isolate))
    }

    pub fn with_criterion(mut self, criterion: Box<dyn Criterion>, weight: f64) -> Self {
        self.criteria.push(WeightedCriterion { weight, criterion });
        self
    }

    pub fn with_engine(mut self, engine: Box<dyn VoteEngine<CandidateId>>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_merge(mut self, merge: Box<dyn BallotMerge<CandidateId>>) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_neutral_isolate(mut self, offer: bool) -> Self {
        self.offer_neutral_isolate = offer;
        self
    }

    pub fn context(&self) -> &PlacementContext {
        &self.context
    }

    /// Number of elections run so far
    pub fn elections(&self) -> u32 {
        self.elections
    }

    /// Let every criterion learn from an event
    pub fn handle_event(&mut self, event: &Event) {
        debug!(event = %event, criteria = self.criteria.len(), "Forwarding event");
        for weighted in &mut self.criteria {
            weighted.criterion.handle_event(event);
        }
    }

    /// Make every criterion forget what it learned
    pub fn reset(&mut self) {
        for weighted in &mut self.criteria {
            weighted.criterion.reset();
        }
    }

    /// (criterion name, report) of the criteria having something to report
    pub fn reports(&self) -> Vec<(String, String)> {
        self.criteria
            .iter()
            .filter_map(|weighted| {
                weighted
                    .criterion
                    .report()
                    .map(|report| (weighted.criterion.name().to_string(), report))
            })
            .collect()
    }

    /// Elect the isolate hosting `subject` among `candidates`
    ///
    /// Only isolates without language or with the language of the subject
    /// can be elected. When the neutral isolate is offered and wins, it is
    /// left at the end of `candidates`.
    pub fn place(
        &mut self,
        candidates: &mut Vec<EligibleIsolate>,
        mut subject: RawComponent,
    ) -> ComposerResult<PlacementDecision> {
        let status = Arc::clone(&self.context.status);
        if status.has_component(&subject.uid)? {
            return Err(StatusError::DuplicateUid {
                kind: EntityKind::Component,
                uid: subject.uid,
            }
            .into());
        }

        let neutral = if self.offer_neutral_isolate {
            candidates.push(EligibleIsolate::new());
            Some(CandidateId(candidates.len() - 1))
        } else {
            None
        };

        let eligible: Vec<CandidateId> = candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| {
                candidate
                    .language()
                    .map_or(true, |language| language == subject.language)
            })
            .map(|(index, _)| CandidateId(index))
            .collect();

        let mut ballots = Vec::with_capacity(self.criteria.len());
        for weighted in &self.criteria {
            let mut ballot = Ballot::new(weighted.criterion.name());
            weighted.criterion.vote(candidates, &subject, &mut ballot);
            ballots.push(WeightedBallot {
                weight: weighted.weight,
                ballot,
            });
        }
        let ballots = self.merge.merge(ballots);

        self.elections += 1;
        let mut results = VoteResults::new();
        let elected = match self.engine.analyze(
            self.elections,
            &ballots,
            &eligible,
            &self.parameters,
            &mut results,
        ) {
            Ok(elected) => elected,
            Err(e) => {
                if neutral.is_some() {
                    candidates.pop();
                }
                return Err(e.into());
            }
        };

        let new_isolate = neutral == Some(elected);

        // Work on a copy of the winner: candidates only change once the
        // status accepted the placement
        let mut winner = candidates[elected.0].clone();
        winner.adopt_language(&subject.language);
        let isolate = winner
            .generate_name(&self.context.node_name, &self.context.counter)
            .to_string();
        subject.isolate = Some(isolate.clone());
        subject.node = Some(self.context.node_name.clone());

        if let Err(e) = self.register(&subject, &isolate, new_isolate) {
            if neutral.is_some() {
                candidates.pop();
            }
            return Err(e);
        }

        winner.add_component(subject.clone());
        candidates[elected.0] = winner;

        let named: &[EligibleIsolate] = candidates;
        let results = results.map(|id| candidate_label(named, *id, neutral));
        if neutral.is_some() && !new_isolate {
            candidates.pop();
        }

        info!(
            component = %subject.name,
            isolate = %isolate,
            new_isolate,
            decision = ?results.decision(),
            election = self.elections,
            "Component placed"
        );

        Ok(PlacementDecision {
            component: subject,
            isolate,
            candidate: elected,
            new_isolate,
            results,
        })
    }

    /// Record the placed component, and the agent of a new isolate, in the
    /// status. Nothing stays registered on error.
    fn register(
        &self,
        subject: &RawComponent,
        isolate: &str,
        new_isolate: bool,
    ) -> ComposerResult<()> {
        let status = &self.context.status;
        if new_isolate {
            status.agent_requested(isolate)?;
        }

        if let Err(e) = status.component_requested(subject) {
            if new_isolate {
                if let Err(rollback) = status.remove_agent(isolate) {
                    warn!(isolate, "Failed to forget agent: {}", rollback);
                }
            }
            return Err(e.into());
        }
        Ok(())
    }
}

fn candidate_label(
    candidates: &[EligibleIsolate],
    id: CandidateId,
    neutral: Option<CandidateId>,
) -> String {
    match candidates.get(id.0).and_then(EligibleIsolate::name) {
        Some(name) => name.to_string(),
        None if neutral == Some(id) => "neutral".to_string(),
        None => id.to_string(),
    }
}
