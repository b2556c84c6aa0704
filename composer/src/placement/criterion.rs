//! Placement criterion capability

use super::component::RawComponent;
use super::event::Event;
use super::isolate::{CandidateId, EligibleIsolate};
use crate::vote::Ballot;

/// An elector of placement elections
///
/// A criterion learns from lifecycle events and, when a component must be
/// placed, ranks the candidate isolates on a ballot. Learning is best effort:
/// events a criterion does not understand are ignored.
pub trait Criterion: Send + Sync {
    /// Name of the criterion, used as elector name on its ballots
    fn name(&self) -> &str;

    /// Fill and lock `ballot` with the candidates suited to host `subject`
    ///
    /// Ballot entries are indices in `candidates`.
    fn vote(
        &self,
        candidates: &[EligibleIsolate],
        subject: &RawComponent,
        ballot: &mut Ballot<CandidateId>,
    );

    /// Learn from a lifecycle event
    fn handle_event(&mut self, event: &Event);

    /// Forget everything learned so far
    fn reset(&mut self) {}

    /// Human readable dump of what the criterion learned
    fn report(&self) -> Option<String> {
        None
    }
}
