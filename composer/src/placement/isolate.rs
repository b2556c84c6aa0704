//! Eligible isolate: a candidate of a placement election
//!
//! An isolate can be elected before it exists. Its name is then negotiated:
//! a single proposal can be outstanding, and once the name is accepted it is
//! final. Isolates that end up without any accepted name get a generated one.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::component::RawComponent;

/// Error type for isolate naming
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    #[error("Isolate already has a name: {0}")]
    AlreadyNamed(String),

    #[error("No rename proposal is pending")]
    NoPendingProposal,
}

/// Result type for isolate naming
pub type NamingResult<T> = Result<T, NamingError>;

/// Index of a candidate in the candidate list of an election
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub usize);

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Progress of the naming negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingState {
    Unnamed,
    Proposed,
    Named,
}

/// Source of generated isolate names, shared by every isolate of a node
#[derive(Debug)]
pub struct IsolateCounter {
    next: AtomicU64,
}

impl IsolateCounter {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Take the next counter value
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IsolateCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Isolate description exchanged with the rest of the runtime
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IsolateDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub components: Vec<RawComponent>,
}

/// A prospective or running isolate that can host components
///
/// Equality and hashing follow the name only: do not use an isolate as a
/// map key before it is named.
#[derive(Debug, Clone, Default)]
pub struct EligibleIsolate {
    name: Option<String>,
    proposed_name: Option<String>,
    language: Option<String>,
    components: BTreeMap<String, RawComponent>,
}

impl EligibleIsolate {
    /// A neutral isolate: no name, no language, no component
    pub fn new() -> Self {
        Self::default()
    }

    /// An isolate with a fixed name
    pub fn named(name: impl Into<String>, language: Option<String>) -> Self {
        Self {
            name: Some(name.into()),
            language,
            ..Self::default()
        }
    }

    /// Add pre-existing components, without changing the language
    pub fn with_components(mut self, components: impl IntoIterator<Item = RawComponent>) -> Self {
        for component in components {
            self.components.insert(component.uid.clone(), component);
        }
        self
    }

    pub fn from_descriptor(descriptor: &IsolateDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            proposed_name: None,
            language: descriptor.language.clone(),
            components: BTreeMap::new(),
        }
        .with_components(descriptor.components.iter().cloned())
    }

    pub fn to_descriptor(&self) -> IsolateDescriptor {
        IsolateDescriptor {
            name: self.name.clone(),
            language: self.language.clone(),
            components: self.components.values().cloned().collect(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn proposed_name(&self) -> Option<&str> {
        self.proposed_name.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn naming_state(&self) -> NamingState {
        if self.name.is_some() {
            NamingState::Named
        } else if self.proposed_name.is_some() {
            NamingState::Proposed
        } else {
            NamingState::Unnamed
        }
    }

    /// Hosted components, ordered by UID
    pub fn components(&self) -> impl Iterator<Item = &RawComponent> {
        self.components.values()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Whether the isolate hosts no component yet
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Factories of the hosted components
    pub fn factories(&self) -> BTreeSet<&str> {
        self.components
            .values()
            .map(|component| component.factory.as_str())
            .collect()
    }

    /// Host a component. The first component decides the isolate language.
    pub fn add_component(&mut self, component: RawComponent) {
        self.adopt_language(&component.language);
        self.components.insert(component.uid.clone(), component);
    }

    /// Take `language` as isolate language if none is set yet
    pub fn adopt_language(&mut self, language: &str) {
        if self.language.is_none() {
            self.language = Some(language.to_string());
        }
    }

    /// Propose a name for this isolate
    ///
    /// Returns `Ok(false)` if another proposal is still pending.
    pub fn propose_rename(&mut self, new_name: impl Into<String>) -> NamingResult<bool> {
        self.ensure_unnamed()?;

        if self.proposed_name.is_some() {
            return Ok(false);
        }

        let new_name = new_name.into();
        debug!(proposed = %new_name, "Isolate rename proposed");
        self.proposed_name = Some(new_name);
        Ok(true)
    }

    /// The pending proposal was accepted: it becomes the final name
    pub fn accepted_rename(&mut self) -> NamingResult<()> {
        self.ensure_unnamed()?;

        let name = self
            .proposed_name
            .take()
            .ok_or(NamingError::NoPendingProposal)?;
        info!(name = %name, "Isolate rename accepted");
        self.name = Some(name);
        Ok(())
    }

    /// The pending proposal was rejected, another one may be made
    pub fn rejected_rename(&mut self) {
        if let Some(rejected) = self.proposed_name.take() {
            debug!(rejected = %rejected, "Isolate rename rejected");
        }
    }

    /// Name the isolate `{node}-{language}-autoNN` if it has no name yet,
    /// and return its name
    pub fn generate_name(&mut self, node: &str, counter: &IsolateCounter) -> &str {
        let language = self.language.as_deref().unwrap_or("neutral");
        let name = self.name.get_or_insert_with(|| {
            let name = format!("{node}-{language}-auto{:02}", counter.next());
            info!(name = %name, "Isolate name generated");
            name
        });
        name.as_str()
    }

    fn ensure_unnamed(&self) -> NamingResult<()> {
        match &self.name {
            Some(name) => Err(NamingError::AlreadyNamed(name.clone())),
            None => Ok(()),
        }
    }
}

impl PartialEq for EligibleIsolate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EligibleIsolate {}

impl Hash for EligibleIsolate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for EligibleIsolate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, &self.language) {
            (_, None) => write!(f, "NeutralIsolate"),
            (Some(name), Some(language)) => write!(
                f,
                "EligibleIsolate({name}, {language}, {} components)",
                self.components.len()
            ),
            (None, Some(language)) => write!(
                f,
                "EligibleIsolate(<unnamed>, {language}, {} components)",
                self.components.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_rename_is_final() {
        let mut isolate = EligibleIsolate::new();
        assert_eq!(isolate.naming_state(), NamingState::Unnamed);

        assert_eq!(isolate.propose_rename("X"), Ok(true));
        assert_eq!(isolate.naming_state(), NamingState::Proposed);
        isolate.accepted_rename().unwrap();

        assert_eq!(isolate.name(), Some("X"));
        assert_eq!(isolate.proposed_name(), None);
        assert_eq!(isolate.naming_state(), NamingState::Named);
        assert_eq!(
            isolate.propose_rename("Y"),
            Err(NamingError::AlreadyNamed("X".to_string()))
        );
        assert_eq!(
            isolate.accepted_rename(),
            Err(NamingError::AlreadyNamed("X".to_string()))
        );
    }

    #[test]
    fn test_single_outstanding_proposal() {
        let mut isolate = EligibleIsolate::new();
        assert_eq!(isolate.propose_rename("first"), Ok(true));
        assert_eq!(isolate.propose_rename("second"), Ok(false));
        assert_eq!(isolate.proposed_name(), Some("first"));
    }

    #[test]
    fn test_rejected_rename_allows_new_proposal() {
        let mut isolate = EligibleIsolate::new();
        isolate.propose_rename("first").unwrap();
        isolate.rejected_rename();

        assert_eq!(isolate.naming_state(), NamingState::Unnamed);
        assert_eq!(isolate.propose_rename("second"), Ok(true));
        isolate.accepted_rename().unwrap();
        assert_eq!(isolate.name(), Some("second"));
    }

    #[test]
    fn test_accept_without_proposal_fails() {
        let mut isolate = EligibleIsolate::new();
        assert_eq!(
            isolate.accepted_rename(),
            Err(NamingError::NoPendingProposal)
        );
        assert_eq!(isolate.name(), None);
    }

    #[test]
    fn test_generated_names_use_shared_counter() {
        let counter = IsolateCounter::new();
        let mut first = EligibleIsolate::new();
        first.add_component(RawComponent::new("a", "fa", "python"));
        let mut second = EligibleIsolate::new();
        second.add_component(RawComponent::new("b", "fb", "java"));

        assert_eq!(first.generate_name("node", &counter), "node-python-auto01");
        assert_eq!(second.generate_name("node", &counter), "node-java-auto02");
        // Already named: neither renamed nor counted
        assert_eq!(first.generate_name("other", &counter), "node-python-auto01");
        assert_eq!(counter.next(), 3);
    }

    #[test]
    fn test_generate_name_keeps_negotiated_name() {
        let counter = IsolateCounter::new();
        let mut isolate = EligibleIsolate::named("fixed", Some("rust".into()));
        assert_eq!(isolate.generate_name("node", &counter), "fixed");
        assert_eq!(counter.next(), 1);
    }

    #[test]
    fn test_first_component_sets_language() {
        let mut isolate = EligibleIsolate::new();
        let component = RawComponent::new("a", "fa", "python");
        isolate.add_component(component.clone());
        isolate.add_component(component);
        isolate.add_component(RawComponent::new("b", "fb", "java"));

        assert_eq!(isolate.language(), Some("python"));
        assert_eq!(isolate.component_count(), 2);
        assert_eq!(isolate.factories(), BTreeSet::from(["fa", "fb"]));
    }

    #[test]
    fn test_adopt_language_keeps_existing() {
        let mut isolate = EligibleIsolate::new();
        isolate.adopt_language("rust");
        isolate.adopt_language("python");

        assert_eq!(isolate.language(), Some("rust"));
        assert!(isolate.is_empty());
    }

    #[test]
    fn test_identity_follows_name() {
        let a = EligibleIsolate::named("iso", Some("python".into()));
        let b = EligibleIsolate::named("iso", None)
            .with_components([RawComponent::new("a", "fa", "java")]);
        assert_eq!(a, b);
        assert_ne!(a, EligibleIsolate::named("other", None));
    }

    #[test]
    fn test_descriptor_conversion() {
        let descriptor = IsolateDescriptor {
            name: Some("iso-1".into()),
            language: Some("python".into()),
            components: vec![RawComponent::new("a", "fa", "python").with_uid("uid-a")],
        };
        let isolate = EligibleIsolate::from_descriptor(&descriptor);

        assert_eq!(isolate.name(), Some("iso-1"));
        assert_eq!(isolate.component_count(), 1);
        assert_eq!(isolate.to_descriptor(), descriptor);
    }

    #[test]
    fn test_display() {
        assert_eq!(EligibleIsolate::new().to_string(), "NeutralIsolate");
        let isolate = EligibleIsolate::named("iso", Some("rust".into()));
        assert_eq!(isolate.to_string(), "EligibleIsolate(iso, rust, 0 components)");
    }
}
