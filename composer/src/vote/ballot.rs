//! Ballot: one elector's ranked preferences and rejections
//!
//! A ballot is filled by a criterion and then locked. Once locked it can
//! no longer be modified, so the vote engine always sees a stable view.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Error type for ballot operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BallotError {
    #[error("Ballot of {0} is locked")]
    Locked(String),
}

/// Result type for ballot operations
pub type BallotResult<T> = Result<T, BallotError>;

/// Ranked preferences of one elector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ballot<C> {
    /// Name of the elector that filled this ballot
    elector: String,
    /// Preferred candidates, most preferred first
    preferences: Vec<C>,
    /// Rejected candidates
    rejections: Vec<C>,
    /// Whether the ballot can still be modified
    locked: bool,
}

impl<C: Clone + PartialEq> Ballot<C> {
    /// Create an empty, unlocked ballot
    pub fn new(elector: impl Into<String>) -> Self {
        Self {
            elector: elector.into(),
            preferences: Vec::new(),
            rejections: Vec::new(),
            locked: false,
        }
    }

    /// Build a locked ballot from an already ranked list
    ///
    /// Duplicates are dropped, keeping the first (highest) rank.
    pub fn ranked(elector: impl Into<String>, preferences: impl IntoIterator<Item = C>) -> Self {
        let mut ballot = Self::new(elector);
        for candidate in preferences {
            if !ballot.preferences.contains(&candidate) {
                ballot.preferences.push(candidate);
            }
        }
        ballot.locked = true;
        ballot
    }

    /// Name of the elector
    pub fn elector(&self) -> &str {
        &self.elector
    }

    /// Ranked preferences, most preferred first
    pub fn preferences(&self) -> &[C] {
        &self.preferences
    }

    /// Rejected candidates, in the order they were rejected
    pub fn rejections(&self) -> &[C] {
        &self.rejections
    }

    /// Most preferred candidate, if any
    pub fn first_choice(&self) -> Option<&C> {
        self.preferences.first()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether the elector neither ranked nor rejected anybody
    pub fn is_blank(&self) -> bool {
        self.preferences.is_empty() && self.rejections.is_empty()
    }

    /// Append a candidate at the lowest preference rank
    ///
    /// Does nothing if the candidate is already ranked. A rejected candidate
    /// is moved out of the rejections.
    pub fn append_for(&mut self, candidate: C) -> BallotResult<()> {
        self.ensure_unlocked()?;

        self.rejections.retain(|c| c != &candidate);
        if !self.preferences.contains(&candidate) {
            self.preferences.push(candidate);
        }
        Ok(())
    }

    /// Reject a candidate, removing it from the preferences if needed
    pub fn append_against(&mut self, candidate: C) -> BallotResult<()> {
        self.ensure_unlocked()?;

        self.preferences.retain(|c| c != &candidate);
        if !self.rejections.contains(&candidate) {
            self.rejections.push(candidate);
        }
        Ok(())
    }

    /// Freeze the ballot. Locking twice is harmless.
    pub fn lock(&mut self) {
        if !self.locked {
            self.locked = true;
            debug!(
                elector = %self.elector,
                preferences = self.preferences.len(),
                rejections = self.rejections.len(),
                "Ballot locked"
            );
        }
    }

    fn ensure_unlocked(&self) -> BallotResult<()> {
        if self.locked {
            Err(BallotError::Locked(self.elector.clone()))
        } else {
            Ok(())
        }
    }
}
