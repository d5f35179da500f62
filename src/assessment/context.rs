use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::AnswerToken;

/// Answers recorded so far, keyed by question id.
///
/// Mutated incrementally by the caller as the user answers; every evaluation
/// receives it explicitly so runs stay independent and re-entrant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, AnswerToken>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, question_id: impl Into<String>, token: AnswerToken) {
        self.0.insert(question_id.into(), token);
    }

    pub fn get(&self, question_id: &str) -> Option<AnswerToken> {
        self.0.get(question_id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, AnswerToken> {
        self.0.iter()
    }
}

impl FromIterator<(String, AnswerToken)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (String, AnswerToken)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Boolean facts gathered from the preliminary profile questions, keyed by
/// field name. Populated once, then read-only input to every evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileFacts(BTreeMap<String, bool>);

impl ProfileFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: bool) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<bool> {
        self.0.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, bool)> for ProfileFacts {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
