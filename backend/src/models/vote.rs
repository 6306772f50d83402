//! Vote membership and toggle payloads.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Direction of a vote.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Ups,
    Downs,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Ups => "ups",
            VoteType::Downs => "downs",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ups" => Ok(VoteType::Ups),
            "downs" => Ok(VoteType::Downs),
            other => Err(format!("Unknown vote type: {}", other)),
        }
    }
}

/// Voter membership of a video request. A voter id is in at most one of the sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Votes {
    pub ups: BTreeSet<String>,
    pub downs: BTreeSet<String>,
}

impl Votes {
    /// Ups count minus downs count.
    pub fn score(&self) -> i64 {
        self.ups.len() as i64 - self.downs.len() as i64
    }

    /// Record a stored vote row.
    pub fn insert(&mut self, direction: VoteType, voter_id: String) {
        match direction {
            VoteType::Ups => self.ups.insert(voter_id),
            VoteType::Downs => self.downs.insert(voter_id),
        };
    }
}

/// Request body for `PUT /video-request/vote`.
#[derive(Debug, Clone, Deserialize)]
pub struct VoteRequest {
    pub id: String,
    pub vote_type: VoteType,
    #[serde(default)]
    pub user_id: String,
}

/// Vote counts returned after a toggle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteTally {
    pub id: String,
    pub ups: usize,
    pub downs: usize,
    pub score: i64,
}

impl VoteTally {
    pub fn new(id: impl Into<String>, votes: &Votes) -> Self {
        Self {
            id: id.into(),
            ups: votes.ups.len(),
            downs: votes.downs.len(),
            score: votes.score(),
        }
    }
}
