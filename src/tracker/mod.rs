mod jira;

use crate::issue::Issue;

pub use jira::Jira;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Jira(#[from] jira::Error),
    #[cfg(test)]
    #[error("{0}")]
    Other(String),
}

/// Field definition as returned by the field list
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FieldDef {
    pub id: String,
    pub name: String,
}

/// Workflow transition available from an issue's current status
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub to: Option<Status>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Status {
    pub name: String,
}

/// Remote issue tracker. Each method maps to exactly one API call.
pub trait Tracker {
    fn issue(&self, key: &str) -> Result<Issue, Error>;

    /// All system and custom field definitions
    fn fields(&self) -> Result<Vec<FieldDef>, Error>;

    /// Sets assignee by username. "-1" selects the project's default assignee.
    fn set_assignee(&self, key: &str, name: &str) -> Result<(), Error>;

    fn add_comment(&self, key: &str, body: &str) -> Result<(), Error>;

    /// Transitions in the order returned by the server
    fn transitions(&self, key: &str) -> Result<Vec<Transition>, Error>;

    fn transition(&self, key: &str, id: &str) -> Result<(), Error>;
}
