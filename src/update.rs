//! Assign and/or comment on a single issue.
//!
//! Assignment and comment are separate API calls so that users holding only the assign or only
//! the comment permission can still do their part.

use crate::tracker::{self, Tracker};
use crate::workitem::UNASSIGN;

use std::fmt;
use thiserror::Error;

/// Username which reverts to the project's default assignee
pub static DEFAULT_ASSIGNEE: &str = "-1";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Nothing to do for {0}: neither comment nor assignee given")]
    Nothing(String),
    #[error(
        "Clearing the assignee is rejected by Jira; use `{}' to revert to the default assignee",
        DEFAULT_ASSIGNEE
    )]
    Unassign,
    #[error("Failed to assign {key} to {assignee}")]
    Assign {
        key: String,
        assignee: String,
        #[source]
        source: tracker::Error,
    },
    #[error("Failed to add comment to {key}")]
    Comment {
        key: String,
        #[source]
        source: tracker::Error,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeDirective {
    Default,
    User(String),
}

impl AssigneeDirective {
    /// Blank names are treated like the unassign sentinel.
    pub fn parse(s: &str) -> Result<Self> {
        if s == DEFAULT_ASSIGNEE {
            Ok(AssigneeDirective::Default)
        } else if s.trim().is_empty() || s.eq_ignore_ascii_case(UNASSIGN) {
            Err(Error::Unassign)
        } else {
            Ok(AssigneeDirective::User(s.to_owned()))
        }
    }

    /// Value as sent to the assignee endpoint
    pub fn as_str(&self) -> &str {
        match self {
            AssigneeDirective::Default => DEFAULT_ASSIGNEE,
            AssigneeDirective::User(u) => u,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub issue_key: String,
    pub comment: Option<String>,
    pub assignee: Option<String>,
}

/// What has been changed remotely
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub assigned: Option<String>,
    pub commented: bool,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.assigned, self.commented) {
            (Some(a), true) => write!(f, "assigned to {}, comment added", a),
            (Some(a), false) => write!(f, "assigned to {}", a),
            (None, true) => write!(f, "comment added"),
            (None, false) => write!(f, "unchanged"),
        }
    }
}

impl Update {
    pub fn new(issue_key: &str) -> Self {
        Self {
            issue_key: issue_key.to_owned(),
            ..Self::default()
        }
    }

    pub fn comment<S: Into<String>>(mut self, body: S) -> Self {
        self.comment = Some(body.into());
        self
    }

    pub fn assignee<S: Into<String>>(mut self, name: S) -> Self {
        self.assignee = Some(name.into());
        self
    }

    /// Checks everything which can be checked without contacting the tracker.
    pub fn validate(&self) -> Result<Option<AssigneeDirective>> {
        if self.comment.is_none() && self.assignee.is_none() {
            return Err(Error::Nothing(self.issue_key.clone()));
        }
        self.assignee
            .as_deref()
            .map(AssigneeDirective::parse)
            .transpose()
    }

    pub fn apply(&self, tracker: &dyn Tracker) -> Result<Outcome> {
        let key = &self.issue_key;
        let directive = self.validate()?;
        let mut outcome = Outcome::default();
        if let Some(d) = directive {
            tracker
                .set_assignee(key, d.as_str())
                .map_err(|source| Error::Assign {
                    key: key.clone(),
                    assignee: d.as_str().to_owned(),
                    source,
                })?;
            outcome.assigned = Some(d.as_str().to_owned());
        }
        if let Some(body) = &self.comment {
            tracker
                .add_comment(key, body)
                .map_err(|source| Error::Comment {
                    key: key.clone(),
                    source,
                })?;
            outcome.commented = true;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tests::{Call, Recorder};
    use assert_matches::assert_matches;

    #[test]
    fn default_assignee_passes_through() {
        let r = Recorder::new();
        let out = Update::new("ABC-1").assignee("-1").apply(&r).unwrap();
        assert_eq!(out.assigned.as_deref(), Some("-1"));
        assert!(!out.commented);
        assert_eq!(r.calls(), vec![Call::assign("ABC-1", "-1")]);
    }

    #[test]
    fn unassign_makes_no_call() {
        for name in &["unassigned", "UNASSIGNED", "Unassigned"] {
            let r = Recorder::new();
            let res = Update::new("ABC-1")
                .assignee(*name)
                .comment("hello")
                .apply(&r);
            assert_matches!(res, Err(Error::Unassign));
            assert!(r.calls().is_empty());
        }
    }

    #[test]
    fn blank_assignee_makes_no_call() {
        for name in &["", " ", "\t"] {
            let r = Recorder::new();
            let res = Update::new("ABC-1").assignee(*name).apply(&r);
            assert_matches!(res, Err(Error::Unassign));
            assert!(r.calls().is_empty());
        }
    }

    #[test]
    fn validate_without_tracker() {
        assert_matches!(Update::new("ABC-1").validate(), Err(Error::Nothing(_)));
        assert_matches!(
            Update::new("ABC-1").assignee("unassigned").validate(),
            Err(Error::Unassign)
        );
        assert_eq!(
            Update::new("ABC-1").assignee("-1").validate().unwrap(),
            Some(AssigneeDirective::Default)
        );
        assert_eq!(Update::new("ABC-1").comment("x").validate().unwrap(), None);
    }

    #[test]
    fn assign_then_comment() {
        let r = Recorder::new();
        let out = Update::new("ABC-1")
            .assignee("jane.doe")
            .comment("*bold* {code}x{code}")
            .apply(&r)
            .unwrap();
        assert_eq!(
            out,
            Outcome {
                assigned: Some("jane.doe".into()),
                commented: true
            }
        );
        assert_eq!(
            r.calls(),
            vec![
                Call::assign("ABC-1", "jane.doe"),
                Call::comment("ABC-1", "*bold* {code}x{code}")
            ]
        );
    }

    #[test]
    fn nothing_given() {
        let r = Recorder::new();
        assert_matches!(Update::new("ABC-1").apply(&r), Err(Error::Nothing(_)));
        assert!(r.calls().is_empty());
    }

    #[test]
    fn failed_assign_names_the_call() {
        let r = Recorder::new().fail_on("assign");
        let res = Update::new("ABC-1").assignee("bob").comment("x").apply(&r);
        assert_matches!(res, Err(Error::Assign { ref key, .. }) if key == "ABC-1");
        // comment is not attempted after a failure
        assert!(r.calls().is_empty());
    }

    #[test]
    fn failed_comment_names_the_call() {
        let r = Recorder::new().fail_on("comment");
        let res = Update::new("ABC-1").assignee("bob").comment("x").apply(&r);
        assert_matches!(res, Err(Error::Comment { .. }));
        assert_eq!(r.calls(), vec![Call::assign("ABC-1", "bob")]);
    }
}
