//! Moving issues through their workflow by transition name.

use crate::tracker::{self, Tracker, Transition};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot fetch transitions for {key}")]
    List {
        key: String,
        #[source]
        source: tracker::Error,
    },
    #[error("No transition matching `{name}' for {key} (available: {})", .available.join(", "))]
    NoMatch {
        key: String,
        name: String,
        available: Vec<String>,
    },
    #[error("Failed to transition {key} via `{name}'")]
    Transition {
        key: String,
        name: String,
        #[source]
        source: tracker::Error,
    },
}

/// First transition whose name contains `name`, ignoring case.
///
/// Candidates are tried in the order the server returned them. Should several transitions match,
/// the result depends on that order.
pub fn find<'a>(transitions: &'a [Transition], name: &str) -> Option<&'a Transition> {
    let needle = name.to_lowercase();
    transitions
        .iter()
        .find(|t| t.name.to_lowercase().contains(&needle))
}

/// Looks up a matching transition and performs it. Returns the transition used.
pub fn perform(tracker: &dyn Tracker, key: &str, name: &str) -> Result<Transition, Error> {
    let avail = tracker.transitions(key).map_err(|source| Error::List {
        key: key.to_owned(),
        source,
    })?;
    let t = find(&avail, name).cloned().ok_or_else(|| Error::NoMatch {
        key: key.to_owned(),
        name: name.to_owned(),
        available: avail.iter().map(|t| t.name.clone()).collect(),
    })?;
    debug!("{}: transition {} -> id {}", key, t.name, t.id);
    tracker
        .transition(key, &t.id)
        .map_err(|source| Error::Transition {
            key: key.to_owned(),
            name: t.name.clone(),
            source,
        })?;
    Ok(t)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tests::{Call, Recorder};
    use assert_matches::assert_matches;

    fn workflow() -> Recorder {
        Recorder::new().with_transitions(&[
            ("11", "Start Progress"),
            ("21", "Resolve Issue"),
            ("31", "Close Issue"),
        ])
    }

    #[test]
    fn substring_ignores_case() {
        let r = workflow();
        assert_eq!(find(&r.transitions, "resolve").unwrap().id, "21");
        assert_eq!(find(&r.transitions, "PROGRESS").unwrap().id, "11");
        assert!(find(&r.transitions, "reopen").is_none());
    }

    #[test]
    fn first_match_wins() {
        let r = workflow();
        assert_eq!(find(&r.transitions, "issue").unwrap().name, "Resolve Issue");
    }

    #[test]
    fn perform_posts_transition_id() {
        let r = workflow();
        let t = perform(&r, "OPS-1", "close").unwrap();
        assert_eq!(t.name, "Close Issue");
        assert_eq!(r.calls(), vec![Call::transition("OPS-1", "31")]);
    }

    #[test]
    fn no_match_lists_candidates() {
        let r = workflow();
        let err = perform(&r, "OPS-1", "reopen").unwrap_err();
        assert_matches!(err, Error::NoMatch { .. });
        assert!(err.to_string().contains("Start Progress, Resolve Issue, Close Issue"));
        assert!(r.calls().is_empty());
    }

    #[test]
    fn failed_post_is_reported() {
        let r = workflow().fail_on("transition");
        assert_matches!(
            perform(&r, "OPS-1", "start"),
            Err(Error::Transition { ref name, .. }) if name == "Start Progress"
        );
    }
}
