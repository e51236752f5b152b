//! Pending work items and their file name protocol.
//!
//! A work item is a plain text file in the scan directory. Its name encodes the target issue and
//! an optional assignee: `KEY.txt` or `KEY.ASSIGNEE.txt`. Dots inside usernames are written as
//! underscores since the dot separates fields.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Assignee value which asks for the assignee to be cleared
pub static UNASSIGN: &str = "unassigned";

static SUFFIX: &str = ".txt";

lazy_static! {
    static ref ISSUE_KEY: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*-[0-9]+$").unwrap();
    static ref USERNAME: Regex = Regex::new(r"^[A-Za-z0-9.-]+$").unwrap();
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("{0}: not a .txt file")]
    NotText(String),
    #[error("{file}: `{key}' is not a valid issue key")]
    IssueKey { file: String, key: String },
    #[error("{0}: too many name segments (expected ISSUE[.ASSIGNEE].txt)")]
    Segments(String),
    #[error("{file}: invalid assignee `{assignee}' (allowed: letters, digits, '.', '-')")]
    Assignee { file: String, assignee: String },
}

type Result<T, E = ParseError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Assignee {
    /// Leave the assignee alone
    Unset,
    /// Username with dots restored
    Named(String),
}

impl Assignee {
    /// True for the explicit-unassign sentinel, regardless of case
    pub fn is_unassign(&self) -> bool {
        match self {
            Assignee::Named(n) => n.eq_ignore_ascii_case(UNASSIGN),
            Assignee::Unset => false,
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Assignee::Named(n) => Some(n),
            Assignee::Unset => None,
        }
    }
}

impl Default for Assignee {
    fn default() -> Self {
        Assignee::Unset
    }
}

/// Decoded work item file name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WorkItem {
    pub issue_key: String,
    pub assignee: Assignee,
}

impl WorkItem {
    /// Constructs a work item from user input, applying the same checks as the parser.
    pub fn new(issue_key: &str, assignee: Option<&str>) -> Result<Self> {
        let item = Self {
            issue_key: issue_key.to_owned(),
            assignee: assignee.map_or(Assignee::Unset, |a| Assignee::Named(a.to_owned())),
        };
        let name = item.file_name();
        item.validate(&name)?;
        Ok(item)
    }

    /// Decodes `ISSUE.txt`, `ISSUE..txt` and `ISSUE.ASSIGNEE.txt`.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let stem = name
            .strip_suffix(SUFFIX)
            .ok_or_else(|| ParseError::NotText(name.to_owned()))?;
        let mut seg = stem.splitn(2, '.');
        let issue_key = seg.next().unwrap_or_default().to_owned();
        let assignee = match seg.next() {
            None => Assignee::Unset,
            Some("") => Assignee::Named(UNASSIGN.to_owned()),
            Some(a) if a.contains('.') => return Err(ParseError::Segments(name.to_owned())),
            Some(a) => Assignee::Named(a.replace('_', ".")),
        };
        let item = Self {
            issue_key,
            assignee,
        };
        item.validate(name)?;
        Ok(item)
    }

    fn validate(&self, file: &str) -> Result<()> {
        if !ISSUE_KEY.is_match(&self.issue_key) {
            return Err(ParseError::IssueKey {
                file: file.to_owned(),
                key: self.issue_key.clone(),
            });
        }
        if let Assignee::Named(a) = &self.assignee {
            if !USERNAME.is_match(a) {
                return Err(ParseError::Assignee {
                    file: file.to_owned(),
                    assignee: a.clone(),
                });
            }
        }
        Ok(())
    }

    /// Encoded file name (without directory)
    pub fn file_name(&self) -> String {
        match &self.assignee {
            Assignee::Unset => format!("{}{}", self.issue_key, SUFFIX),
            Assignee::Named(a) => format!("{}.{}{}", self.issue_key, a.replace('.', "_"), SUFFIX),
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.assignee {
            Assignee::Unset => write!(f, "{}", self.issue_key),
            Assignee::Named(a) => write!(f, "{} -> {}", self.issue_key, a),
        }
    }
}

// === Tests ===

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use maplit::btreemap;

    fn named(key: &str, a: &str) -> WorkItem {
        WorkItem {
            issue_key: key.into(),
            assignee: Assignee::Named(a.into()),
        }
    }

    #[test]
    fn parse_without_assignee() {
        let item = WorkItem::from_file_name("ABC-123.txt").unwrap();
        assert_eq!(item.issue_key, "ABC-123");
        assert_eq!(item.assignee, Assignee::Unset);
        assert!(!item.assignee.is_unassign());
    }

    #[test]
    fn parse_double_separator_means_unassign() {
        let item = WorkItem::from_file_name("ABC-123..txt").unwrap();
        assert_eq!(item, named("ABC-123", "unassigned"));
        assert!(item.assignee.is_unassign());
        assert_ne!(item.assignee, Assignee::Unset);
    }

    #[test]
    fn parse_restores_dots_in_username() {
        assert_eq!(
            WorkItem::from_file_name("OPS-7.jane_doe.txt").unwrap(),
            named("OPS-7", "jane.doe")
        );
    }

    #[test]
    fn decode_assignee_segment() {
        let cases = btreemap! {
            "ABC-1.txt" => Assignee::Unset,
            "ABC-1..txt" => Assignee::Named("unassigned".into()),
            "ABC-1.grant.txt" => Assignee::Named("grant".into()),
            "ABC-1.j_r_r.txt" => Assignee::Named("j.r.r".into()),
            "ABC-1.-1.txt" => Assignee::Named("-1".into()),
        };
        for (name, assignee) in cases {
            assert_eq!(WorkItem::from_file_name(name).unwrap().assignee, assignee);
        }
    }

    #[test]
    fn unassign_sentinel_ignores_case() {
        assert!(named("A-1", "UnAssigned").assignee.is_unassign());
        assert!(!named("A-1", "unassignedx").assignee.is_unassign());
    }

    #[test]
    fn reencode_yields_original_name() {
        for name in &[
            "ABC-1.grant.txt",
            "ABC-1.jane_doe.txt",
            "X_Y-99.a-b_c.txt",
            "ABC-1.txt",
        ] {
            let item = WorkItem::from_file_name(name).unwrap();
            assert_eq!(&item.file_name(), name);
        }
    }

    #[test]
    fn reject_bad_assignee() {
        assert_matches!(
            WorkItem::from_file_name("ABC-1.john doe.txt"),
            Err(ParseError::Assignee { ref assignee, .. }) if assignee == "john doe"
        );
        assert_matches!(
            WorkItem::from_file_name("ABC-1.jo@hn.txt"),
            Err(ParseError::Assignee { .. })
        );
    }

    #[test]
    fn reject_malformed_names() {
        assert_matches!(
            WorkItem::from_file_name("ABC-1.md"),
            Err(ParseError::NotText(_))
        );
        assert_matches!(
            WorkItem::from_file_name("notes.txt"),
            Err(ParseError::IssueKey { .. })
        );
        assert_matches!(
            WorkItem::from_file_name(".txt"),
            Err(ParseError::IssueKey { .. })
        );
        assert_matches!(
            WorkItem::from_file_name("ABC-1.a.b.txt"),
            Err(ParseError::Segments(_))
        );
    }

    #[test]
    fn new_encodes_dotted_username() {
        let item = WorkItem::new("ABC-1", Some("jane.doe")).unwrap();
        assert_eq!(item.file_name(), "ABC-1.jane_doe.txt");
        assert_eq!(WorkItem::new("ABC-1", None).unwrap().file_name(), "ABC-1.txt");
    }

    #[test]
    fn new_rejects_slash_in_username() {
        assert_matches!(
            WorkItem::new("ABC-1", Some("a/b")),
            Err(ParseError::Assignee { .. })
        );
    }
}
