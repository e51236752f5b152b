use crate::tracker::FieldDef;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Issue as returned by the issue endpoint. Only the displayed fields are typed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Issue {
    pub key: String,
    pub fields: Fields,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Fields {
    #[serde(default)]
    pub summary: String,
    pub status: Option<Named>,
    pub assignee: Option<User>,
    pub reporter: Option<User>,
    pub priority: Option<Named>,
    pub issuetype: Option<Named>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub description: Option<String>,
    /// Everything else, keyed by field id
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Named {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub name: String,
    pub display_name: Option<String>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(d) if !self.name.is_empty() => write!(f, "{} ({})", d, self.name),
            Some(d) => write!(f, "{}", d),
            None => write!(f, "{}", self.name),
        }
    }
}

fn or_none<T: fmt::Display>(v: &Option<T>) -> String {
    v.as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_owned())
}

fn name_or_none(v: &Option<Named>) -> &str {
    v.as_ref().map(|n| n.name.as_str()).unwrap_or("-")
}

impl Issue {
    /// Looks up a field value by id, typed fields included
    pub fn field(&self, id: &str) -> Option<Value> {
        match self.fields.other.get(id) {
            Some(v) => Some(v.clone()),
            None => {
                let f = &self.fields;
                let v = match id {
                    "summary" => Value::from(f.summary.as_str()),
                    "status" => Value::from(f.status.as_ref()?.name.as_str()),
                    "assignee" => Value::from(f.assignee.as_ref()?.to_string()),
                    "reporter" => Value::from(f.reporter.as_ref()?.to_string()),
                    "priority" => Value::from(f.priority.as_ref()?.name.as_str()),
                    "issuetype" => Value::from(f.issuetype.as_ref()?.name.as_str()),
                    "created" => Value::from(f.created.clone()?),
                    "updated" => Value::from(f.updated.clone()?),
                    "description" => Value::from(f.description.clone()?),
                    _ => return None,
                };
                Some(v)
            }
        }
    }
}

impl fmt::Display for Issue {
    /// Normal Display: header lines + description
    /// Alternate Display: header lines only
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fl = &self.fields;
        writeln!(f, "{} {}", self.key, fl.summary)?;
        writeln!(f, "  Type:     {}", name_or_none(&fl.issuetype))?;
        writeln!(f, "  Status:   {}", name_or_none(&fl.status))?;
        writeln!(f, "  Priority: {}", name_or_none(&fl.priority))?;
        writeln!(f, "  Assignee: {}", or_none(&fl.assignee))?;
        writeln!(f, "  Reporter: {}", or_none(&fl.reporter))?;
        writeln!(f, "  Created:  {}", or_none(&fl.created))?;
        writeln!(f, "  Updated:  {}", or_none(&fl.updated))?;
        if !f.alternate() {
            if let Some(d) = fl.description.as_ref().filter(|d| !d.trim().is_empty()) {
                writeln!(f, "\n{}", d.trim_end())?;
            }
        }
        Ok(())
    }
}

/// Finds the field id for a human readable field name.
///
/// Names are compared case-insensitively and the first definition wins. A raw field id is also
/// accepted.
pub fn field_id<'a>(defs: &'a [FieldDef], name: &str) -> Option<&'a str> {
    defs.iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .or_else(|| defs.iter().find(|d| d.id == name))
        .map(|d| d.id.as_str())
}

/// Renders a field value for terminal output
pub fn render_value(v: &Value) -> String {
    match v {
        Value::Null => "-".to_owned(),
        Value::String(s) => s.clone(),
        Value::Array(a) => a.iter().map(render_value).collect::<Vec<_>>().join(", "),
        Value::Object(o) => o
            .get("displayName")
            .or_else(|| o.get("name"))
            .or_else(|| o.get("value"))
            .map(render_value)
            .unwrap_or_else(|| v.to_string()),
        _ => v.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn sample() -> Issue {
        serde_json::from_value(json!({
            "key": "OPS-42",
            "fields": {
                "summary": "Disk full on db1",
                "status": {"name": "In Progress", "id": "3"},
                "assignee": {"name": "jdoe", "displayName": "Jane Doe"},
                "reporter": null,
                "priority": {"name": "Major"},
                "issuetype": {"name": "Bug"},
                "created": "2020-05-04T10:00:00.000+0200",
                "updated": "2020-05-05T11:00:00.000+0200",
                "description": "It is full.\n",
                "customfield_10010": [{"value": "red"}, {"value": "blue"}],
                "customfield_10020": {"displayName": "Bob"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn decode_issue() {
        let iss = sample();
        assert_eq!(iss.fields.status, Some(Named { name: "In Progress".into() }));
        assert!(iss.fields.reporter.is_none());
        assert!(iss.fields.other.contains_key("customfield_10010"));
        assert!(!iss.fields.other.contains_key("summary"));
    }

    #[test]
    fn display_issue() {
        assert_eq!(
            sample().to_string(),
            "\
OPS-42 Disk full on db1
  Type:     Bug
  Status:   In Progress
  Priority: Major
  Assignee: Jane Doe (jdoe)
  Reporter: -
  Created:  2020-05-04T10:00:00.000+0200
  Updated:  2020-05-05T11:00:00.000+0200

It is full.
"
        );
        assert!(!format!("{:#}", sample()).contains("It is full"));
    }

    #[test]
    fn lookup_field_by_name() {
        let defs = vec![
            FieldDef {
                id: "customfield_10010".into(),
                name: "Colour".into(),
            },
            FieldDef {
                id: "customfield_10099".into(),
                name: "colour".into(),
            },
            FieldDef {
                id: "summary".into(),
                name: "Summary".into(),
            },
        ];
        assert_eq!(field_id(&defs, "COLOUR"), Some("customfield_10010"));
        assert_eq!(field_id(&defs, "summary"), Some("summary"));
        assert_eq!(field_id(&defs, "customfield_10099"), Some("customfield_10099"));
        assert_eq!(field_id(&defs, "Sprint"), None);
    }

    #[test]
    fn field_values() {
        let iss = sample();
        assert_eq!(
            render_value(&iss.field("customfield_10010").unwrap()),
            "red, blue"
        );
        assert_eq!(render_value(&iss.field("customfield_10020").unwrap()), "Bob");
        assert_eq!(render_value(&iss.field("status").unwrap()), "In Progress");
        assert!(iss.field("reporter").is_none());
        assert!(iss.field("nonexistent").is_none());
    }
}
