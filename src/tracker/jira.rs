use super::{FieldDef, Tracker, Transition};
use crate::credentials::Credentials;
use crate::issue::Issue;

use clap::{crate_name, crate_version};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::*;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid Jira API response: {res}")]
    API {
        res: String,
        #[source]
        e: serde_json::Error,
    },
    #[error("HTTP request error")]
    Request(#[from] reqwest::Error),
    #[error("Jira responded with {status}: {}", summarize(.body))]
    Status { status: StatusCode, body: String },
    #[error("Invalid host `{0}'")]
    Host(String),
    #[error("Trying to construct invalid HTTP header")]
    Header(#[from] http::header::InvalidHeaderValue),
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// Error messages as returned by Jira on 4xx
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ErrorCollection {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: serde_json::Map<String, serde_json::Value>,
}

fn summarize(body: &str) -> String {
    match serde_json::from_str::<ErrorCollection>(body) {
        Ok(ec) if !ec.error_messages.is_empty() || !ec.errors.is_empty() => {
            let mut msgs = ec.error_messages;
            msgs.extend(ec.errors.iter().map(|(k, v)| match v.as_str() {
                Some(s) => format!("{}: {}", k, s),
                None => format!("{}: {}", k, v),
            }));
            msgs.join("; ")
        }
        _ => body.trim().to_owned(),
    }
}

/// Turns a bare host name into an `https://` base URL
pub fn base_url(host: &str) -> Result<Url> {
    let raw = if host.contains("://") {
        host.to_owned()
    } else {
        format!("https://{}", host)
    };
    let mut url = Url::parse(&raw).map_err(|_| Error::Host(host.to_owned()))?;
    if url.host_str().is_none() {
        return Err(Error::Host(host.to_owned()));
    }
    if !url.path().ends_with('/') {
        let p = format!("{}/", url.path());
        url.set_path(&p);
    }
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct Jira {
    client: Client,
    base: Url,
    cred: Credentials,
}

impl Jira {
    pub fn new(host: &str, cred: Credentials) -> Result<Self> {
        let base = base_url(host)?;
        let mut h = HeaderMap::new();
        h.insert(ACCEPT, "application/json".parse()?);
        h.insert(
            USER_AGENT,
            format!("{}/{}", crate_name!(), crate_version!()).parse()?,
        );
        let client = Client::builder().default_headers(h).build()?;
        Ok(Self { client, base, cred })
    }

    /// Host name used for credential lookup
    pub fn host_name(host: &str) -> Result<String> {
        let url = base_url(host)?;
        url.host_str()
            .map(str::to_owned)
            .ok_or_else(|| Error::Host(host.to_owned()))
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(&format!("rest/api/2/{}", path))
            .map_err(|_| Error::Host(self.base.to_string()))
    }

    fn issue_url(&self, key: &str, rest: &str) -> Result<Url> {
        let mut url = self.url("issue/")?;
        url.path_segments_mut()
            .map_err(|_| Error::Host(self.base.to_string()))?
            .pop_if_empty()
            .push(key)
            .extend(rest.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn send(&self, req: RequestBuilder) -> Result<Response> {
        let res = req
            .basic_auth(&self.cred.login, Some(&self.cred.password))
            .send()?;
        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else {
            let body = res.text().unwrap_or_default();
            Err(Error::Status { status, body })
        }
    }

    fn decode<T: DeserializeOwned>(&self, res: Response) -> Result<T> {
        let txt = res.text()?;
        serde_json::from_str(&txt).map_err(|e| Error::API { res: txt, e })
    }
}

#[derive(Deserialize, Debug, Default)]
struct Transitions {
    transitions: Vec<Transition>,
}

impl Tracker for Jira {
    fn issue(&self, key: &str) -> Result<Issue, super::Error> {
        let url = self.issue_url(key, "")?;
        debug!("GET {}", url);
        let res = self.send(self.client.get(url))?;
        Ok(self.decode(res)?)
    }

    fn fields(&self) -> Result<Vec<FieldDef>, super::Error> {
        let url = self.url("field")?;
        debug!("GET {}", url);
        let res = self.send(self.client.get(url))?;
        Ok(self.decode(res)?)
    }

    fn set_assignee(&self, key: &str, name: &str) -> Result<(), super::Error> {
        let url = self.issue_url(key, "assignee")?;
        debug!("PUT {} name={}", url, name);
        self.send(self.client.put(url).json(&json!({ "name": name })))?;
        Ok(())
    }

    fn add_comment(&self, key: &str, body: &str) -> Result<(), super::Error> {
        let url = self.issue_url(key, "comment")?;
        debug!("POST {} ({} bytes)", url, body.len());
        self.send(self.client.post(url).json(&json!({ "body": body })))?;
        Ok(())
    }

    fn transitions(&self, key: &str) -> Result<Vec<Transition>, super::Error> {
        let url = self.issue_url(key, "transitions")?;
        debug!("GET {}", url);
        let res = self.send(self.client.get(url))?;
        let t: Transitions = self.decode(res)?;
        Ok(t.transitions)
    }

    fn transition(&self, key: &str, id: &str) -> Result<(), super::Error> {
        let url = self.issue_url(key, "transitions")?;
        debug!("POST {} id={}", url, id);
        self.send(
            self.client
                .post(url)
                .json(&json!({ "transition": { "id": id } })),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;

    fn jira(host: &str) -> Jira {
        Jira::new(host, Credentials::default()).unwrap()
    }

    #[test]
    fn bare_host_gets_https() {
        assert_eq!(
            base_url("jira.example.com").unwrap().as_str(),
            "https://jira.example.com/"
        );
        assert_eq!(
            base_url("http://localhost:8080/jira").unwrap().as_str(),
            "http://localhost:8080/jira/"
        );
        assert_matches!(base_url("http://"), Err(Error::Host(_)));
    }

    #[test]
    fn host_name_strips_scheme_and_port() {
        assert_eq!(
            Jira::host_name("https://jira.example.com:8443/").unwrap(),
            "jira.example.com"
        );
        assert_eq!(Jira::host_name("jira.example.com").unwrap(), "jira.example.com");
    }

    #[test]
    fn api_urls() {
        let j = jira("http://localhost:8080/jira");
        assert_eq!(
            j.url("field").unwrap().as_str(),
            "http://localhost:8080/jira/rest/api/2/field"
        );
        assert_eq!(
            j.issue_url("ABC-1", "").unwrap().as_str(),
            "http://localhost:8080/jira/rest/api/2/issue/ABC-1"
        );
        assert_eq!(
            j.issue_url("ABC-1", "transitions").unwrap().as_str(),
            "http://localhost:8080/jira/rest/api/2/issue/ABC-1/transitions"
        );
    }

    #[test]
    fn summarize_error_collection() {
        assert_eq!(
            summarize(r#"{"errorMessages":["Issue does not exist"],"errors":{}}"#),
            "Issue does not exist"
        );
        assert_eq!(
            summarize(r#"{"errorMessages":[],"errors":{"assignee":"User 'x' does not exist."}}"#),
            "assignee: User 'x' does not exist."
        );
        assert_eq!(summarize("  <html>oops</html>\n"), "<html>oops</html>");
    }
}
