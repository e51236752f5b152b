//! Basic auth credentials from the user's `.netrc`.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot locate home directory to find .netrc")]
    NoHome,
    #[error("Cannot read credentials from {}", .0.display())]
    Read(PathBuf, #[source] io::Error),
    #[error("No login for {host} in {}", .path.display())]
    NoEntry { host: String, path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    /// Looks up `host` in `$NETRC` or `~/.netrc`.
    pub fn for_host(host: &str) -> Result<Self, Error> {
        let path = match env::var_os("NETRC") {
            Some(p) => PathBuf::from(p),
            None => dirs::home_dir().ok_or(Error::NoHome)?.join(".netrc"),
        };
        let contents = fs::read_to_string(&path).map_err(|e| Error::Read(path.clone(), e))?;
        Netrc::parse(&contents)
            .lookup(host)
            .cloned()
            .ok_or_else(|| Error::NoEntry {
                host: host.to_owned(),
                path,
            })
    }
}

#[derive(Debug, Default)]
pub struct Netrc {
    machines: Vec<(String, Credentials)>,
    default: Option<Credentials>,
}

impl Netrc {
    pub fn parse(contents: &str) -> Self {
        let mut netrc = Netrc::default();
        // macdef bodies run until the next empty line and are not tokenized
        let mut lines = contents.lines();
        let mut current: Option<(Option<String>, Credentials)> = None;
        while let Some(line) = lines.next() {
            let mut tok = line.split_whitespace();
            while let Some(t) = tok.next() {
                match t {
                    "machine" | "default" => {
                        netrc.push(current.take());
                        let name = if t == "machine" {
                            tok.next().map(str::to_owned)
                        } else {
                            None
                        };
                        current = Some((name, Credentials::default()));
                    }
                    "login" => {
                        if let (Some((_, c)), Some(v)) = (current.as_mut(), tok.next()) {
                            c.login = v.to_owned();
                        }
                    }
                    "password" => {
                        if let (Some((_, c)), Some(v)) = (current.as_mut(), tok.next()) {
                            c.password = v.to_owned();
                        }
                    }
                    "account" => {
                        tok.next();
                    }
                    "macdef" => {
                        for body in lines.by_ref() {
                            if body.trim().is_empty() {
                                break;
                            }
                        }
                        break;
                    }
                    _ => (),
                }
            }
        }
        netrc.push(current);
        netrc
    }

    fn push(&mut self, entry: Option<(Option<String>, Credentials)>) {
        match entry {
            Some((Some(machine), cred)) => self.machines.push((machine, cred)),
            Some((None, cred)) => {
                if self.default.is_none() {
                    self.default = Some(cred)
                }
            }
            None => (),
        }
    }

    /// First matching machine entry, else the default entry
    pub fn lookup(&self, host: &str) -> Option<&Credentials> {
        self.machines
            .iter()
            .find(|(m, _)| m == host)
            .map(|(_, c)| c)
            .or_else(|| self.default.as_ref())
    }
}
