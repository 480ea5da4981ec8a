// Endpoint selection: picks the one server of a site that this invocation
// talks to and builds the base URI for it.

use crate::config::Site;
use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use std::fmt;
use std::str::FromStr;

/// How to choose a server from a site's server list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Lexicographically smallest server.
    First,
    /// Lexicographically largest server.
    Last,
    /// Uniformly random server, different on every run.
    Random,
    /// A specific server, which must be in the list.
    Literal(String),
}

impl FromStr for SelectionPolicy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "first" => Ok(SelectionPolicy::First),
            "last" => Ok(SelectionPolicy::Last),
            "random" => Ok(SelectionPolicy::Random),
            other => Ok(SelectionPolicy::Literal(other.to_string())),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::First => write!(f, "first"),
            SelectionPolicy::Last => write!(f, "last"),
            SelectionPolicy::Random => write!(f, "random"),
            SelectionPolicy::Literal(server) => write!(f, "{}", server),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn for_site(site: &Site) -> Self {
        if site.ssl {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Scheme, host and port of the server requests go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub server: String,
    pub port: u16,
}

impl Endpoint {
    /// `scheme://server:port`, without a trailing slash.
    pub fn uri(&self) -> String {
        format!("{}://{}:{}", self.scheme.as_str(), self.server, self.port)
    }

    /// Same scheme and port, different host of the same site.
    pub fn with_server(&self, server: &str) -> Endpoint {
        Endpoint {
            scheme: self.scheme,
            server: server.to_string(),
            port: self.port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Choose the server of `site` dictated by `policy`.
pub fn select_server<'a>(site: &'a Site, policy: &SelectionPolicy) -> Result<&'a str> {
    if site.servers.is_empty() {
        return Err(Error::NoServers(site.name.clone()));
    }

    let chosen = match policy {
        SelectionPolicy::First => site.servers.iter().min(),
        SelectionPolicy::Last => site.servers.iter().max(),
        SelectionPolicy::Random => site.servers.choose(&mut rand::thread_rng()),
        SelectionPolicy::Literal(wanted) => site.servers.iter().find(|s| *s == wanted),
    };

    chosen.map(String::as_str).ok_or_else(|| Error::Selection {
        requested: policy.to_string(),
        site: site.name.clone(),
        available: site.servers.clone(),
    })
}

/// Select a server and compose the endpoint every API call goes through.
pub fn select_endpoint(site: &Site, policy: &SelectionPolicy) -> Result<Endpoint> {
    let server = select_server(site, policy)?;
    Ok(Endpoint {
        scheme: Scheme::for_site(site),
        server: server.to_string(),
        port: site.port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(servers: &[&str]) -> Site {
        Site {
            name: "lab".into(),
            servers: servers.iter().map(|s| s.to_string()).collect(),
            ..Site::default()
        }
    }

    #[test]
    fn parses_named_policies_and_literals() {
        let parse = |s: &str| s.parse::<SelectionPolicy>().unwrap();
        assert_eq!(parse("first"), SelectionPolicy::First);
        assert_eq!(parse("last"), SelectionPolicy::Last);
        assert_eq!(parse("random"), SelectionPolicy::Random);
        assert_eq!(
            parse("10.0.0.1"),
            SelectionPolicy::Literal("10.0.0.1".into())
        );
        assert_eq!(
            "".parse::<SelectionPolicy>().unwrap(),
            SelectionPolicy::Literal(String::new())
        );
    }

    #[test]
    fn first_and_last_ignore_input_order() {
        let orders: [&[&str]; 3] = [&["b", "a", "c"], &["c", "b", "a"], &["a", "c", "b"]];
        for servers in orders {
            let lab = site(servers);
            assert_eq!(select_server(&lab, &SelectionPolicy::First).unwrap(), "a");
            assert_eq!(select_server(&lab, &SelectionPolicy::Last).unwrap(), "c");
        }
    }

    #[test]
    fn literal_must_be_configured() {
        let lab = site(&["b", "a", "c"]);
        assert_eq!(
            select_server(&lab, &SelectionPolicy::Literal("a".into())).unwrap(),
            "a"
        );

        let err = select_server(&lab, &SelectionPolicy::Literal("z".into())).unwrap_err();
        match err {
            Error::Selection {
                requested,
                site,
                available,
            } => {
                assert_eq!(requested, "z");
                assert_eq!(site, "lab");
                assert_eq!(available, vec!["b", "a", "c"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = select_server(&lab, &SelectionPolicy::Literal(String::new())).unwrap_err();
        assert_eq!(err.exit_code(), 13);
    }

    #[test]
    fn random_picks_a_configured_server() {
        let lab = site(&["n1", "n2", "n3"]);
        for _ in 0..32 {
            let chosen = select_server(&lab, &SelectionPolicy::Random).unwrap();
            assert!(lab.servers.iter().any(|s| s == chosen));
        }
    }

    #[test]
    fn empty_server_list_fails_before_policy() {
        let empty = site(&[]);
        for policy in [
            SelectionPolicy::First,
            SelectionPolicy::Random,
            SelectionPolicy::Literal("x".into()),
        ] {
            assert!(matches!(
                select_server(&empty, &policy),
                Err(Error::NoServers(name)) if name == "lab"
            ));
        }
    }

    #[test]
    fn default_site_resolves_to_localhost() {
        let endpoint = select_endpoint(&Site::default(), &SelectionPolicy::First).unwrap();
        assert_eq!(endpoint.server, "localhost");
        assert_eq!(endpoint.uri(), "http://localhost:8080");
    }

    #[test]
    fn ssl_sites_use_https() {
        let mut secure = site(&["node"]);
        secure.ssl = true;
        secure.port = 443;
        let endpoint = select_endpoint(&secure, &SelectionPolicy::First).unwrap();
        assert_eq!(endpoint.uri(), "https://node:443");
        assert_eq!(endpoint.with_server("10.1.1.1").uri(), "https://10.1.1.1:443");
    }
}
