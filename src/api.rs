// API client module: a small blocking HTTP client for the control-plane
// API exposed by every dcron node. One client is bound to the endpoint
// picked for this invocation; the per-node sync check re-targets the same
// scheme and port at another host.

use crate::config::Site;
use crate::cron::CronPattern;
use crate::error::{Error, Result};
use crate::selection::Endpoint;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Basic-auth credentials taken from the site configuration.
#[derive(Clone, Debug)]
struct Credentials {
    username: String,
    password: Option<String>,
}

/// HTTP client bound to one node of a site.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoint: Endpoint,
    credentials: Option<Credentials>,
}

/// One entry of `/status`: the state a node last reported.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NodeState {
    #[serde(default)]
    pub ip: Option<String>,
    /// Load percentage. Some server versions send it as a string.
    #[serde(default, deserialize_with = "number_or_string")]
    pub load: Option<f64>,
    #[serde(default)]
    pub state: Option<String>,
    /// Timestamp of the last communication, as sent by the server.
    #[serde(default)]
    pub time: Option<String>,
}

/// One entry of `/jobs`. Only `parts` and `command` identify a job; the
/// remaining fields are informational and kept loosely typed.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Job {
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// The cron pattern of the job, space separated.
    #[serde(default)]
    pub parts: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pid: Option<Value>,
    #[serde(default)]
    pub last_run: Option<Value>,
    #[serde(default)]
    pub cron: Option<Value>,
    #[serde(default)]
    pub log: Option<Vec<Value>>,
}

impl Job {
    /// The pid of the job when it is currently running.
    pub fn running_pid(&self) -> Option<String> {
        match self.pid.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(s) if s.is_empty() => None,
            Value::Array(a) if a.is_empty() => None,
            Value::Object(o) if o.is_empty() => None,
            other => Some(value_text(other)),
        }
    }

    pub fn matches(&self, pattern: &CronPattern, command: &str) -> bool {
        self.parts.as_deref() == Some(pattern.to_string().as_str())
            && self.command.as_deref() == Some(command)
    }

    /// Log lines of the job, newest first as the server orders them.
    pub fn log_lines(&self) -> Vec<String> {
        self.log
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(value_text)
            .collect()
    }
}

/// Last job matching `pattern` and `command`; the server may list a job
/// once per node and the last entry wins.
pub fn find_job<'a>(jobs: &'a [Job], pattern: &CronPattern, command: &str) -> Option<&'a Job> {
    jobs.iter().rev().find(|job| job.matches(pattern, command))
}

/// Whether a node's crontab matches the cluster's job list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    InSync,
    /// Carries the body the node answered with.
    OutOfSync(String),
}

/// Render a loosely typed JSON value the way a user expects to read it.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
        Some(other) => Err(D::Error::custom(format!("expected a number, got {}", other))),
    }
}

impl ApiClient {
    /// Create a client for `endpoint`, authenticating with the site's
    /// credentials when a username is configured.
    pub fn new(endpoint: Endpoint, site: &Site) -> Result<Self> {
        let client = Client::builder().build()?;
        let credentials = site.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: site.password.clone(),
        });
        Ok(ApiClient {
            client,
            endpoint,
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.uri(), path)
    }

    /// Start a request and attach the basic-auth header when credentials
    /// are configured.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        tracing::debug!("{} {}", method, url);
        let req = self.client.request(method, url);
        match &self.credentials {
            Some(c) => req.basic_auth(&c.username, c.password.as_ref()),
            None => req,
        }
    }

    /// Turn anything but `expected` into `Error::UnexpectedStatus`.
    fn expect_status(res: Response, expected: StatusCode) -> Result<Response> {
        let status = res.status();
        if status != expected {
            let body = res.text().unwrap_or_default();
            return Err(Error::UnexpectedStatus { status, body });
        }
        Ok(res)
    }

    fn post_form(&self, path: &str, form: &[(&str, &str)], expected: StatusCode) -> Result<()> {
        let res = self
            .request(Method::POST, &self.url(path))
            .form(form)
            .send()?;
        Self::expect_status(res, expected)?;
        Ok(())
    }

    /// GET /status: the state every node of the cluster reported.
    pub fn status(&self) -> Result<Vec<NodeState>> {
        let res = self.request(Method::GET, &self.url("/status")).send()?;
        let res = Self::expect_status(res, StatusCode::OK)?;
        Ok(res.json()?)
    }

    /// GET /cron_in_sync on a specific node of the same site.
    pub fn cron_in_sync(&self, node: &str) -> Result<SyncState> {
        let url = format!("{}/cron_in_sync", self.endpoint.with_server(node).uri());
        let res = self.request(Method::GET, &url).send()?;
        if res.status() == StatusCode::OK {
            Ok(SyncState::InSync)
        } else {
            Ok(SyncState::OutOfSync(res.text().unwrap_or_default()))
        }
    }

    /// GET /jobs: every job the cluster knows about.
    pub fn jobs(&self) -> Result<Vec<Job>> {
        let res = self.request(Method::GET, &self.url("/jobs")).send()?;
        let res = Self::expect_status(res, StatusCode::OK)?;
        Ok(res.json()?)
    }

    /// POST /add_job. Jobs are submitted disabled unless `enabled` is set.
    pub fn add_job(&self, pattern: &CronPattern, command: &str, enabled: bool) -> Result<()> {
        let mut form = pattern.form_fields(command);
        if !enabled {
            form.push(("disabled", "true"));
        }
        self.post_form("/add_job", &form, StatusCode::CREATED)
    }

    pub fn remove_job(&self, pattern: &CronPattern, command: &str) -> Result<()> {
        self.post_form("/remove_job", &pattern.form_fields(command), StatusCode::OK)
    }

    pub fn run_job(&self, pattern: &CronPattern, command: &str) -> Result<()> {
        self.post_form("/run_job", &pattern.form_fields(command), StatusCode::ACCEPTED)
    }

    pub fn kill_job(&self, pattern: &CronPattern, command: &str) -> Result<()> {
        self.post_form("/kill_job", &pattern.form_fields(command), StatusCode::ACCEPTED)
    }

    /// GET /export: the raw job export document.
    pub fn export(&self) -> Result<Vec<u8>> {
        let res = self.request(Method::GET, &self.url("/export")).send()?;
        let res = Self::expect_status(res, StatusCode::OK)?;
        Ok(res.bytes()?.to_vec())
    }

    /// POST /import with the export document in the `payload` field.
    pub fn import(&self, payload: &str) -> Result<()> {
        self.post_form("/import", &[("payload", payload)], StatusCode::OK)
    }
}
