// Site configuration store.
//
// All known sites live in a single JSON document (by default
// `~/.dcron/sites.json`). The store is created on first use with one
// `default` site pointing at localhost, read in full on open, and written
// back in full on save.

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Location used when no `--config-file` is given.
pub const DEFAULT_CONFIG_PATH: &str = "~/.dcron/sites.json";

pub const DEFAULT_SITE_NAME: &str = "default";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// One managed cluster: a named group of interchangeable servers sharing
/// a port, a scheme and optional basic-auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub name: String,
    pub servers: Vec<String>,
    pub port: u16,
    pub ssl: bool,
    pub log_level: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for Site {
    fn default() -> Self {
        Site {
            name: DEFAULT_SITE_NAME.to_string(),
            servers: vec!["localhost".to_string()],
            port: DEFAULT_PORT,
            ssl: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            username: None,
            password: None,
        }
    }
}

/// A document entry. The `_type` tag is read first and selects the schema;
/// anything other than `site` fails to decode.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_type", rename_all = "lowercase")]
enum Entry {
    Site(SiteRecord),
}

/// On-disk shape of a site. Credentials are always written, empty when absent.
#[derive(Debug, Serialize, Deserialize)]
struct SiteRecord {
    name: String,
    servers: ServerList,
    port: u16,
    ssl: bool,
    log_level: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Older clients stored `servers` as a string holding a JSON array.
/// Both shapes are read; only the nested array is written.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ServerList {
    List(Vec<String>),
    Encoded(String),
}

impl From<&Site> for Entry {
    fn from(site: &Site) -> Self {
        Entry::Site(SiteRecord {
            name: site.name.clone(),
            servers: ServerList::List(site.servers.clone()),
            port: site.port,
            ssl: site.ssl,
            log_level: site.log_level.clone(),
            username: site.username.clone().unwrap_or_default(),
            password: site.password.clone().unwrap_or_default(),
        })
    }
}

impl SiteRecord {
    fn into_site(self, path: &Path) -> Result<Site> {
        let servers = match self.servers {
            ServerList::List(servers) => servers,
            ServerList::Encoded(raw) => {
                serde_json::from_str(&raw).map_err(|e| Error::Config {
                    path: path.to_path_buf(),
                    message: format!("servers of site {} are not a list: {}", self.name, e),
                })?
            }
        };
        Ok(Site {
            name: self.name,
            servers,
            port: self.port,
            ssl: self.ssl,
            log_level: self.log_level,
            username: non_empty(self.username),
            password: non_empty(self.password),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// In-memory view of all configured sites plus the file they came from.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    sites: Vec<Site>,
    created: bool,
}

impl ConfigStore {
    /// Open the store at `path` after expanding `~` and environment
    /// variables. A missing file yields a single default site; with
    /// `create_if_missing` that default is written out right away.
    pub fn open(path: &str, create_if_missing: bool) -> Result<Self> {
        let path = expand_path(path)?;
        let mut store = ConfigStore {
            path,
            sites: vec![Site::default()],
            created: false,
        };

        if store.path.exists() {
            store.sites = read_sites(&store.path)?;
        } else if create_if_missing {
            store.save()?;
            store.created = true;
        }
        Ok(store)
    }

    /// Build a store from sites already in memory; nothing is read or written.
    pub fn with_sites(path: PathBuf, sites: Vec<Site>) -> Self {
        ConfigStore {
            path,
            sites,
            created: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// True when `open` had to create the file.
    pub fn was_created(&self) -> bool {
        self.created
    }

    /// First site with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.name == name)
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Site> {
        self.sites.iter_mut().find(|s| s.name == name)
    }

    /// Append a site unless one with the same name exists already.
    pub fn add(&mut self, site: Site) -> Result<()> {
        if self.find_by_name(&site.name).is_some() {
            return Err(Error::DuplicateSite(site.name));
        }
        self.sites.push(site);
        Ok(())
    }

    /// Remove the first site with the given name, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Site> {
        let index = self.sites.iter().position(|s| s.name == name)?;
        Some(self.sites.remove(index))
    }

    /// Write back to the file the store was opened from.
    pub fn save(&self) -> Result<()> {
        self.write(&self.path)
    }

    /// Serialize every site to `path`, replacing whatever is there.
    ///
    /// The document goes to a sibling temporary file first and is renamed
    /// over the target, so readers never see a half-written file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let io_err = |source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let entries: Vec<Entry> = self.sites.iter().map(Entry::from).collect();
        let mut content = serde_json::to_string(&entries).map_err(|source| Error::ConfigFormat {
            path: path.to_path_buf(),
            source,
        })?;
        content.push('\n');

        let temp_path = temp_path_for(path);
        let result = write_private(&temp_path, content.as_bytes())
            .and_then(|_| fs::rename(&temp_path, path));
        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(io_err(e));
        }
        Ok(())
    }
}

fn read_sites(path: &Path) -> Result<Vec<Site>> {
    let content = fs::read_to_string(path).map_err(|source| Error::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    let entries: Vec<Entry> =
        serde_json::from_str(&content).map_err(|source| Error::ConfigFormat {
            path: path.to_path_buf(),
            source,
        })?;
    entries
        .into_iter()
        .map(|entry| match entry {
            Entry::Site(record) => record.into_site(path),
        })
        .collect()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "sites.json".into());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

// The file holds credentials, so it is only readable by its owner.
#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

/// Expand a leading `~` to the home directory and `$VAR` / `${VAR}` to the
/// value of the environment variable. Unset variables are left as written.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    static VAR: OnceLock<Regex> = OnceLock::new();
    let re = VAR.get_or_init(|| {
        Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .expect("variable pattern is valid")
    });

    let expanded = re.replace_all(raw, |caps: &Captures| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
    });

    if expanded == "~" {
        return dirs::home_dir().ok_or(Error::HomeDirUnavailable);
    }
    if let Some(rest) = expanded
        .strip_prefix("~/")
        .or_else(|| expanded.strip_prefix("~\\"))
    {
        let home = dirs::home_dir().ok_or(Error::HomeDirUnavailable)?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(expanded.into_owned()))
}
