use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::Credential;
use crate::client::ClientConfig;

const DEFAULT_SECTION: &str = "default";

/// Contents of the INI-style credentials file.
///
/// ```ini
/// [default]
/// url = https://vires.services/ows
///
/// [https://vires.services/ows]
/// token = ...
/// ```
#[derive(Debug, Clone, Default)]
pub struct SiteConfig {
    path: PathBuf,
    sections: Vec<Section>,
}

#[derive(Debug, Clone)]
struct Section {
    name: String,
    options: Vec<(String, String)>,
}

impl SiteConfig {
    /// `VIRESCLIENT_RC` if set, otherwise `~/.viresclient.ini`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("VIRESCLIENT_RC") {
            return Some(PathBuf::from(p));
        }
        dirs::home_dir().map(|home| home.join(".viresclient.ini"))
    }

    /// Reads the file at `path`; a missing file gives an empty configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read configuration file {}", path.display()));
            }
        };
        let mut cfg = parse(&text)?;
        cfg.path = path.to_path_buf();
        Ok(cfg)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_url(&self) -> Option<&str> {
        self.get(DEFAULT_SECTION, "url")
    }

    pub fn set_default_url(&mut self, url: &str) {
        self.set(DEFAULT_SECTION, "url", url);
    }

    /// Credential stored for `url`: a token wins over username/password.
    pub fn credential(&self, url: &str) -> Credential {
        if let Some(token) = self.get(url, "token") {
            return Credential::Token(token.to_string());
        }
        match (self.get(url, "username"), self.get(url, "password")) {
            (Some(username), Some(password)) => Credential::Basic {
                username: username.to_string(),
                password: password.to_string(),
            },
            _ => Credential::None,
        }
    }

    pub fn set_site_token(&mut self, url: &str, token: &str) {
        self.set(url, "token", token);
    }

    /// Writes the file back, readable by the owner only on Unix.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
        }

        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("[{}]\n", section.name));
            for (k, v) in &section.options {
                out.push_str(&format!("{} = {}\n", k, v));
            }
            out.push('\n');
        }
        fs::write(&self.path, out)
            .with_context(|| format!("failed to write {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("failed to restrict {}", self.path.display()))?;
        }
        Ok(())
    }

    fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == section)?
            .options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, section: &str, key: &str, value: &str) {
        let idx = match self.sections.iter().position(|s| s.name == section) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section {
                    name: section.to_string(),
                    options: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        let options = &mut self.sections[idx].options;
        match options.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => options.push((key.to_string(), value.to_string())),
        }
    }
}

fn parse(text: &str) -> Result<SiteConfig> {
    let mut cfg = SiteConfig::default();

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            cfg.sections.push(Section {
                name: name.trim().to_string(),
                options: Vec::new(),
            });
            continue;
        }

        // Section names are URLs, so values are split on the first `=` only.
        let Some((k, v)) = line.split_once('=') else {
            bail!("line {}: expected `key = value`, got {:?}", lineno + 1, line);
        };
        let Some(section) = cfg.sections.last_mut() else {
            bail!("line {}: option outside of a section", lineno + 1);
        };
        section
            .options
            .push((k.trim().to_lowercase(), strip_quotes(v).to_string()));
    }

    Ok(cfg)
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Builds a client configuration from (in order of precedence) the explicit
/// arguments, `VIRESCLIENT_URL` / `VIRESCLIENT_TOKEN`, and the credentials
/// file (`rc`, or [`SiteConfig::default_path`]).
pub(crate) fn load_config(
    url: Option<String>,
    token: Option<String>,
    rc: Option<PathBuf>,
) -> Result<ClientConfig> {
    let rc = rc.or_else(SiteConfig::default_path);
    let site = match &rc {
        Some(path) => SiteConfig::load(path)?,
        None => SiteConfig::default(),
    };

    resolve(
        url.or_else(|| std::env::var("VIRESCLIENT_URL").ok()),
        token.or_else(|| std::env::var("VIRESCLIENT_TOKEN").ok()),
        &site,
    )
}

fn resolve(url: Option<String>, token: Option<String>, site: &SiteConfig) -> Result<ClientConfig> {
    let url = match url.or_else(|| site.default_url().map(str::to_string)) {
        Some(url) => url,
        None => bail!(
            "Missing configuration: url (set VIRESCLIENT_URL or put `url = ...` under [default] in {})",
            site.path().display()
        ),
    };

    let credential = match token {
        Some(token) if !token.trim().is_empty() => Credential::Token(token.trim().to_string()),
        _ => site.credential(&url),
    };

    Ok(ClientConfig { url, credential })
}
