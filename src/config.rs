use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base URL of the UN Population Data Portal API.
pub const DEFAULT_URL: &str = "https://population.un.org/dataportalapi/api/v1";

/// Environment variable holding the default API token.
pub const KEY_ENV: &str = "UN_POPULATION_API_KEY";

const URL_ENV: &str = "UNPOP_API_URL";
const RC_ENV: &str = "UNPOP_RC";
const RC_NAME: &str = ".unpoprc";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL, typically [`DEFAULT_URL`].
    pub url: String,
    /// Default bearer token, if one was configured.
    ///
    /// This only seeds a [`Session`](crate::Session); a token entered
    /// interactively never ends up here.
    pub key: Option<String>,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            key: None,
            verify: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Overrides the per-request timeout. Zero is rejected.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            bail!("invalid timeout: must be at least one second");
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Resolves configuration using (in order of precedence):
    /// - explicit `url`/`key`/`verify` arguments
    /// - environment variables `UNPOP_API_URL` / `UN_POPULATION_API_KEY`
    /// - config file from `UNPOP_RC`, `./.unpoprc` or `~/.unpoprc`
    pub fn load(url: Option<String>, key: Option<String>, verify: Option<bool>) -> Result<Self> {
        load_config(url, key, verify)
    }
}

#[derive(Debug, Default)]
struct RcConfig {
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
    timeout: Option<Duration>,
}

pub(crate) fn load_config(
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
) -> Result<ClientConfig> {
    let url = url.or_else(|| non_empty_env(URL_ENV));
    let key = key.or_else(|| non_empty_env(KEY_ENV));

    let rc = match rc_candidates().iter().find(|p| p.exists()) {
        Some(rc_path) => read_rc(rc_path).with_context(|| {
            format!("failed to read configuration file {}", rc_path.display())
        })?,
        None => RcConfig::default(),
    };

    merge(url, key, verify, rc)
}

fn merge(
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
    rc: RcConfig,
) -> Result<ClientConfig> {
    let url = url.or(rc.url).unwrap_or_else(|| DEFAULT_URL.to_string());
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("invalid API url [{}]: expected an http(s) URL", url);
    }

    Ok(ClientConfig {
        url: url.trim_end_matches('/').to_string(),
        key: key.or(rc.key).filter(|k| !k.trim().is_empty()),
        verify: verify.or(rc.verify).unwrap_or(true),
        timeout: rc.timeout.unwrap_or(DEFAULT_TIMEOUT),
    })
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_rc(&text)
}

fn parse_rc(text: &str) -> Result<RcConfig> {
    let mut cfg = RcConfig::default();

    // `key:` may be on one line with the token on the next.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            if !line.contains(':') || (pk == "url" && line.contains("://")) {
                apply(&mut cfg, pk, strip_quotes(line))?;
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending_key = Some(k);
            } else {
                apply(&mut cfg, k, v)?;
            }
        }
    }

    Ok(cfg)
}

fn apply(cfg: &mut RcConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "url" => cfg.url = Some(value.to_string()),
        "key" => cfg.key = Some(value.to_string()),
        "verify" => cfg.verify = Some(value != "0"),
        "timeout" => {
            let secs: u64 = value
                .parse()
                .with_context(|| format!("invalid timeout [{}]: expected seconds", value))?;
            if secs == 0 {
                bail!("invalid timeout [0]: must be at least one second");
            }
            cfg.timeout = Some(Duration::from_secs(secs));
        }
        _ => {}
    }
    Ok(())
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

fn rc_candidates() -> Vec<PathBuf> {
    // 1) UNPOP_RC (explicit)
    // 2) ./.unpoprc
    // 3) ~/.unpoprc
    if let Ok(p) = std::env::var(RC_ENV) {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(RC_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(RC_NAME));
    }
    v
}
