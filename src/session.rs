//! Per-user session state: the bearer token and the loaded indicator catalog.
//!
//! A [`Session`] is owned by whoever serves one user and is passed to every
//! [`Client`](crate::Client) call, so two users never share a token.

use tracing::debug;

use crate::model::IndicatorCatalog;

/// Where users can register for an API token.
pub const SIGNUP_URL: &str = "https://population.un.org/dataportal/user/signup";

/// Asks the user for a token when neither the session nor the configured
/// default has one.
pub trait CredentialPrompt {
    /// Returns the entered token, or `None` if the user gave none.
    fn request_token(&mut self) -> Option<String>;
}

/// Prompt that never yields a token. Used for non-interactive sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl CredentialPrompt for NoPrompt {
    fn request_token(&mut self) -> Option<String> {
        None
    }
}

impl<F> CredentialPrompt for F
where
    F: FnMut() -> Option<String>,
{
    fn request_token(&mut self) -> Option<String> {
        self()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    Unset,
    Cached(String),
    /// The last token was rejected with HTTP 401.
    Invalidated,
}

pub struct Session {
    state: CredentialState,
    default_token: Option<String>,
    rejected: Option<String>,
    prompt: Box<dyn CredentialPrompt>,
    catalog: Option<IndicatorCatalog>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            CredentialState::Cached(_) => "Cached",
            CredentialState::Unset => "Unset",
            CredentialState::Invalidated => "Invalidated",
        };
        f.debug_struct("Session")
            .field("state", &state)
            .field("has_default_token", &self.default_token.is_some())
            .field("catalog_len", &self.catalog.as_ref().map(|c| c.len()))
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Session {
    /// Creates a session whose token falls back to `default_token`
    /// (typically `UN_POPULATION_API_KEY`).
    pub fn new(default_token: Option<String>) -> Self {
        Self {
            state: CredentialState::Unset,
            default_token: default_token.filter(|t| !t.trim().is_empty()),
            rejected: None,
            prompt: Box::new(NoPrompt),
            catalog: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl CredentialPrompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn state(&self) -> &CredentialState {
        &self.state
    }

    /// Currently cached token, without trying any source.
    pub fn token(&self) -> Option<&str> {
        match &self.state {
            CredentialState::Cached(t) => Some(t),
            _ => None,
        }
    }

    /// Stores a token supplied by the caller, e.g. from a login form.
    pub fn set_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        if token.trim().is_empty() {
            return;
        }
        self.state = CredentialState::Cached(token.trim().to_string());
    }

    /// Resolves a token: cached value, then the configured default, then the
    /// prompt when `interactive` is set.
    ///
    /// The default is skipped if it is the token the API last rejected.
    pub fn resolve_token(&mut self, interactive: bool) -> Option<String> {
        if let CredentialState::Cached(token) = &self.state {
            return Some(token.clone());
        }

        if let Some(default) = &self.default_token {
            if self.rejected.as_ref() != Some(default) {
                debug!("using configured default API token");
                self.state = CredentialState::Cached(default.clone());
                return Some(default.clone());
            }
        }

        if interactive {
            if let Some(token) = self.prompt.request_token() {
                let token = token.trim().to_string();
                if !token.is_empty() {
                    debug!("using interactively supplied API token");
                    self.state = CredentialState::Cached(token.clone());
                    return Some(token);
                }
            }
        }

        None
    }

    /// Makes sure a token is available before calls that never prompt,
    /// asking the user if needed. Returns whether one is now cached.
    pub fn sign_in(&mut self) -> bool {
        self.resolve_token(true).is_some()
    }

    /// Clears the cached token after the API rejected it.
    pub fn invalidate(&mut self) {
        if let CredentialState::Cached(token) =
            std::mem::replace(&mut self.state, CredentialState::Invalidated)
        {
            self.rejected = Some(token);
        }
    }

    pub fn catalog(&self) -> Option<&IndicatorCatalog> {
        self.catalog.as_ref()
    }

    /// Keeps a loaded catalog for the rest of the session.
    pub fn store_catalog(&mut self, catalog: IndicatorCatalog) -> &IndicatorCatalog {
        self.catalog.insert(catalog)
    }
}
