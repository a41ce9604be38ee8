use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result, remote_error};
use crate::model::{
    DataItem, Envelope, Indicator, IndicatorCatalog, Observation, Target, WORLD,
    distinct_location_ids, shape_observations,
};
use crate::session::Session;
use crate::transport::{HttpReply, HttpTransport, Transport};

/// Name fragment identifying the population indicator used for location
/// discovery.
const POPULATION_INDICATOR: &str = "Total Population";

/// Client for the UN Population Data Portal API.
///
/// Every call takes the caller's [`Session`]; the client itself holds no
/// per-user state and caches no data.
#[derive(Debug, Clone)]
pub struct Client<T = HttpTransport> {
    url: String,
    transport: T,
}

/// Outcome of one GET before shaping.
enum Fetched<R> {
    Data(Vec<R>),
    /// No token was available, or the API rejected it.
    Unauthorized,
}

impl Client<HttpTransport> {
    /// Creates a client using environment variables and/or `.unpoprc`, and a
    /// session seeded with the configured default token.
    pub fn from_env() -> anyhow::Result<(Self, Session)> {
        let cfg = ClientConfig::load(None, None, None)?;
        let client = Self::new(&cfg)?;
        Ok((client, Session::new(cfg.key)))
    }

    pub fn new(cfg: &ClientConfig) -> anyhow::Result<Self> {
        Ok(Self::with_transport(&cfg.url, HttpTransport::new(cfg)?))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(url: &str, transport: T) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    /// Fetches the complete indicator catalog.
    ///
    /// May prompt for a token. Without one, or when the token is rejected,
    /// the catalog is empty.
    pub fn indicators(&self, session: &mut Session) -> Result<IndicatorCatalog> {
        let url = format!("{}/indicators", self.url);
        match self.get_data::<Indicator>(session, true, "indicators", &url)? {
            Fetched::Data(list) => Ok(list.into_iter().collect()),
            Fetched::Unauthorized => Ok(IndicatorCatalog::new()),
        }
    }

    /// Fetches the catalog and keeps it in the session.
    pub fn load_catalog<'s>(&self, session: &'s mut Session) -> Result<&'s IndicatorCatalog> {
        let catalog = self.indicators(session)?;
        Ok(session.store_catalog(catalog))
    }

    /// Lists the available targets (countries, regions, groupings).
    pub fn targets(&self, session: &mut Session) -> Result<Vec<Target>> {
        let url = format!("{}/targets", self.url);
        match self.get_data::<Target>(session, false, "targets", &url)? {
            Fetched::Data(list) => Ok(list),
            Fetched::Unauthorized => Ok(Vec::new()),
        }
    }

    /// Fetches the series of `indicator` for `locations` (World when empty).
    ///
    /// The catalog is fetched again on every call to resolve the name. Any
    /// error is attributed to `indicator`.
    pub fn indicator_data(
        &self,
        session: &mut Session,
        indicator: &str,
        locations: &[i64],
    ) -> Result<Vec<Observation>> {
        self.fetch_indicator(session, indicator, locations)
            .map_err(|e| e.for_indicator(indicator))
    }

    fn fetch_indicator(
        &self,
        session: &mut Session,
        indicator: &str,
        locations: &[i64],
    ) -> Result<Vec<Observation>> {
        if session.resolve_token(false).is_none() {
            debug!(indicator, "no API token, skipping data request");
            return Ok(Vec::new());
        }

        let catalog = self.indicators(session)?;
        if session.token().is_none() {
            // token rejected while loading the catalog
            return Ok(Vec::new());
        }
        let id = resolve_indicator_id(&catalog, indicator)?;

        let url = self.data_url(id, locations);
        match self.get_data::<DataItem>(session, false, "indicator data", &url)? {
            Fetched::Data(items) => Ok(shape_observations(items)),
            Fetched::Unauthorized => Ok(Vec::new()),
        }
    }

    /// Returns up to `limit` location ids that appear in the population
    /// series, in order of first appearance.
    ///
    /// Falls back to `[900]` when there is no token, no population
    /// indicator, no data, or any failure. Never returns an error. A series
    /// without location ids, or a `limit` of zero, yields an empty list.
    pub fn top_populated_locations(&self, session: &mut Session, limit: usize) -> Vec<i64> {
        match self.discover_locations(session) {
            Ok(Some(mut ids)) => {
                ids.truncate(limit);
                ids
            }
            Ok(None) => vec![WORLD],
            Err(e) => {
                warn!("location discovery failed, using World: {}", e);
                vec![WORLD]
            }
        }
    }

    /// Distinct location ids of the population series, or `None` when the
    /// series could not be obtained.
    fn discover_locations(&self, session: &mut Session) -> Result<Option<Vec<i64>>> {
        if session.resolve_token(false).is_none() {
            return Ok(None);
        }

        let catalog = self.indicators(session)?;
        let Some(population) = catalog
            .iter()
            .find(|i| i.name.contains(POPULATION_INDICATOR))
        else {
            debug!("no population indicator in catalog");
            return Ok(None);
        };

        let url = self.data_url(population.id, &[WORLD]);
        match self.get_data::<DataItem>(session, false, "indicator data", &url)? {
            Fetched::Data(items) if items.is_empty() => Ok(None),
            Fetched::Data(items) => Ok(Some(distinct_location_ids(&items))),
            Fetched::Unauthorized => Ok(None),
        }
    }

    fn data_url(&self, indicator_id: i64, locations: &[i64]) -> String {
        let locations = if locations.is_empty() {
            WORLD.to_string()
        } else {
            locations
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        format!(
            "{}/data/indicators/{}/locations/{}",
            self.url, indicator_id, locations
        )
    }

    /// One authenticated GET of a `{"data": [...]}` endpoint.
    ///
    /// HTTP 401 invalidates the session token.
    fn get_data<R: DeserializeOwned>(
        &self,
        session: &mut Session,
        interactive: bool,
        operation: &'static str,
        url: &str,
    ) -> Result<Fetched<R>> {
        let Some(token) = session.resolve_token(interactive) else {
            debug!(operation, "no API token available");
            return Ok(Fetched::Unauthorized);
        };

        debug!(operation, url, "API call");
        let HttpReply { status, body } =
            self.transport
                .get(url, &token)
                .map_err(|source| Error::Transport {
                    url: url.to_string(),
                    source,
                })?;

        match status {
            StatusCode::OK => {
                let envelope: Envelope<R> =
                    serde_json::from_str(&body).map_err(|source| Error::Decode {
                        url: url.to_string(),
                        status,
                        source,
                    })?;
                Ok(Fetched::Data(envelope.data))
            }
            StatusCode::UNAUTHORIZED => {
                warn!(operation, "unauthorized: invalid API key, clearing it");
                session.invalidate();
                Ok(Fetched::Unauthorized)
            }
            _ => Err(remote_error(operation, status, url, &body)),
        }
    }
}

/// Looks `name` up in `catalog`.
pub fn resolve_indicator_id(catalog: &IndicatorCatalog, name: &str) -> Result<i64> {
    catalog
        .get(name)
        .ok_or_else(|| Error::IndicatorNotFound(name.to_string()))
}
