//! Dashboard-side helpers: indicator search, selection, per-indicator
//! summaries and the normalized comparison table.

use serde::Serialize;

use crate::client::Client;
use crate::error::Result;
use crate::model::{IndicatorCatalog, Observation, WORLD, Year};
use crate::session::Session;
use crate::transport::Transport;

/// Number of indicators selected when the user picks none.
pub const DEFAULT_SELECTION: usize = 3;

/// What the user has picked.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub indicators: Vec<String>,
    pub locations: Vec<i64>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            indicators: Vec::new(),
            locations: vec![WORLD],
        }
    }
}

impl Selection {
    /// Builds a selection, falling back to the first matches of `search` when
    /// no indicator is named and to World when no location is.
    pub fn resolve(
        catalog: &IndicatorCatalog,
        search: &str,
        indicators: Vec<String>,
        locations: Vec<i64>,
    ) -> Self {
        let indicators = if indicators.is_empty() {
            filter_indicators(catalog, search)
                .into_iter()
                .take(DEFAULT_SELECTION)
                .map(str::to_string)
                .collect()
        } else {
            indicators
        };
        let locations = if locations.is_empty() {
            vec![WORLD]
        } else {
            locations
        };
        Self {
            indicators,
            locations,
        }
    }
}

/// Catalog names containing `search`, case-insensitively, in catalog order.
pub fn filter_indicators<'a>(catalog: &'a IndicatorCatalog, search: &str) -> Vec<&'a str> {
    let needle = search.to_lowercase();
    catalog
        .names()
        .filter(|name| name.to_lowercase().contains(&needle))
        .collect()
}

/// Observations of one indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub indicator: String,
    pub observations: Vec<Observation>,
}

/// Fetches every selected indicator in turn. `on_fetch` runs before each
/// request, e.g. to show progress.
pub fn fetch_selection<T: Transport>(
    client: &Client<T>,
    session: &mut Session,
    selection: &Selection,
    mut on_fetch: impl FnMut(&str),
) -> Vec<(String, Result<Vec<Observation>>)> {
    selection
        .indicators
        .iter()
        .map(|indicator| {
            on_fetch(indicator);
            let result = client.indicator_data(session, indicator, &selection.locations);
            (indicator.clone(), result)
        })
        .collect()
}

/// Headline numbers of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub latest_year: Year,
    /// Mean of the values recorded for `latest_year`.
    pub latest_value: Option<f64>,
    pub change: Option<Change>,
}

/// Difference between the last and first row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Change {
    pub absolute: f64,
    /// Percent of the first value; 0 when the first value is 0.
    pub percent: f64,
}

impl Summary {
    pub fn of(observations: &[Observation]) -> Option<Self> {
        let latest_year = observations.iter().map(|o| &o.year).max()?.clone();
        let latest_value = mean(
            observations
                .iter()
                .filter(|o| o.year == latest_year)
                .filter_map(|o| o.value),
        );

        let change = match (observations.first(), observations.last()) {
            (Some(first), Some(last)) if observations.len() > 1 => {
                match (first.value, last.value) {
                    (Some(a), Some(b)) => {
                        let absolute = b - a;
                        let percent = if a != 0.0 { absolute / a * 100.0 } else { 0.0 };
                        Some(Change { absolute, percent })
                    }
                    _ => None,
                }
            }
            _ => None,
        };

        Some(Self {
            latest_year,
            latest_value,
            change,
        })
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { None } else { Some(sum / n as f64) }
}

/// Min-max scales the values of a series to 0..1. A flat series keeps its
/// raw values.
pub fn normalize(observations: &[Observation]) -> Vec<Option<f64>> {
    let values = observations.iter().filter_map(|o| o.value);
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let range = max - min;

    observations
        .iter()
        .map(|o| {
            o.value.map(|v| {
                if range > 0.0 && range.is_finite() {
                    (v - min) / range
                } else {
                    v
                }
            })
        })
        .collect()
}

/// One row of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub year: Year,
    pub value: Option<f64>,
    pub location: String,
    pub variant: String,
    pub indicator: String,
    pub normalized_value: Option<f64>,
}

/// Concatenates the non-empty series with their indicator name and
/// normalized values.
pub fn compare(series: &[Series]) -> Vec<ComparisonRow> {
    series
        .iter()
        .filter(|s| !s.observations.is_empty())
        .flat_map(|s| {
            s.observations
                .iter()
                .zip(normalize(&s.observations))
                .map(move |(o, normalized_value)| ComparisonRow {
                    year: o.year.clone(),
                    value: o.value,
                    location: o.location.clone(),
                    variant: o.variant.clone(),
                    indicator: s.indicator.clone(),
                    normalized_value,
                })
        })
        .collect()
}
