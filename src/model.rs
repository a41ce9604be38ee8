use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Location id of the "World" aggregate.
pub const WORLD: i64 = 900;

const UNKNOWN: &str = "Unknown";

/// One entry of `GET /indicators`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: i64,
    pub name: String,
}

/// Indicator names mapped to their ids, in API response order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorCatalog {
    entries: Vec<Indicator>,
    by_name: HashMap<String, usize>,
}

impl IndicatorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an indicator. A repeated name keeps its first position and takes
    /// the newer id.
    pub fn insert(&mut self, name: impl Into<String>, id: i64) {
        let name = name.into();
        match self.by_name.get(&name) {
            Some(&idx) => self.entries[idx].id = id,
            None => {
                self.by_name.insert(name.clone(), self.entries.len());
                self.entries.push(Indicator { id, name });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.by_name.get(name).map(|&idx| self.entries[idx].id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|i| i.name.as_str())
    }
}

impl FromIterator<Indicator> for IndicatorCatalog {
    fn from_iter<I: IntoIterator<Item = Indicator>>(iter: I) -> Self {
        let mut catalog = IndicatorCatalog::new();
        for indicator in iter {
            catalog.insert(indicator.name, indicator.id);
        }
        catalog
    }
}

impl<'a> IntoIterator for &'a IndicatorCatalog {
    type Item = &'a Indicator;
    type IntoIter = std::slice::Iter<'a, Indicator>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// One entry of `GET /targets`. Fields other than `id` and `name` are kept
/// as returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Time period of an observation.
///
/// Numeric when every label of the response parsed as a year, otherwise the
/// raw label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Year {
    Numeric(i64),
    Label(String),
    Missing,
}

impl PartialOrd for Year {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Year {
    // Missing < Numeric < Label
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Year::Numeric(a), Year::Numeric(b)) => a.cmp(b),
            (Year::Label(a), Year::Label(b)) => a.cmp(b),
            (Year::Missing, Year::Missing) => Ordering::Equal,
            (Year::Missing, _) => Ordering::Less,
            (_, Year::Missing) => Ordering::Greater,
            (Year::Numeric(_), Year::Label(_)) => Ordering::Less,
            (Year::Label(_), Year::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Year::Numeric(y) => write!(f, "{}", y),
            Year::Label(s) => f.write_str(s),
            Year::Missing => Ok(()),
        }
    }
}

/// One (location, period, variant) measurement of an indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub year: Year,
    pub value: Option<f64>,
    pub location: String,
    pub variant: String,
}

/// `{"data": [...]}` envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default = "Vec::new")]
    pub(crate) data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NamedRef {
    #[serde(default)]
    pub(crate) id: Option<i64>,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

/// One item of `GET /data/indicators/{id}/locations/{ids}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataItem {
    #[serde(default)]
    pub(crate) time_label: Option<Value>,
    #[serde(default)]
    pub(crate) value: Option<f64>,
    #[serde(default)]
    pub(crate) location: Option<NamedRef>,
    #[serde(default)]
    pub(crate) variant: Option<NamedRef>,
}

fn label_text(label: &Value) -> Option<String> {
    match label {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_year(label: &str) -> Option<i64> {
    label.trim().parse().ok()
}

/// Maps data items to observations, one per item in order.
///
/// Years convert as a column: if any present label is not an integer, every
/// label stays raw.
pub(crate) fn shape_observations(items: Vec<DataItem>) -> Vec<Observation> {
    let labels: Vec<Option<String>> = items
        .iter()
        .map(|item| item.time_label.as_ref().and_then(label_text))
        .collect();
    let numeric = labels
        .iter()
        .flatten()
        .all(|label| parse_year(label).is_some());

    items
        .into_iter()
        .zip(labels)
        .map(|(item, label)| {
            let year = match label {
                None => Year::Missing,
                Some(label) if numeric => parse_year(&label)
                    .map(Year::Numeric)
                    .unwrap_or(Year::Label(label)),
                Some(label) => Year::Label(label),
            };
            Observation {
                year,
                value: item.value,
                location: name_or_unknown(item.location),
                variant: name_or_unknown(item.variant),
            }
        })
        .collect()
}

fn name_or_unknown(named: Option<NamedRef>) -> String {
    named
        .and_then(|n| n.name)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Distinct location ids in order of first appearance.
pub(crate) fn distinct_location_ids(items: &[DataItem]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .filter_map(|item| item.location.as_ref().and_then(|l| l.id))
        .filter(|id| seen.insert(*id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(value: Value) -> Vec<DataItem> {
        serde_json::from_value::<Envelope<DataItem>>(value).unwrap().data
    }

    #[test]
    fn shapes_full_item() {
        let obs = shape_observations(items(json!({"data": [{
            "timeLabel": "2020",
            "value": 7.8e9,
            "location": {"id": 900, "name": "World"},
            "variant": {"name": "Median"}
        }]})));
        assert_eq!(
            obs,
            vec![Observation {
                year: Year::Numeric(2020),
                value: Some(7.8e9),
                location: "World".to_string(),
                variant: "Median".to_string(),
            }]
        );
    }

    #[test]
    fn missing_nested_names_become_unknown() {
        let obs = shape_observations(items(json!({"data": [
            {"timeLabel": "2020", "value": 1.0},
            {"timeLabel": "2021", "value": null, "location": {"id": 4}, "variant": null},
            {"timeLabel": "2022", "location": {}, "variant": {"id": 4}}
        ]})));
        assert_eq!(obs.len(), 3);
        for o in &obs {
            assert_eq!(o.location, "Unknown");
            assert_eq!(o.variant, "Unknown");
        }
        assert_eq!(obs[1].value, None);
        assert_eq!(obs[2].value, None);
    }

    #[test]
    fn non_numeric_label_keeps_whole_column_raw() {
        let obs = shape_observations(items(json!({"data": [
            {"timeLabel": "2020"},
            {"timeLabel": "2020-2025"},
            {}
        ]})));
        assert_eq!(obs[0].year, Year::Label("2020".to_string()));
        assert_eq!(obs[1].year, Year::Label("2020-2025".to_string()));
        assert_eq!(obs[2].year, Year::Missing);
    }

    #[test]
    fn numeric_time_labels_are_accepted() {
        let obs = shape_observations(items(json!({"data": [{"timeLabel": 1990}]})));
        assert_eq!(obs[0].year, Year::Numeric(1990));
    }

    #[test]
    fn envelope_without_data_is_empty() {
        assert!(items(json!({"pageNumber": 1})).is_empty());
    }

    #[test]
    fn distinct_ids_keep_first_appearance_order() {
        let data = items(json!({"data": [
            {"location": {"id": 356}},
            {"location": {"id": 156}},
            {"location": {"id": 356}},
            {"location": {"name": "no id"}},
            {"location": {"id": 840}}
        ]}));
        assert_eq!(distinct_location_ids(&data), vec![356, 156, 840]);
    }

    #[test]
    fn catalog_keeps_order_and_last_id() {
        let catalog: IndicatorCatalog = vec![
            Indicator { id: 1, name: "B".to_string() },
            Indicator { id: 2, name: "A".to_string() },
            Indicator { id: 3, name: "B".to_string() },
        ]
        .into_iter()
        .collect();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(catalog.get("B"), Some(3));
        assert_eq!(catalog.get("C"), None);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn year_ordering_and_display() {
        assert!(Year::Numeric(2021) > Year::Numeric(2020));
        assert!(Year::Missing < Year::Numeric(0));
        assert_eq!(Year::Label("2020-2025".to_string()).to_string(), "2020-2025");
        assert_eq!(Year::Missing.to_string(), "");
    }

    #[test]
    fn target_keeps_extra_fields() {
        let t: Target = serde_json::from_value(json!({"id": 1, "name": "x", "type": "SDG"})).unwrap();
        assert_eq!(t.id, Some(1));
        assert_eq!(t.extra.get("type"), Some(&json!("SDG")));
    }
}
