// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

use crate::ids::EntityUid;

pub const DEFAULT_CATALOG_BASE_URL: &str = "https://swapi.tech/api";
pub const UNKNOWN_VALUE: &str = "Unknown";
pub const SWIPE_HINT: &str = "Swipe left to view details";
pub const EMPTY_RESULTS_MESSAGE: &str = "No results found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Planets,
    Starships,
    Films,
}

impl ResourceKind {
    pub const ALL: [Self; 3] = [Self::Planets, Self::Starships, Self::Films];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planets => "planets",
            Self::Starships => "starships",
            Self::Films => "films",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Planets => "Planets",
            Self::Starships => "Starships",
            Self::Films => "Films",
        }
    }

    pub const fn singular(self) -> &'static str {
        match self {
            Self::Planets => "planet",
            Self::Starships => "starship",
            Self::Films => "film",
        }
    }

    /// Path segment below the catalog base URL. The starships collection is
    /// only served with a trailing slash.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Planets => "planets",
            Self::Starships => "starships/",
            Self::Films => "films",
        }
    }

    pub const fn display_field(self) -> &'static str {
        match self {
            Self::Films => "title",
            Self::Planets | Self::Starships => "name",
        }
    }

    pub const fn detail_screen(self) -> &'static str {
        match self {
            Self::Planets => "PlanetDetail",
            Self::Starships => "SpaceshipDetail",
            Self::Films => "FilmDetail",
        }
    }

    pub const fn id_param(self) -> &'static str {
        match self {
            Self::Planets => "planetId",
            Self::Starships => "shipId",
            Self::Films => "filmId",
        }
    }

    pub const fn label_param(self) -> &'static str {
        match self {
            Self::Planets => "planetName",
            Self::Starships => "shipName",
            Self::Films => "filmTitle",
        }
    }

    pub const fn search_placeholder(self) -> &'static str {
        match self {
            Self::Planets => "Search Planets...",
            Self::Starships => "Search Starships...",
            Self::Films => "Search Films...",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "planets" => Some(Self::Planets),
            "starships" => Some(Self::Starships),
            "films" => Some(Self::Films),
            _ => None,
        }
    }

    pub fn from_detail_screen(screen: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.detail_screen() == screen)
    }

    pub const fn detail_fields(self) -> &'static [DetailFieldSpec] {
        match self {
            Self::Planets => PLANET_FIELDS,
            Self::Starships => STARSHIP_FIELDS,
            Self::Films => FILM_FIELDS,
        }
    }

    /// Builds the presentation row for one entity of this kind.
    pub fn row_for(self, entity: &Entity) -> ListRow {
        let name = entity
            .field_text(self.display_field())
            .unwrap_or_else(|| UNKNOWN_VALUE.to_owned());
        let (title, subtitle) = match self {
            Self::Planets => (
                name,
                format!(
                    "Climate: {} • Population: {}",
                    entity.field_or_unknown("climate"),
                    entity.field_or_unknown("population"),
                ),
            ),
            Self::Starships => (name, SWIPE_HINT.to_owned()),
            Self::Films => {
                let title = match entity.field_text("episode_id") {
                    Some(episode) => format!("{name}, Episode {episode}"),
                    None => name,
                };
                (title, SWIPE_HINT.to_owned())
            }
        };
        ListRow {
            uid: entity.uid(),
            title,
            subtitle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailFieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: Option<&'static str>,
}

const fn field(key: &'static str, label: &'static str) -> DetailFieldSpec {
    DetailFieldSpec {
        key,
        label,
        unit: None,
    }
}

const fn field_with_unit(
    key: &'static str,
    label: &'static str,
    unit: &'static str,
) -> DetailFieldSpec {
    DetailFieldSpec {
        key,
        label,
        unit: Some(unit),
    }
}

const STARSHIP_FIELDS: &[DetailFieldSpec] = &[
    field("model", "Model"),
    field("manufacturer", "Manufacturer"),
    field("starship_class", "Starship Class"),
    field_with_unit("cost_in_credits", "Cost", "credits"),
    field_with_unit("length", "Length", "meters"),
    field("crew", "Crew"),
    field("passengers", "Passengers"),
    field("max_atmosphering_speed", "Max Speed"),
    field("hyperdrive_rating", "Hyperdrive Rating"),
    field("cargo_capacity", "Cargo Capacity"),
    field("consumables", "Consumables"),
];

const PLANET_FIELDS: &[DetailFieldSpec] = &[
    field("climate", "Climate"),
    field("population", "Population"),
    field("terrain", "Terrain"),
    field_with_unit("diameter", "Diameter", "km"),
    field("gravity", "Gravity"),
    field_with_unit("rotation_period", "Rotation Period", "hours"),
    field_with_unit("orbital_period", "Orbital Period", "days"),
    field_with_unit("surface_water", "Surface Water", "%"),
];

const FILM_FIELDS: &[DetailFieldSpec] = &[
    field("title", "Title"),
    field("episode_id", "Episode"),
    field("director", "Director"),
    field("producer", "Producer"),
    field("release_date", "Release Date"),
    field("opening_crawl", "Opening Crawl"),
];

/// Immutable description of which remote collection a screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    resource_name: String,
    endpoint: Url,
}

impl CollectionQuery {
    pub fn new(resource_name: impl Into<String>, endpoint: Url) -> Result<Self> {
        if !matches!(endpoint.scheme(), "http" | "https") {
            bail!(
                "collection endpoint {endpoint} must use http or https, got {:?}",
                endpoint.scheme()
            );
        }
        if endpoint.cannot_be_a_base() {
            bail!("collection endpoint {endpoint} cannot carry a path");
        }
        Ok(Self {
            resource_name: resource_name.into(),
            endpoint,
        })
    }

    pub fn for_kind(base_url: &str, kind: ResourceKind) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        if base_url.is_empty() {
            bail!("catalog base_url must not be empty");
        }
        let raw = format!("{base_url}/{}", kind.path());
        let endpoint =
            Url::parse(&raw).with_context(|| format!("parse {} endpoint {raw:?}", kind.as_str()))?;
        Self::new(kind.as_str(), endpoint)
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `{endpoint}/{id}`, with a trailing slash on the endpoint collapsed.
    pub fn detail_url(&self, id: &EntityUid) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id.as_str());
        }
        url
    }
}

/// One catalog record as served by the API. Only `uid` has meaning to the
/// controller; everything else is passed through to presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn uid(&self) -> Option<EntityUid> {
        self.field_text("uid").map(EntityUid::new)
    }

    /// Text form of a field; `None` when the key is absent or `null`.
    pub fn field_text(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(value_text)
    }

    fn field_or_unknown(&self, key: &str) -> String {
        self.field_text(key)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| UNKNOWN_VALUE.to_owned())
    }
}

pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}")]
    Http { status: u16 },
    #[error("malformed response: {0}")]
    Parse(String),
}

impl FetchFailure {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Http { .. } => "http",
            Self::Parse(_) => "parse",
        }
    }
}

pub type FetchOutcome = std::result::Result<Vec<Entity>, FetchFailure>;
pub type DetailOutcome = std::result::Result<DetailProperties, FetchFailure>;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum CollectionState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<Entity>),
    Failed(FetchFailure),
}

impl From<FetchOutcome> for CollectionState {
    fn from(outcome: FetchOutcome) -> Self {
        match outcome {
            Ok(items) => Self::Loaded(items),
            Err(failure) => Self::Failed(failure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailField {
    pub key: String,
    pub label: String,
    pub value: String,
    pub unit: Option<&'static str>,
}

impl DetailField {
    pub fn display_value(&self) -> String {
        match self.unit {
            Some(unit) if self.value != UNKNOWN_VALUE => format!("{} {unit}", self.value),
            _ => self.value.clone(),
        }
    }
}

/// Flattened `result.properties` of one entity. Every known field of the
/// resource kind is present; missing values hold [`UNKNOWN_VALUE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailProperties {
    fields: Vec<DetailField>,
}

impl DetailProperties {
    pub fn from_properties(kind: ResourceKind, properties: &Map<String, Value>) -> Self {
        let specs = kind.detail_fields();
        let mut fields = specs
            .iter()
            .map(|spec| DetailField {
                key: spec.key.to_owned(),
                label: spec.label.to_owned(),
                value: properties
                    .get(spec.key)
                    .and_then(value_text)
                    .filter(|value| !value.is_empty())
                    .unwrap_or_else(|| UNKNOWN_VALUE.to_owned()),
                unit: spec.unit,
            })
            .collect::<Vec<_>>();

        let extras = properties
            .iter()
            .filter(|(key, _)| !specs.iter().any(|spec| spec.key == key.as_str()))
            .filter_map(|(key, value)| value_text(value).map(|text| (key.clone(), text)))
            .collect::<BTreeMap<_, _>>();
        fields.extend(extras.into_iter().map(|(key, value)| DetailField {
            label: key.clone(),
            key,
            value,
            unit: None,
        }));

        Self { fields }
    }

    pub fn placeholder(kind: ResourceKind) -> Self {
        Self::from_properties(kind, &Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| field.value.as_str())
    }

    pub fn fields(&self) -> &[DetailField] {
        &self.fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Loading,
    Loaded(DetailProperties),
    Failed(FetchFailure),
}

impl From<DetailOutcome> for DetailState {
    fn from(outcome: DetailOutcome) -> Self {
        match outcome {
            Ok(properties) => Self::Loaded(properties),
            Err(failure) => Self::Failed(failure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationIntent {
    pub target_screen: String,
    pub params: BTreeMap<String, String>,
}

impl NavigationIntent {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Per-screen configuration of a list controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenConfig {
    pub kind: ResourceKind,
    pub query: CollectionQuery,
    pub display_field: String,
}

impl ScreenConfig {
    pub fn for_kind(base_url: &str, kind: ResourceKind) -> Result<Self> {
        Ok(Self {
            kind,
            query: CollectionQuery::for_kind(base_url, kind)?,
            display_field: kind.display_field().to_owned(),
        })
    }

    pub fn navigation_intent(&self, entity: &Entity) -> Option<NavigationIntent> {
        let uid = entity.uid()?;
        let label = entity
            .field_text(&self.display_field)
            .unwrap_or_else(|| UNKNOWN_VALUE.to_owned());
        let params = BTreeMap::from([
            (self.kind.id_param().to_owned(), uid.to_string()),
            (self.kind.label_param().to_owned(), label),
        ]);
        Some(NavigationIntent {
            target_screen: self.kind.detail_screen().to_owned(),
            params,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub uid: Option<EntityUid>,
    pub title: String,
    pub subtitle: String,
}
