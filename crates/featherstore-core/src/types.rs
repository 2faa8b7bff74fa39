//! Core data model for Featherstore
//!
//! Defines the feature-coupled object (FCO) family managed by the registry
//! (entities, data sources, feature views, on-demand feature views, feature
//! services), the value types flowing through materialization, and the
//! serialized registry snapshot.
//!
//! Every FCO splits into a user-declared spec (immutable description) and
//! derived metadata (timestamps, materialization watermark). Specs are what
//! `apply` diffs; metadata is owned by the system and survives re-apply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Represents a single entity identifier (e.g. driver_id, user_id)
///
/// Features are always keyed by entity instances. An EntityKey is a
/// name-value pair identifying one instance.
///
/// # Examples
///
/// ```
/// use featherstore_core::EntityKey;
///
/// let key = EntityKey::new("driver_id", "3");
/// assert_eq!(key.name, "driver_id");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EntityKey {
    /// The name of the entity join key (e.g. "driver_id")
    pub name: String,

    /// The value of the entity, stored as String; typed parsing is the
    /// concern of the concrete stores
    pub value: String,
}

impl EntityKey {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A feature value of one of the supported scalar types
///
/// Uses `#[serde(untagged)]` for clean JSON: `Int(42)` serializes as `42`,
/// not `{"Int": 42}`. `Null` must stay the first variant so it wins the
/// untagged match for JSON null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Null/missing value
    Null,

    /// Integer value (e.g. trip counts)
    Int(i64),

    /// Floating point value (e.g. locations, rates)
    Float(f64),

    /// String value (e.g. categories)
    String(String),

    /// Boolean flag
    Bool(bool),
}

/// A row of feature values for one entity at one event time
///
/// The event timestamp is required: materialization orders rows by it
/// (last-write-wins by event time, not by write order), and the online
/// stores keep only the newest row per key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureRow {
    /// Entity identifiers for this row
    pub entities: Vec<EntityKey>,

    /// Feature name -> value mapping
    pub features: HashMap<String, FeatureValue>,

    /// Event time at which these values were observed
    pub event_timestamp: DateTime<Utc>,
}

impl FeatureRow {
    pub fn new(entities: Vec<EntityKey>, event_timestamp: DateTime<Utc>) -> Self {
        Self {
            entities,
            features: HashMap::new(),
            event_timestamp,
        }
    }

    /// Adds a feature to this row (builder pattern)
    pub fn with_feature(mut self, name: impl Into<String>, value: FeatureValue) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn get_feature(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }
}

/// The five FCO kinds managed by the registry
///
/// Used for list/describe dispatch and for `NotFound` reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FcoKind {
    Entity,
    DataSource,
    FeatureView,
    OnDemandFeatureView,
    FeatureService,
}

impl fmt::Display for FcoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => write!(f, "Entity"),
            Self::DataSource => write!(f, "Data source"),
            Self::FeatureView => write!(f, "Feature view"),
            Self::OnDemandFeatureView => write!(f, "On-demand feature view"),
            Self::FeatureService => write!(f, "Feature service"),
        }
    }
}

/// Common surface of every FCO spec: a unique, case-sensitive name.
pub trait FcoSpec {
    fn name(&self) -> &str;
    fn kind() -> FcoKind;
}

/// An entity: a class of objects features are keyed by
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySpec {
    pub name: String,

    /// Column name carrying this entity's key in source data
    pub join_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl EntitySpec {
    pub fn new(name: impl Into<String>, join_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            join_key: join_key.into(),
            description: None,
            tags: HashMap::new(),
        }
    }
}

impl FcoSpec for EntitySpec {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind() -> FcoKind {
        FcoKind::Entity
    }
}

/// A batch data source: where a feature view's rows come from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSourceSpec {
    pub name: String,

    /// Location understood by the offline store (table name, path, ...)
    pub path: String,

    /// Column carrying the event timestamp
    pub timestamp_field: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl DataSourceSpec {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        timestamp_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            timestamp_field: timestamp_field.into(),
            tags: HashMap::new(),
        }
    }
}

impl FcoSpec for DataSourceSpec {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind() -> FcoKind {
        FcoKind::DataSource
    }
}

/// A feature view: a named group of features sharing entities and a source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureViewSpec {
    pub name: String,

    /// Names of the entities this view is keyed by; must resolve in the
    /// same snapshot at apply time
    pub entities: Vec<String>,

    /// Feature column names served by this view
    pub features: Vec<String>,

    /// Name of the backing data source; must resolve at apply time
    pub source: String,

    /// How far back feature values stay valid. Bounds materialization
    /// windows: starts are clamped to no earlier than `end - ttl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl FeatureViewSpec {
    pub fn new(
        name: impl Into<String>,
        entities: Vec<String>,
        features: Vec<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entities,
            features,
            source: source.into(),
            ttl: None,
            tags: HashMap::new(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

impl FcoSpec for FeatureViewSpec {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind() -> FcoKind {
        FcoKind::FeatureView
    }
}

/// An on-demand feature view: features derived at request time from other
/// views or sources. The defining transformation itself is out of scope;
/// the registry tracks the declaration and its references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OnDemandFeatureViewSpec {
    pub name: String,

    /// Names of feature views or data sources this view reads from
    pub sources: Vec<String>,

    pub features: Vec<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl OnDemandFeatureViewSpec {
    pub fn new(name: impl Into<String>, sources: Vec<String>, features: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sources,
            features,
            tags: HashMap::new(),
        }
    }
}

impl FcoSpec for OnDemandFeatureViewSpec {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind() -> FcoKind {
        FcoKind::OnDemandFeatureView
    }
}

/// A feature service: a named bundle of feature views served together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureServiceSpec {
    pub name: String,

    /// Names of feature views or on-demand feature views; must resolve at
    /// apply time
    pub views: Vec<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl FeatureServiceSpec {
    pub fn new(name: impl Into<String>, views: Vec<String>) -> Self {
        Self {
            name: name.into(),
            views,
            tags: HashMap::new(),
        }
    }
}

impl FcoSpec for FeatureServiceSpec {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind() -> FcoKind {
        FcoKind::FeatureService
    }
}

/// Derived metadata attached to a stored FCO
///
/// Never part of the declared spec. `created_at` is set on first insert and
/// preserved across updates; `updated_at` refreshes whenever the spec
/// changes. The watermark is only ever written by the materialization
/// engine (feature views only) and must survive `apply`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FcoMeta {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Latest event-time upper bound successfully synchronized to the
    /// online store. Never moves backward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<DateTime<Utc>>,
}

impl FcoMeta {
    /// Fresh metadata for a newly inserted object
    pub fn created_now(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            watermark: None,
        }
    }
}

/// A stored FCO: declared spec plus derived metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FcoRecord<S> {
    pub spec: S,
    pub meta: FcoMeta,
}

impl<S: FcoSpec> FcoRecord<S> {
    pub fn new(spec: S, now: DateTime<Utc>) -> Self {
        Self {
            spec,
            meta: FcoMeta::created_now(now),
        }
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }
}

/// The serialized set of all FCOs for a project
///
/// A single consistent unit: readers never observe a partially applied
/// snapshot. Records are kept in insertion order; names are unique per
/// kind. The version increases monotonically with every persisted change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrySnapshot {
    pub project: String,
    pub version: u64,
    pub last_updated: DateTime<Utc>,
    pub entities: Vec<FcoRecord<EntitySpec>>,
    pub data_sources: Vec<FcoRecord<DataSourceSpec>>,
    pub feature_views: Vec<FcoRecord<FeatureViewSpec>>,
    pub on_demand_feature_views: Vec<FcoRecord<OnDemandFeatureViewSpec>>,
    pub feature_services: Vec<FcoRecord<FeatureServiceSpec>>,
}

impl RegistrySnapshot {
    /// Empty snapshot for a project that has never been applied to
    pub fn empty(project: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            project: project.into(),
            version: 0,
            last_updated: now,
            entities: Vec::new(),
            data_sources: Vec::new(),
            feature_views: Vec::new(),
            on_demand_feature_views: Vec::new(),
            feature_services: Vec::new(),
        }
    }

    pub fn feature_view(&self, name: &str) -> Option<&FcoRecord<FeatureViewSpec>> {
        self.feature_views.iter().find(|r| r.name() == name)
    }

    pub fn feature_view_mut(&mut self, name: &str) -> Option<&mut FcoRecord<FeatureViewSpec>> {
        self.feature_views.iter_mut().find(|r| r.spec.name == name)
    }
}

/// The declared object set handed to `apply`
///
/// Objects absent from a subsequent apply's declared set are pruned from
/// the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoContents {
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub data_sources: Vec<DataSourceSpec>,
    #[serde(default)]
    pub feature_views: Vec<FeatureViewSpec>,
    #[serde(default)]
    pub on_demand_feature_views: Vec<OnDemandFeatureViewSpec>,
    #[serde(default)]
    pub feature_services: Vec<FeatureServiceSpec>,
}

impl RepoContents {
    pub fn with_entity(mut self, entity: EntitySpec) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_data_source(mut self, source: DataSourceSpec) -> Self {
        self.data_sources.push(source);
        self
    }

    pub fn with_feature_view(mut self, view: FeatureViewSpec) -> Self {
        self.feature_views.push(view);
        self
    }

    pub fn with_on_demand_feature_view(mut self, view: OnDemandFeatureViewSpec) -> Self {
        self.on_demand_feature_views.push(view);
        self
    }

    pub fn with_feature_service(mut self, service: FeatureServiceSpec) -> Self {
        self.feature_services.push(service);
        self
    }
}
