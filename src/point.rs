use ndarray::Array1;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque, stable identifier for a point, assigned by the store at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointId(u64);

impl PointId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value, for export to persistence collaborators
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point-{}", self.0)
    }
}

/// A raw observation supplied by a feature source (CSV import, generator,
/// form input). The store turns records into [`Point`]s on ingestion.
#[derive(Debug, Clone)]
pub struct Record {
    /// Ordered numeric features
    pub features: Array1<f64>,
    /// Raw categorical attributes, resolved to codes on demand by the
    /// store's encoder
    pub attributes: BTreeMap<String, String>,
}

impl Record {
    /// Create a numeric-only record
    pub fn new(features: Array1<f64>) -> Self {
        Self {
            features,
            attributes: BTreeMap::new(),
        }
    }

    /// Attach a categorical attribute
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

/// A point owned by exactly one cluster at a time.
///
/// Categorical attributes stay raw on the point; their numeric codes live in
/// the store's [`CategoricalEncoder`](crate::CategoricalEncoder) and are
/// resolved whenever a distance is computed.
#[derive(Debug, Clone)]
pub struct Point {
    id: PointId,
    features: Array1<f64>,
    attributes: BTreeMap<String, String>,
    is_centroid: bool,
}

impl Point {
    pub(crate) fn from_record(id: PointId, record: Record) -> Self {
        Self {
            id,
            features: record.features,
            attributes: record.attributes,
            is_centroid: false,
        }
    }

    pub fn id(&self) -> PointId {
        self.id
    }

    pub fn features(&self) -> &Array1<f64> {
        &self.features
    }

    /// Number of numeric features
    pub fn arity(&self) -> usize {
        self.features.len()
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// True only for the member currently designated as its cluster's
    /// concrete representative
    pub fn is_centroid(&self) -> bool {
        self.is_centroid
    }

    pub(crate) fn set_centroid(&mut self, marked: bool) {
        self.is_centroid = marked;
    }

    pub(crate) fn set_features(&mut self, features: Array1<f64>) {
        self.features = features;
    }
}
