use crate::point::Point;
use ndarray::Array1;
use std::collections::BTreeMap;

/// Assigns stable integer codes to categorical attribute values.
///
/// The encoder is shared across the whole store so distances stay comparable
/// over time: the first value seen for an attribute receives code 0, every
/// subsequent unseen value receives the current maximum plus one, and a code
/// is never reassigned once given.
///
/// Attributes are kept in a `BTreeMap`, so the attribute order used by
/// [`vector_for`](CategoricalEncoder::vector_for) is the attribute names in
/// lexicographic order, which is stable across runs.
#[derive(Debug, Clone, Default)]
pub struct CategoricalEncoder {
    table: BTreeMap<String, BTreeMap<String, u64>>,
}

impl CategoricalEncoder {
    /// Create an encoder with an empty code table
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code for `value` under `attribute`, allocating a fresh one
    /// if the value has not been seen before.
    pub fn encode(&mut self, attribute: &str, value: &str) -> u64 {
        let values = self.table.entry(attribute.to_string()).or_default();

        if let Some(&code) = values.get(value) {
            return code;
        }

        let next = values.values().max().map_or(0, |max| max + 1);
        values.insert(value.to_string(), next);
        next
    }

    /// Allocate codes for every attribute carried by `attributes`.
    ///
    /// Called by the store at ingestion time so first-seen order is the
    /// order records enter the system.
    pub fn intern(&mut self, attributes: &BTreeMap<String, String>) {
        for (attribute, value) in attributes {
            self.encode(attribute, value);
        }
    }

    /// Look up the code for a value without allocating
    pub fn code(&self, attribute: &str, value: &str) -> Option<u64> {
        self.table.get(attribute).and_then(|values| values.get(value)).copied()
    }

    /// Build the vector fed to the distance function for `point`: its numeric
    /// features followed by the resolved code of each categorical attribute,
    /// in attribute-name order.
    ///
    /// Points without categorical attributes encode to their feature vector
    /// unchanged. Codes for attributes carried by the point are interned at
    /// ingestion, so lookups here do not miss; an unknown value resolves to 0.
    pub fn vector_for(&self, point: &Point) -> Array1<f64> {
        if point.attributes().is_empty() {
            return point.features().to_owned();
        }

        let mut values = Vec::with_capacity(point.arity() + point.attributes().len());
        values.extend(point.features().iter().copied());
        for (attribute, value) in point.attributes() {
            values.push(self.code(attribute, value).unwrap_or(0) as f64);
        }
        Array1::from_vec(values)
    }

    /// Number of distinct values recorded for `attribute`
    pub fn cardinality(&self, attribute: &str) -> usize {
        self.table.get(attribute).map_or(0, BTreeMap::len)
    }

    /// The full attribute -> (value -> code) table
    pub fn code_table(&self) -> &BTreeMap<String, BTreeMap<String, u64>> {
        &self.table
    }
}
