use crate::encoder::CategoricalEncoder;
use crate::error::StoreError;
use crate::point::{Point, PointId};
use ndarray::{Array1, ArrayView1};
use std::fmt;

/// Identifier for a cluster, assigned monotonically by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterId(u64);

impl ClusterId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value, for export to persistence collaborators
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster-{}", self.0)
    }
}

/// A cluster owning a set of member points and a derived centroid.
///
/// The virtual centroid is the coordinate-wise mean of the members' encoded
/// vectors and is recomputed before any mutating method returns, so callers
/// never observe a stale centroid. An empty cluster has an undefined
/// centroid, which compares as infinitely far in distance ranking.
#[derive(Debug, Clone)]
pub struct Cluster {
    id: ClusterId,
    members: Vec<Point>,
    // Empty means undefined (no members).
    centroid: Array1<f64>,
}

impl Cluster {
    /// Create a cluster from a single seed point. The centroid starts at the
    /// seed's own encoded vector and the seed is the designated centroid
    /// member.
    pub fn new(id: ClusterId, seed: Point, encoder: &CategoricalEncoder) -> Self {
        let mut cluster = Self {
            id,
            members: vec![seed],
            centroid: Array1::zeros(0),
        };
        cluster.recompute(encoder);
        cluster
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    /// Members in insertion order
    pub fn members(&self) -> &[Point] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The virtual centroid, or `None` while the cluster has no members
    pub fn virtual_centroid(&self) -> Option<ArrayView1<'_, f64>> {
        if self.centroid.is_empty() {
            None
        } else {
            Some(self.centroid.view())
        }
    }

    /// Centroid view for distance ranking; empty when undefined, which the
    /// distance function treats as infinitely far.
    pub(crate) fn centroid_view(&self) -> ArrayView1<'_, f64> {
        self.centroid.view()
    }

    /// The member currently designated as the concrete representative
    /// closest to the virtual centroid
    pub fn designated_centroid(&self) -> Option<&Point> {
        self.members.iter().find(|member| member.is_centroid())
    }

    /// Find a member by id
    pub fn member(&self, id: PointId) -> Option<&Point> {
        self.members.iter().find(|member| member.id() == id)
    }

    /// Append a point to the membership and bring the centroid and
    /// designation up to date.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DimensionMismatch`] if the point's encoded
    /// vector does not match the cluster's established arity.
    pub fn add(&mut self, point: Point, encoder: &CategoricalEncoder) -> Result<(), StoreError> {
        let encoded = encoder.vector_for(&point);
        if !self.centroid.is_empty() && encoded.len() != self.centroid.len() {
            return Err(StoreError::DimensionMismatch(format!(
                "point {} has encoded arity {}, {} expects {}",
                point.id(),
                encoded.len(),
                self.id,
                self.centroid.len()
            )));
        }

        self.members.push(point);
        self.recompute(encoder);
        Ok(())
    }

    /// Remove the member with the given id. Returns false if it is not a
    /// member. The centroid is recomputed even if the cluster becomes empty,
    /// in which case it becomes undefined.
    pub fn remove(&mut self, id: PointId, encoder: &CategoricalEncoder) -> bool {
        match self.take_member(id) {
            Some(_) => {
                self.recompute(encoder);
                true
            }
            None => false,
        }
    }

    /// Replace a member's features in place and recompute.
    ///
    /// Returns `Ok(false)` if the point is not a member.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DimensionMismatch`] if the new features do not
    /// have the same arity as the member's previous features.
    pub fn update_features(
        &mut self,
        id: PointId,
        new_features: Array1<f64>,
        encoder: &CategoricalEncoder,
    ) -> Result<bool, StoreError> {
        let Some(position) = self.members.iter().position(|member| member.id() == id) else {
            return Ok(false);
        };

        let current_arity = self.members[position].arity();
        if new_features.len() != current_arity {
            return Err(StoreError::DimensionMismatch(format!(
                "{} has arity {}, replacement has arity {}",
                id,
                current_arity,
                new_features.len()
            )));
        }

        self.members[position].set_features(new_features);
        self.recompute(encoder);
        Ok(true)
    }

    /// Detach a member without recomputing. Bulk-move hook for the store;
    /// the caller must recompute affected clusters before returning.
    pub(crate) fn take_member(&mut self, id: PointId) -> Option<Point> {
        let position = self.members.iter().position(|member| member.id() == id)?;
        Some(self.members.remove(position))
    }

    /// Attach a member without recomputing. Bulk-move hook for the store.
    pub(crate) fn adopt_member(&mut self, point: Point) {
        self.members.push(point);
    }

    /// Recenter the virtual centroid and re-designate the closest member.
    ///
    /// Runs as one atomic step from the caller's perspective: every mutating
    /// method calls it before returning, so no caller sees a centroid built
    /// from partial membership.
    pub(crate) fn recompute(&mut self, encoder: &CategoricalEncoder) {
        self.recenter(encoder);
        self.designate(encoder);
    }

    fn recenter(&mut self, encoder: &CategoricalEncoder) {
        if self.members.is_empty() {
            self.centroid = Array1::zeros(0);
            return;
        }

        let mut sum = encoder.vector_for(&self.members[0]);
        for member in &self.members[1..] {
            sum += &encoder.vector_for(member);
        }
        sum /= self.members.len() as f64;
        self.centroid = sum;
    }

    fn designate(&mut self, encoder: &CategoricalEncoder) {
        for member in &mut self.members {
            member.set_centroid(false);
        }

        if self.members.is_empty() || self.centroid.is_empty() {
            return;
        }

        // Membership-order scan with strict less-than: the first minimum
        // wins ties.
        let mut closest = 0;
        let mut best = f64::INFINITY;
        for (position, member) in self.members.iter().enumerate() {
            let encoded = encoder.vector_for(member);
            let mut dist_sq = 0.0;
            for (a, b) in encoded.iter().zip(self.centroid.iter()) {
                let d = a - b;
                dist_sq += d * d;
            }
            if dist_sq < best {
                best = dist_sq;
                closest = position;
            }
        }
        self.members[closest].set_centroid(true);
    }
}
