use crate::cluster::{Cluster, ClusterId};
use crate::config::StoreConfig;
use crate::distance::{euclidean, squared_euclidean};
use crate::encoder::CategoricalEncoder;
use crate::error::StoreError;
use crate::point::{Point, PointId, Record};
use log::{debug, info};
use ndarray::{Array1, ArrayView1};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Outcome of a successful [`ClusterStore::split_outliers`] call
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SplitReport {
    /// The cluster created for the peeled-off points
    pub new_cluster_id: ClusterId,
    /// Ids of the points moved into the new cluster, most distant first
    pub moved: Vec<PointId>,
}

/// Flat read projection of a single point
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointDetails {
    pub id: PointId,
    pub features: Vec<f64>,
    pub attributes: BTreeMap<String, String>,
    pub is_centroid: bool,
    pub cluster_id: ClusterId,
}

/// Flat read projection of a single cluster
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterDetails {
    pub id: ClusterId,
    /// Empty while the cluster has no members
    pub virtual_centroid: Vec<f64>,
    pub members: Vec<PointDetails>,
    pub designated_centroid: Option<PointId>,
}

/// An incrementally maintained partition of points into clusters.
///
/// The store owns every cluster and a point -> cluster index, routes new and
/// updated points to the nearest centroid, and supports a one-shot outlier
/// split plus a bounded stabilization pass. All operations are synchronous
/// and single-threaded from the caller's perspective; an embedding host must
/// guard the whole store with one exclusive lock for the duration of any
/// mutating call.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use streamclust::ClusterStore;
///
/// let mut store = ClusterStore::new();
/// store.seed(vec![array![0.0, 0.0], array![10.0, 10.0]]).unwrap();
///
/// let (point_id, cluster_id) = store.insert(array![1.0, 1.0]).unwrap();
/// assert_eq!(store.point_details(point_id).unwrap().cluster_id, cluster_id);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClusterStore {
    config: StoreConfig,
    clusters: BTreeMap<ClusterId, Cluster>,
    point_index: HashMap<PointId, ClusterId>,
    encoder: CategoricalEncoder,
    feature_arity: Option<usize>,
    point_id_counter: u64,
    cluster_id_counter: u64,
}

impl ClusterStore {
    /// Create an empty store with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with a custom configuration
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Seed the initial clusters, one per vector, each containing the seed
    /// point as its sole member and designated centroid.
    ///
    /// Returns the `(point id, cluster id)` pair for each seed, in input
    /// order.
    ///
    /// # Errors
    ///
    /// - [`StoreError::AlreadyInitialized`] if the store already has clusters
    /// - [`StoreError::EmptyInput`] if no vectors are supplied
    /// - [`StoreError::DimensionMismatch`] if the vectors disagree on arity
    ///
    /// All errors leave the store unmodified.
    pub fn seed(
        &mut self,
        initial_vectors: Vec<Array1<f64>>,
    ) -> Result<Vec<(PointId, ClusterId)>, StoreError> {
        self.seed_records(initial_vectors.into_iter().map(Record::new).collect())
    }

    /// Seed the initial clusters from full records, allowing categorical
    /// attributes on the seeds.
    pub fn seed_records(
        &mut self,
        records: Vec<Record>,
    ) -> Result<Vec<(PointId, ClusterId)>, StoreError> {
        if !self.clusters.is_empty() {
            return Err(StoreError::AlreadyInitialized(self.clusters.len()));
        }
        if records.is_empty() {
            return Err(StoreError::EmptyInput(
                "at least one seed vector is required".to_string(),
            ));
        }

        // Validate every record before touching any state: seeding is
        // all-or-nothing.
        let arity = records[0].features.len();
        for record in &records[1..] {
            if record.features.len() != arity {
                return Err(StoreError::DimensionMismatch(format!(
                    "seed vectors have arity {} and {}",
                    arity,
                    record.features.len()
                )));
            }
        }

        self.feature_arity = Some(arity);

        let mut assignments = Vec::with_capacity(records.len());
        for record in records {
            self.encoder.intern(&record.attributes);
            let point = Point::from_record(self.next_point_id(), record);
            let point_id = point.id();
            let cluster_id = self.next_cluster_id();
            let cluster = Cluster::new(cluster_id, point, &self.encoder);
            self.clusters.insert(cluster_id, cluster);
            self.point_index.insert(point_id, cluster_id);
            assignments.push((point_id, cluster_id));
        }

        info!(
            "seeded {} clusters with feature arity {}",
            assignments.len(),
            arity
        );
        Ok(assignments)
    }

    /// Insert a numeric-only point, routing it to the cluster with the
    /// nearest centroid. Ties go to the lowest cluster id.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotInitialized`] if the store has not been seeded
    /// - [`StoreError::DimensionMismatch`] if the arity does not match the
    ///   store's established arity
    /// - [`StoreError::NoClusterFound`] if no candidate minimum exists
    ///   (defensive; unreachable while any cluster exists)
    pub fn insert(&mut self, features: Array1<f64>) -> Result<(PointId, ClusterId), StoreError> {
        self.insert_record(Record::new(features))
    }

    /// Insert a full record, allowing categorical attributes
    pub fn insert_record(&mut self, record: Record) -> Result<(PointId, ClusterId), StoreError> {
        if self.clusters.is_empty() {
            return Err(StoreError::NotInitialized);
        }
        self.check_feature_arity(record.features.len())?;

        self.encoder.intern(&record.attributes);
        let point = Point::from_record(self.next_point_id(), record);
        let point_id = point.id();
        let encoded = self.encoder.vector_for(&point);

        let (target, dist) = self
            .nearest_cluster(&encoded.view())?
            .ok_or(StoreError::NoClusterFound)?;

        let cluster = self
            .clusters
            .get_mut(&target)
            .ok_or(StoreError::NoClusterFound)?;
        cluster.add(point, &self.encoder)?;
        self.point_index.insert(point_id, target);

        debug!("inserted {point_id} into {target} (distance {dist:.4})");
        Ok((point_id, target))
    }

    /// Remove a point. Returns false if the point id is unknown, which is an
    /// expected outcome of normal use (e.g. double removal), not an error.
    ///
    /// The owning cluster's centroid is recomputed; the cluster itself is
    /// kept even when emptied, unless
    /// [`prune_empty`](crate::StoreConfig::prune_empty) is set.
    pub fn remove(&mut self, point_id: PointId) -> bool {
        let Some(&cluster_id) = self.point_index.get(&point_id) else {
            debug!("remove: {point_id} is not in the store");
            return false;
        };
        let Some(cluster) = self.clusters.get_mut(&cluster_id) else {
            return false;
        };

        if !cluster.remove(point_id, &self.encoder) {
            return false;
        }
        self.point_index.remove(&point_id);
        debug!("removed {point_id} from {cluster_id}");

        if self.config.prune_empty {
            self.prune_empty_clusters();
        }
        true
    }

    /// Replace a point's features in place. Returns `Ok(false)` if the point
    /// id is unknown. The owning cluster's centroid and designation are
    /// recomputed; membership does not change (callers typically follow with
    /// [`reassign_all`](ClusterStore::reassign_all)).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DimensionMismatch`] if the new features do not
    /// match the established arity.
    pub fn update(
        &mut self,
        point_id: PointId,
        new_features: Array1<f64>,
    ) -> Result<bool, StoreError> {
        let Some(&cluster_id) = self.point_index.get(&point_id) else {
            debug!("update: {point_id} is not in the store");
            return Ok(false);
        };
        self.check_feature_arity(new_features.len())?;

        let Some(cluster) = self.clusters.get_mut(&cluster_id) else {
            return Ok(false);
        };
        let updated = cluster.update_features(point_id, new_features, &self.encoder)?;
        if updated {
            debug!("updated features of {point_id} in {cluster_id}");
        }
        Ok(updated)
    }

    /// Run recompute-and-reassign rounds until a full pass moves no point or
    /// the configured round cap is reached. Returns the total number of
    /// moves performed.
    ///
    /// Within a round every point is ranked against the same centroid
    /// snapshot, so the result does not depend on point iteration order.
    /// Calling this again immediately performs zero moves.
    pub fn reassign_all(&mut self) -> usize {
        let mut total_moves = 0;

        for round in 0..self.config.max_reassign_rounds {
            self.recompute_all();
            let moves = self.collect_moves();
            if moves.is_empty() {
                debug!("stabilization converged after {round} rounds");
                break;
            }
            for &(point_id, from, to) in &moves {
                self.apply_move(point_id, from, to);
            }
            total_moves += moves.len();
        }

        self.recompute_all();
        if self.config.prune_empty {
            self.prune_empty_clusters();
        }

        if total_moves > 0 {
            info!("stabilization moved {total_moves} points");
        }
        total_moves
    }

    /// Peel off the points that sit further than `distance_threshold` from
    /// their own centroid while being comparatively close to another
    /// cluster's centroid, and seed a brand-new cluster with up to
    /// `max_points_to_move` of them.
    ///
    /// Candidates are ranked by `own_distance / best_other_distance`
    /// descending; each cluster's designated centroid member is never a
    /// candidate. Returns `None` when no point qualifies. This is a one-shot
    /// structural split; callers typically follow it with
    /// [`reassign_all`](ClusterStore::reassign_all).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotInitialized`] if the store has no clusters.
    pub fn split_outliers(
        &mut self,
        distance_threshold: f64,
        max_points_to_move: usize,
    ) -> Result<Option<SplitReport>, StoreError> {
        if self.clusters.is_empty() {
            return Err(StoreError::NotInitialized);
        }

        let members: Vec<(ClusterId, &Point)> = self
            .clusters
            .values()
            .flat_map(|cluster| {
                cluster
                    .members()
                    .iter()
                    .filter(|member| !member.is_centroid())
                    .map(move |member| (cluster.id(), member))
            })
            .collect();

        // Score every candidate against the current centroids; read-only, so
        // it parallelizes cleanly.
        let mut candidates: Vec<(f64, PointId, ClusterId)> = members
            .par_iter()
            .filter_map(|&(home, point)| {
                let encoded = self.encoder.vector_for(point);
                let own_cluster = self.clusters.get(&home)?;
                let own = euclidean(&encoded.view(), &own_cluster.centroid_view()).ok()?;
                if own <= distance_threshold {
                    return None;
                }

                let mut best_other = f64::INFINITY;
                for (id, cluster) in &self.clusters {
                    if *id == home {
                        continue;
                    }
                    let dist = euclidean(&encoded.view(), &cluster.centroid_view()).ok()?;
                    if dist < best_other {
                        best_other = dist;
                    }
                }
                if !best_other.is_finite() {
                    return None;
                }

                Some((own / best_other, point.id(), home))
            })
            .collect();

        // Most unhappy first; the sort is stable, so score ties keep scan
        // order.
        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(max_points_to_move);

        if candidates.is_empty() {
            debug!("split_outliers: no point exceeded threshold {distance_threshold}");
            return Ok(None);
        }

        let mut moved = Vec::with_capacity(candidates.len());
        let mut taken = Vec::with_capacity(candidates.len());
        let mut affected = Vec::with_capacity(candidates.len());
        for &(_, point_id, home) in &candidates {
            if let Some(cluster) = self.clusters.get_mut(&home) {
                if let Some(point) = cluster.take_member(point_id) {
                    moved.push(point_id);
                    taken.push(point);
                    affected.push(home);
                }
            }
        }

        let mut points = taken.into_iter();
        let Some(seed) = points.next() else {
            return Ok(None);
        };
        let new_cluster_id = self.next_cluster_id();
        let mut new_cluster = Cluster::new(new_cluster_id, seed, &self.encoder);
        for point in points {
            new_cluster.adopt_member(point);
        }
        new_cluster.recompute(&self.encoder);
        self.clusters.insert(new_cluster_id, new_cluster);

        for point_id in &moved {
            self.point_index.insert(*point_id, new_cluster_id);
        }
        for cluster_id in affected {
            if let Some(cluster) = self.clusters.get_mut(&cluster_id) {
                cluster.recompute(&self.encoder);
            }
        }

        info!(
            "split {} outliers into new {new_cluster_id}",
            moved.len()
        );
        Ok(Some(SplitReport {
            new_cluster_id,
            moved,
        }))
    }

    /// Read projection of one cluster
    pub fn details(&self, cluster_id: ClusterId) -> Option<ClusterDetails> {
        let cluster = self.clusters.get(&cluster_id)?;
        Some(ClusterDetails {
            id: cluster.id(),
            virtual_centroid: cluster
                .virtual_centroid()
                .map_or_else(Vec::new, |c| c.to_vec()),
            members: cluster
                .members()
                .iter()
                .map(|member| self.project_point(member, cluster.id()))
                .collect(),
            designated_centroid: cluster.designated_centroid().map(Point::id),
        })
    }

    /// Read projections of every cluster, in ascending id order
    pub fn all_details(&self) -> Vec<ClusterDetails> {
        self.clusters
            .keys()
            .filter_map(|id| self.details(*id))
            .collect()
    }

    /// Read projection of one point, or `None` if the id is unknown
    pub fn point_details(&self, point_id: PointId) -> Option<PointDetails> {
        let cluster_id = *self.point_index.get(&point_id)?;
        let cluster = self.clusters.get(&cluster_id)?;
        let member = cluster.member(point_id)?;
        Some(self.project_point(member, cluster_id))
    }

    /// Borrow a cluster directly
    pub fn cluster(&self, cluster_id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&cluster_id)
    }

    /// Number of clusters, including empty ones
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Number of points currently assigned
    pub fn point_count(&self) -> usize {
        self.point_index.len()
    }

    /// Whether the store has been seeded
    pub fn is_initialized(&self) -> bool {
        !self.clusters.is_empty()
    }

    /// The feature arity established at seeding, if any
    pub fn feature_arity(&self) -> Option<usize> {
        self.feature_arity
    }

    /// The shared categorical code table
    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.encoder
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn check_feature_arity(&self, arity: usize) -> Result<(), StoreError> {
        match self.feature_arity {
            Some(expected) if expected != arity => Err(StoreError::DimensionMismatch(format!(
                "store expects feature arity {expected}, got {arity}"
            ))),
            _ => Ok(()),
        }
    }

    /// Rank every cluster by centroid distance and return the closest, with
    /// ties broken by lowest id (the map iterates in ascending id order and
    /// the comparison is strict).
    fn nearest_cluster(
        &self,
        candidate: &ArrayView1<f64>,
    ) -> Result<Option<(ClusterId, f64)>, StoreError> {
        let mut best: Option<(ClusterId, f64)> = None;
        for (id, cluster) in &self.clusters {
            let dist_sq = squared_euclidean(candidate, &cluster.centroid_view())?;
            if best.map_or(true, |(_, best_sq)| dist_sq < best_sq) {
                best = Some((*id, dist_sq));
            }
        }
        Ok(best.map(|(id, dist_sq)| (id, dist_sq.sqrt())))
    }

    /// Compute, against the current centroids, every point whose nearest
    /// cluster differs from its owner. Pure read, one rayon task per point.
    fn collect_moves(&self) -> Vec<(PointId, ClusterId, ClusterId)> {
        let mut assignments: Vec<(PointId, ClusterId)> = self
            .point_index
            .iter()
            .map(|(point_id, cluster_id)| (*point_id, *cluster_id))
            .collect();
        assignments.sort_unstable_by_key(|(point_id, _)| *point_id);

        assignments
            .par_iter()
            .filter_map(|&(point_id, current)| {
                let member = self.clusters.get(&current)?.member(point_id)?;
                let encoded = self.encoder.vector_for(member);
                let (nearest, _) = self.nearest_cluster(&encoded.view()).ok().flatten()?;
                (nearest != current).then_some((point_id, current, nearest))
            })
            .collect()
    }

    fn apply_move(&mut self, point_id: PointId, from: ClusterId, to: ClusterId) {
        let Some(point) = self
            .clusters
            .get_mut(&from)
            .and_then(|cluster| cluster.take_member(point_id))
        else {
            return;
        };

        match self.clusters.get_mut(&to) {
            Some(target) => {
                target.adopt_member(point);
                self.point_index.insert(point_id, to);
                debug!("moved {point_id} from {from} to {to}");
            }
            None => {
                // Target vanished between ranking and application; put the
                // point back where it was.
                if let Some(origin) = self.clusters.get_mut(&from) {
                    origin.adopt_member(point);
                }
            }
        }
    }

    fn recompute_all(&mut self) {
        for cluster in self.clusters.values_mut() {
            cluster.recompute(&self.encoder);
        }
    }

    fn prune_empty_clusters(&mut self) {
        self.clusters.retain(|id, cluster| {
            if cluster.is_empty() {
                info!("pruned empty {id}");
                false
            } else {
                true
            }
        });
    }

    fn project_point(&self, point: &Point, cluster_id: ClusterId) -> PointDetails {
        PointDetails {
            id: point.id(),
            features: point.features().to_vec(),
            attributes: point.attributes().clone(),
            is_centroid: point.is_centroid(),
            cluster_id,
        }
    }

    fn next_point_id(&mut self) -> PointId {
        let id = PointId::new(self.point_id_counter);
        self.point_id_counter += 1;
        id
    }

    fn next_cluster_id(&mut self) -> ClusterId {
        let id = ClusterId::new(self.cluster_id_counter);
        self.cluster_id_counter += 1;
        id
    }
}
