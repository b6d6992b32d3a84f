use approx::assert_relative_eq;
use ndarray::{array, Array1};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use streamclust::{ClusterStore, PointId, Record, StoreConfig, StoreError};

/// Generate points scattered around the given centers, `per_center` each,
/// deterministically.
fn generate_blobs(centers: &[Array1<f64>], per_center: usize, seed: u64) -> Vec<Array1<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(centers.len() * per_center);

    for center in centers {
        for _ in 0..per_center {
            let noise = Array1::random_using(center.len(), Uniform::new(-0.5, 0.5), &mut rng);
            points.push(center + &noise);
        }
    }
    points
}

/// Recompute each cluster's expected centroid from its member features and
/// compare against the reported one.
fn assert_centroids_are_exact_means(store: &ClusterStore) {
    for details in store.all_details() {
        if details.members.is_empty() {
            assert!(details.virtual_centroid.is_empty());
            continue;
        }

        let arity = details.members[0].features.len();
        let mut mean = vec![0.0; arity];
        for member in &details.members {
            for (sum, value) in mean.iter_mut().zip(&member.features) {
                *sum += value;
            }
        }
        for sum in &mut mean {
            *sum /= details.members.len() as f64;
        }

        for (expected, actual) in mean.iter().zip(&details.virtual_centroid) {
            assert_relative_eq!(*expected, *actual, epsilon = 1e-9);
        }

        // Exactly one member is the designated centroid.
        let marked: Vec<&PointId> = details
            .members
            .iter()
            .filter(|m| m.is_centroid)
            .map(|m| &m.id)
            .collect();
        assert_eq!(marked.len(), 1);
        assert_eq!(Some(*marked[0]), details.designated_centroid);
    }
}

// ============================================================================
// Seeding
// ============================================================================

#[test]
fn test_seed_scenario_each_centroid_equals_its_seed() {
    let mut store = ClusterStore::new();
    let assignments = store
        .seed(vec![array![45_000.0, 2e9, 15.0], array![48_000.0, 2.5e9, 30.0]])
        .unwrap();

    assert_eq!(store.cluster_count(), 2);

    let first = store.details(assignments[0].1).unwrap();
    assert_eq!(first.virtual_centroid, vec![45_000.0, 2e9, 15.0]);
    assert_eq!(first.designated_centroid, Some(assignments[0].0));

    let second = store.details(assignments[1].1).unwrap();
    assert_eq!(second.virtual_centroid, vec![48_000.0, 2.5e9, 30.0]);
    assert_eq!(second.designated_centroid, Some(assignments[1].0));
}

#[test]
fn test_seed_rejects_mixed_arity() {
    let mut store = ClusterStore::new();
    let result = store.seed(vec![array![1.0, 2.0, 3.0], array![1.0, 2.0]]);
    assert!(matches!(result, Err(StoreError::DimensionMismatch(_))));
}

// ============================================================================
// Insertion
// ============================================================================

#[test]
fn test_insert_scenario_volume_term_dominates() {
    let mut store = ClusterStore::new();
    let seeds = store
        .seed(vec![array![50_000.0, 3e9, 45.0], array![55_000.0, 4e9, 60.0]])
        .unwrap();

    // Distance to the first centroid is ~2e8, to the second ~8e8; both are
    // dominated by the volume term.
    let (point_id, cluster_id) = store.insert(array![51_000.0, 3.2e9, 48.0]).unwrap();
    assert_eq!(cluster_id, seeds[0].1);

    let details = store.details(cluster_id).unwrap();
    assert_eq!(details.members.len(), 2);
    assert_relative_eq!(details.virtual_centroid[0], 50_500.0, epsilon = 1e-6);
    assert_relative_eq!(details.virtual_centroid[1], 3.1e9, epsilon = 1.0);
    assert_relative_eq!(details.virtual_centroid[2], 46.5, epsilon = 1e-9);

    assert_eq!(store.point_details(point_id).unwrap().cluster_id, cluster_id);
}

#[test]
fn test_insert_rejects_short_vector() {
    let mut store = ClusterStore::new();
    store
        .seed(vec![array![1.0, 2.0, 3.0], array![4.0, 5.0, 6.0]])
        .unwrap();

    let result = store.insert(array![1.0, 2.0]);
    assert!(matches!(result, Err(StoreError::DimensionMismatch(_))));
}

#[test]
fn test_insert_then_remove_restores_centroids() {
    let mut store = ClusterStore::new();
    store.seed(vec![array![0.0, 0.0], array![10.0, 10.0]]).unwrap();
    store.insert(array![1.0, 2.0]).unwrap();
    store.insert(array![9.0, 8.0]).unwrap();

    let before: Vec<Vec<f64>> = store
        .all_details()
        .iter()
        .map(|d| d.virtual_centroid.clone())
        .collect();

    let (point_id, _) = store.insert(array![3.0, 3.0]).unwrap();
    assert!(store.remove(point_id));

    let after: Vec<Vec<f64>> = store
        .all_details()
        .iter()
        .map(|d| d.virtual_centroid.clone())
        .collect();

    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        for (x, y) in b.iter().zip(a) {
            assert_relative_eq!(*x, *y, epsilon = 1e-9);
        }
    }
}

// ============================================================================
// Outlier splitting
// ============================================================================

#[test]
fn test_split_outliers_creates_new_cluster() {
    let mut store = ClusterStore::new();
    let seeds = store.seed(vec![array![0.0, 0.0], array![10.0, 0.0]]).unwrap();

    let (near_a, cluster_a) = store.insert(array![1.0, 0.0]).unwrap();
    store.insert(array![9.0, 0.0]).unwrap();
    assert_eq!(cluster_a, seeds[0].1);

    // Drag the point toward the other cluster without changing its
    // membership: its own centroid moves to (3.25, 0), so its own distance
    // is 3.25 while the other centroid sits 3.0 away.
    assert!(store.update(near_a, array![6.5, 0.0]).unwrap());

    let report = store.split_outliers(3.0, 5).unwrap().expect("one candidate");
    assert_eq!(report.moved, vec![near_a]);
    assert_eq!(store.cluster_count(), 3);

    let new_cluster = store.details(report.new_cluster_id).unwrap();
    assert_eq!(new_cluster.members.len(), 1);
    assert_eq!(new_cluster.virtual_centroid, vec![6.5, 0.0]);
    assert_eq!(new_cluster.designated_centroid, Some(near_a));

    // The origin cluster recentered on its remaining member.
    let origin = store.details(cluster_a).unwrap();
    assert_eq!(origin.members.len(), 1);
    assert_eq!(origin.virtual_centroid, vec![0.0, 0.0]);

    assert_eq!(store.point_details(near_a).unwrap().cluster_id, report.new_cluster_id);
}

#[test]
fn test_split_outliers_respects_cap() {
    let mut store = ClusterStore::new();
    store.seed(vec![array![0.0, 0.0], array![20.0, 0.0]]).unwrap();

    // A tight group around the first seed anchors its centroid at (3, 0)
    // and keeps the designated member inside the group.
    for tight in [
        array![0.4, 0.0],
        array![-0.4, 0.0],
        array![0.0, 0.4],
        array![0.0, -0.4],
    ] {
        store.insert(tight).unwrap();
    }

    // Three stragglers between the clusters, all beyond the threshold:
    // own distances 5.0, 5.52, and 4.53, scores 0.417, 0.480, and 0.362.
    let (a, _) = store.insert(array![8.0, 0.0]).unwrap();
    let (b, _) = store.insert(array![8.5, 0.5]).unwrap();
    let (c, _) = store.insert(array![7.5, -0.5]).unwrap();

    // Only the top two by score fit under the cap: b, then a; c stays.
    let report = store.split_outliers(4.0, 2).unwrap().expect("candidates");
    assert_eq!(report.moved, vec![b, a]);
    for moved in &report.moved {
        assert_eq!(store.point_details(*moved).unwrap().cluster_id, report.new_cluster_id);
    }
    assert_ne!(store.point_details(c).unwrap().cluster_id, report.new_cluster_id);

    assert_centroids_are_exact_means(&store);
}

#[test]
fn test_split_outliers_never_moves_designated_centroid() {
    let mut store = ClusterStore::new();
    let seeds = store.seed(vec![array![0.0], array![10.0]]).unwrap();

    // Single-member clusters: every member is its cluster's designated
    // centroid, so nothing qualifies no matter the threshold.
    let report = store.split_outliers(0.0, 10).unwrap();
    assert!(report.is_none());
    assert_eq!(store.cluster_count(), 2);
    assert_eq!(store.point_details(seeds[0].0).unwrap().cluster_id, seeds[0].1);
}

// ============================================================================
// Stabilization
// ============================================================================

#[test]
fn test_reassign_all_is_idempotent() {
    let mut store = ClusterStore::new();
    store.seed(vec![array![0.0, 0.0], array![10.0, 10.0]]).unwrap();
    for point in generate_blobs(&[array![0.0, 0.0], array![10.0, 10.0]], 25, 7) {
        store.insert(point).unwrap();
    }

    store.reassign_all();
    assert_eq!(store.reassign_all(), 0);
    assert_centroids_are_exact_means(&store);
}

#[test]
fn test_reassign_moves_misplaced_points_home() {
    let mut store = ClusterStore::new();
    let seeds = store.seed(vec![array![0.0, 0.0], array![10.0, 10.0]]).unwrap();

    let (point_id, _) = store.insert(array![1.0, 1.0]).unwrap();
    // Updating features does not change membership by itself.
    assert!(store.update(point_id, array![9.5, 9.5]).unwrap());
    assert_eq!(store.point_details(point_id).unwrap().cluster_id, seeds[0].1);

    let moves = store.reassign_all();
    assert!(moves >= 1);
    assert_eq!(store.point_details(point_id).unwrap().cluster_id, seeds[1].1);
}

#[test]
fn test_blobs_settle_on_their_centers() {
    let centers = [array![0.0, 0.0], array![20.0, 0.0], array![0.0, 20.0]];
    let mut store = ClusterStore::new();
    let seeds = store.seed(centers.to_vec()).unwrap();

    for point in generate_blobs(&centers, 40, 42) {
        store.insert(point).unwrap();
    }
    store.reassign_all();

    for (i, center) in centers.iter().enumerate() {
        let details = store.details(seeds[i].1).unwrap();
        assert_eq!(details.members.len(), 41, "seed plus its own blob");
        for (expected, actual) in center.iter().zip(&details.virtual_centroid) {
            assert!((expected - actual).abs() < 0.5, "centroid near blob center");
        }
    }
    assert_centroids_are_exact_means(&store);
}

// ============================================================================
// Empty-cluster policy
// ============================================================================

#[test]
fn test_emptied_cluster_is_retained_by_default() {
    let mut store = ClusterStore::new();
    let seeds = store.seed(vec![array![0.0], array![10.0]]).unwrap();

    assert!(store.remove(seeds[0].0));
    assert_eq!(store.cluster_count(), 2);

    // A degenerate cluster never attracts points and survives
    // stabilization.
    store.insert(array![1.0]).unwrap();
    store.reassign_all();
    assert_eq!(store.cluster_count(), 2);

    let empty = store.details(seeds[0].1).unwrap();
    assert!(empty.members.is_empty());
    assert!(empty.virtual_centroid.is_empty());
}

#[test]
fn test_emptied_cluster_is_pruned_when_configured() {
    let mut store = ClusterStore::with_config(StoreConfig::new().with_prune_empty(true));
    let seeds = store.seed(vec![array![0.0], array![10.0]]).unwrap();

    assert!(store.remove(seeds[0].0));
    assert_eq!(store.cluster_count(), 1);
    assert!(store.details(seeds[0].1).is_none());
}

// ============================================================================
// Categorical attributes
// ============================================================================

#[test]
fn test_codes_are_stable_across_repeat_values() {
    let mut store = ClusterStore::new();
    store
        .seed_records(vec![
            Record::new(array![5.1, 3.5]).with_attribute("species", "setosa"),
            Record::new(array![7.0, 3.2]).with_attribute("species", "versicolor"),
        ])
        .unwrap();

    store
        .insert_record(Record::new(array![5.0, 3.4]).with_attribute("species", "setosa"))
        .unwrap();

    // setosa, versicolor, setosa again: codes 0, 1, 0.
    assert_eq!(store.encoder().code("species", "setosa"), Some(0));
    assert_eq!(store.encoder().code("species", "versicolor"), Some(1));
    assert_eq!(store.encoder().cardinality("species"), 2);
}

#[test]
fn test_shared_attribute_pulls_points_together() {
    let mut store = ClusterStore::new();
    let seeds = store
        .seed_records(vec![
            Record::new(array![0.0, 0.0]).with_attribute("species", "setosa"),
            Record::new(array![0.0, 0.0]).with_attribute("species", "versicolor"),
        ])
        .unwrap();

    // Equal coordinates: only the encoded species dimension separates the
    // clusters, so the record lands with its own species.
    let (_, cluster_id) = store
        .insert_record(Record::new(array![0.0, 0.0]).with_attribute("species", "versicolor"))
        .unwrap();
    assert_eq!(cluster_id, seeds[1].1);
}

// ============================================================================
// Mixed workload invariants
// ============================================================================

#[test]
fn test_centroids_exact_after_mixed_workload() {
    let mut store = ClusterStore::new();
    store.seed(vec![array![0.0, 0.0], array![15.0, 15.0]]).unwrap();

    let mut inserted = Vec::new();
    for point in generate_blobs(&[array![0.0, 0.0], array![15.0, 15.0]], 30, 99) {
        inserted.push(store.insert(point).unwrap().0);
    }

    for point_id in inserted.iter().step_by(5) {
        assert!(store.remove(*point_id));
    }
    for point_id in inserted.iter().skip(1).step_by(7) {
        if store.point_details(*point_id).is_some() {
            assert!(store.update(*point_id, array![3.0, 3.0]).unwrap());
        }
    }
    store.reassign_all();

    assert_centroids_are_exact_means(&store);
    let total: usize = store.all_details().iter().map(|d| d.members.len()).sum();
    assert_eq!(total, store.point_count());
}
