//! # streamclust
//!
//! Online incremental clustering: a [`ClusterStore`] maintains a partition of
//! points into clusters, each with a derived centroid, under insertion,
//! removal, and feature updates of individual points.
//!
//! ## Features
//!
//! - **Nearest-centroid routing**: new points go to the cluster with the
//!   closest virtual centroid, ties broken by lowest cluster id
//! - **Exact centroid maintenance**: every mutating call leaves each
//!   centroid equal to the mean of its members, and re-designates the real
//!   member closest to it
//! - **Outlier splitting**: points far from their own centroid and
//!   comparatively close to another cluster's can be peeled off into a
//!   brand-new cluster
//! - **Bounded stabilization**: `reassign_all` reruns assignment rounds
//!   until no point moves, capped by configuration
//! - **Categorical attributes**: raw string attributes are encoded to
//!   stable integer codes shared across the whole store
//!
//! ## Example
//!
//! ```rust
//! use ndarray::array;
//! use streamclust::ClusterStore;
//!
//! let mut store = ClusterStore::new();
//! store.seed(vec![array![0.0, 0.0], array![10.0, 10.0]]).unwrap();
//!
//! let (point_id, cluster_id) = store.insert(array![0.5, 1.0]).unwrap();
//! assert_eq!(store.point_details(point_id).unwrap().cluster_id, cluster_id);
//!
//! // Stabilize after a batch of mutations.
//! let moves = store.reassign_all();
//! assert_eq!(store.reassign_all(), 0, "second pass moves nothing");
//! # let _ = moves;
//! ```
//!
//! ## Categorical attributes
//!
//! Records may carry categorical attributes; each becomes an extra encoded
//! dimension in every distance computation, so all records in a store must
//! carry the same attribute set.
//!
//! ```rust
//! use ndarray::array;
//! use streamclust::{ClusterStore, Record};
//!
//! let mut store = ClusterStore::new();
//! store
//!     .seed_records(vec![
//!         Record::new(array![5.1, 3.5]).with_attribute("species", "setosa"),
//!         Record::new(array![7.0, 3.2]).with_attribute("species", "versicolor"),
//!     ])
//!     .unwrap();
//!
//! let record = Record::new(array![5.0, 3.4]).with_attribute("species", "setosa");
//! store.insert_record(record).unwrap();
//!
//! assert_eq!(store.encoder().code("species", "versicolor"), Some(1));
//! ```
//!
//! ## Custom configuration
//!
//! ```rust
//! use streamclust::{ClusterStore, StoreConfig};
//!
//! let config = StoreConfig::new()
//!     .with_max_reassign_rounds(25)
//!     .with_prune_empty(true);
//!
//! let store = ClusterStore::with_config(config);
//! assert!(!store.is_initialized());
//! ```
//!
//! The store is single-threaded and synchronous; embed it behind one
//! exclusive lock if the host is concurrent. Enable the `serde` feature to
//! serialize the read projections ([`ClusterDetails`], [`PointDetails`]) for
//! persistence or display collaborators.

mod cluster;
mod config;
mod distance;
mod encoder;
mod error;
mod point;
mod store;

pub use cluster::{Cluster, ClusterId};
pub use config::StoreConfig;
pub use encoder::CategoricalEncoder;
pub use error::StoreError;
pub use point::{Point, PointId, Record};
pub use store::{ClusterDetails, ClusterStore, PointDetails, SplitReport};
