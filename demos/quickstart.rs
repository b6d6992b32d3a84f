//! End-to-end walkthrough: seed a store, stream points in, peel off the
//! stragglers, and stabilize.
//!
//! Run with `RUST_LOG=debug cargo run --example quickstart` to watch the
//! store's internal events.

use ndarray::{array, Array1};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use streamclust::{ClusterStore, StoreConfig};

fn main() {
    env_logger::init();

    let mut store = ClusterStore::with_config(StoreConfig::new().with_max_reassign_rounds(10));

    // Two well-separated starting clusters.
    store
        .seed(vec![array![0.0, 0.0], array![12.0, 12.0]])
        .expect("seeding an empty store");

    // Stream in points around each center, plus a loose band in between.
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for center in [array![0.0, 0.0], array![12.0, 12.0], array![6.0, 6.0]] {
        for _ in 0..30 {
            let noise = Array1::random_using(2, Uniform::new(-1.5, 1.5), &mut rng);
            store.insert(&center + &noise).expect("arity matches the seeds");
        }
    }
    store.reassign_all();

    println!("After ingest:");
    print_summary(&store);

    // The in-between band sits far from both centroids; give it its own
    // cluster and re-stabilize.
    match store.split_outliers(5.0, 30).expect("store is seeded") {
        Some(report) => {
            println!(
                "\nSplit {} points into {}",
                report.moved.len(),
                report.new_cluster_id
            );
        }
        None => println!("\nNo point exceeded the split threshold"),
    }
    store.reassign_all();

    println!("\nAfter split:");
    print_summary(&store);
}

fn print_summary(store: &ClusterStore) {
    for details in store.all_details() {
        let centroid: Vec<String> = details
            .virtual_centroid
            .iter()
            .map(|v| format!("{v:6.2}"))
            .collect();
        println!(
            "  {}: {:3} members, centroid [{}]",
            details.id,
            details.members.len(),
            centroid.join(", ")
        );
    }
}
