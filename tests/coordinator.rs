//! Coordinator behaviour over in-memory nodes

mod common;

use bytes::Bytes;
use common::{Cluster, FakeNode};
use minifs::coordinator::{ReadOutcome, UploadFailure, UploadOutcome};
use minifs::node::NodeId;
use std::sync::atomic::Ordering;

fn stored_on(outcome: &UploadOutcome) -> Vec<NodeId> {
    match outcome {
        UploadOutcome::Stored(report) => report.accepted.clone(),
        UploadOutcome::Failed(failure) => panic!("upload failed: {:?}", failure),
    }
}

#[tokio::test]
async fn test_list_merges_and_deduplicates() {
    let cluster = Cluster::new(vec![
        FakeNode::with_files(&["b.txt", "shared.txt"]),
        FakeNode::with_files(&["a.txt", "shared.txt"]),
        FakeNode::with_files(&["shared.txt"]),
    ]);

    let listing = cluster.coordinator.list().await;
    assert_eq!(listing, vec!["a.txt", "b.txt", "shared.txt"]);
}

#[tokio::test]
async fn test_list_after_replicated_upload_reports_name_once() {
    let cluster = Cluster::empty(3);
    cluster.node(2).set_down(true);

    let outcome = cluster
        .coordinator
        .upload("f", Bytes::from_static(b"data"), true)
        .await;
    assert_eq!(stored_on(&outcome), vec![NodeId(1), NodeId(3)]);

    cluster.node(2).set_down(false);
    assert_eq!(cluster.coordinator.list().await, vec!["f"]);
}

#[tokio::test]
async fn test_list_is_idempotent() {
    let cluster = Cluster::new(vec![
        FakeNode::with_files(&["x", "y"]),
        FakeNode::with_files(&["z"]),
    ]);

    let first = cluster.coordinator.list().await;
    let second = cluster.coordinator.list().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_list_with_every_node_down_is_empty() {
    let cluster = Cluster::new(vec![FakeNode::with_files(&["x"]), FakeNode::default()]);
    for node in &cluster.nodes {
        node.set_down(true);
    }

    assert!(cluster.coordinator.list().await.is_empty());
}

#[tokio::test]
async fn test_download_finds_copy_from_any_start() {
    // Node 1 holds f, node 2 is down, node 3 lacks it
    for start in 0..3 {
        let cluster = Cluster::starting_at(
            vec![
                FakeNode::with_files(&["f"]),
                FakeNode::with_files(&["f"]),
                FakeNode::default(),
            ],
            start,
        );
        cluster.node(2).set_down(true);

        match cluster.coordinator.download("f").await {
            ReadOutcome::Found(data) => assert_eq!(&data[..], b"contents of f"),
            other => panic!("start {}: expected data, got {:?}", start, other),
        }
        assert!(!cluster.is_connected(2));
    }
}

#[tokio::test]
async fn test_download_skips_nodes_failing_mid_call() {
    // All three connect, then nodes 1 and 2 fail their calls; only node 3 has f
    for start in 0..3 {
        let cluster = Cluster::starting_at(
            vec![
                FakeNode::default(),
                FakeNode::default(),
                FakeNode::with_files(&["f"]),
            ],
            start,
        );
        cluster.coordinator.list().await;
        assert!((1..=3).all(|id| cluster.is_connected(id)));

        cluster.node(1).set_down(true);
        cluster.node(2).set_down(true);

        match cluster.coordinator.download("f").await {
            ReadOutcome::Found(data) => assert_eq!(&data[..], b"contents of f"),
            other => panic!("start {}: expected data, got {:?}", start, other),
        }

        // Ring order from `start` up to node 3 (slot 2)
        for slot in 0..2 {
            let id = slot as u32 + 1;
            let visited = slot >= start;
            assert_eq!(cluster.is_connected(id), !visited, "start {} node {}", start, id);
            let expected_calls = if visited { 2 } else { 1 };
            assert_eq!(cluster.node(id).calls.load(Ordering::SeqCst), expected_calls);
        }
        assert!(cluster.is_connected(3));
        assert_eq!(cluster.node(3).calls.load(Ordering::SeqCst), 2);
    }
}

#[tokio::test]
async fn test_fixed_start_reads_first_from_chosen_node() {
    for start in 0..4 {
        let cluster = Cluster::starting_at(
            (0..4).map(|_| FakeNode::with_files(&["f"])).collect(),
            start,
        );
        assert!(matches!(
            cluster.coordinator.download("f").await,
            ReadOutcome::Found(_)
        ));
        for slot in 0..4 {
            let expected = usize::from(slot == start);
            assert_eq!(cluster.nodes[slot].calls.load(Ordering::SeqCst), expected);
        }
    }
}

#[tokio::test]
async fn test_download_visits_each_node_at_most_once() {
    let cluster = Cluster::empty(4);

    assert!(matches!(
        cluster.coordinator.download("missing").await,
        ReadOutcome::Absent
    ));
    for node in &cluster.nodes {
        assert_eq!(node.calls.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_download_distinguishes_absent_from_unreachable() {
    let cluster = Cluster::new(vec![FakeNode::default(), FakeNode::default()]);
    assert!(matches!(
        cluster.coordinator.download("f").await,
        ReadOutcome::Absent
    ));

    for node in &cluster.nodes {
        node.set_down(true);
    }
    assert!(matches!(
        cluster.coordinator.download("f").await,
        ReadOutcome::NoNodesReachable
    ));
}

#[tokio::test]
async fn test_download_from_empty_pool() {
    let cluster = Cluster::empty(0);
    assert!(matches!(
        cluster.coordinator.download("f").await,
        ReadOutcome::NoNodesReachable
    ));
}

#[tokio::test]
async fn test_least_loaded_picks_emptiest_node() {
    let cluster = Cluster::new(vec![
        FakeNode::with_files(&["a1", "a2"]),
        FakeNode::with_files(&["b1", "b2", "b3", "b4", "b5"]),
        FakeNode::default(),
    ]);

    let outcome = cluster
        .coordinator
        .upload("new", Bytes::from_static(b"payload"), false)
        .await;

    assert_eq!(stored_on(&outcome), vec![NodeId(3)]);
    assert!(cluster.node(3).has("new"));
    assert_eq!(cluster.node(1).file_count(), 2);
    assert_eq!(cluster.node(2).file_count(), 5);
}

#[tokio::test]
async fn test_least_loaded_tie_goes_to_lowest_id() {
    let cluster = Cluster::new(vec![
        FakeNode::with_files(&["a", "b"]),
        FakeNode::with_files(&["c"]),
        FakeNode::with_files(&["d"]),
    ]);

    let outcome = cluster
        .coordinator
        .upload("e", Bytes::from_static(b"e"), false)
        .await;
    assert_eq!(stored_on(&outcome), vec![NodeId(2)]);
}

#[tokio::test]
async fn test_least_loaded_skips_unreachable_nodes() {
    let cluster = Cluster::new(vec![
        FakeNode::default(),
        FakeNode::with_files(&["x"]),
        FakeNode::with_files(&["y", "z"]),
    ]);
    cluster.node(1).set_down(true);

    let outcome = cluster
        .coordinator
        .upload("f", Bytes::from_static(b"f"), false)
        .await;
    assert_eq!(stored_on(&outcome), vec![NodeId(2)]);
}

#[tokio::test]
async fn test_least_loaded_does_not_retry_elsewhere() {
    let cluster = Cluster::new(vec![
        FakeNode::with_files(&["a"]),
        FakeNode::default(),
        FakeNode::with_files(&["b"]),
    ]);
    cluster.node(2).drop_uploads();

    let outcome = cluster
        .coordinator
        .upload("f", Bytes::from_static(b"f"), false)
        .await;

    assert!(matches!(
        outcome,
        UploadOutcome::Failed(UploadFailure::NodeFailed { node, .. }) if node == NodeId(2)
    ));
    assert!(!cluster.is_connected(2));
    assert!(cluster.nodes.iter().all(|node| !node.has("f")));
}

#[tokio::test]
async fn test_least_loaded_rejection_is_reported() {
    let cluster = Cluster::empty(1);
    cluster.node(1).refuse_uploads();

    let outcome = cluster
        .coordinator
        .upload("f", Bytes::from_static(b"f"), false)
        .await;

    assert!(matches!(
        outcome,
        UploadOutcome::Failed(UploadFailure::Rejected { node, .. }) if node == NodeId(1)
    ));
    // A refusal is an answer, so the node stays connected
    assert!(cluster.is_connected(1));
}

#[tokio::test]
async fn test_replicate_all_with_every_node_down_fails() {
    let cluster = Cluster::empty(3);
    for node in &cluster.nodes {
        node.set_down(true);
    }

    let outcome = cluster
        .coordinator
        .upload("f", Bytes::from_static(b"f"), true)
        .await;
    assert!(matches!(
        outcome,
        UploadOutcome::Failed(UploadFailure::NoNodesReachable { .. })
    ));
    assert!(!outcome.is_stored());
    assert!(cluster.coordinator.list().await.is_empty());

    for node in &cluster.nodes {
        node.set_down(false);
    }
    assert!(cluster.coordinator.list().await.is_empty());
}

#[tokio::test]
async fn test_replicate_all_counts_partial_acceptance() {
    let cluster = Cluster::empty(3);
    cluster.node(1).refuse_uploads();
    cluster.node(3).drop_uploads();

    let outcome = cluster
        .coordinator
        .upload("f", Bytes::from_static(b"f"), true)
        .await;

    match &outcome {
        UploadOutcome::Stored(report) => {
            assert_eq!(report.accepted, vec![NodeId(2)]);
            assert_eq!(report.attempted, 3);
            assert_eq!(report.bytes, 1);
        }
        UploadOutcome::Failed(failure) => panic!("upload failed: {:?}", failure),
    }
    assert!(cluster.is_connected(1));
    assert!(!cluster.is_connected(3));
}

#[tokio::test]
async fn test_replicate_all_with_every_node_refusing() {
    let cluster = Cluster::empty(2);
    for node in &cluster.nodes {
        node.refuse_uploads();
    }

    let outcome = cluster
        .coordinator
        .upload("f", Bytes::from_static(b"f"), true)
        .await;
    assert!(matches!(
        outcome,
        UploadOutcome::Failed(UploadFailure::NoneAccepted { attempted: 2, .. })
    ));
}

#[tokio::test]
async fn test_delete_after_full_replication_removes_everywhere() {
    let cluster = Cluster::empty(3);
    let outcome = cluster
        .coordinator
        .upload("f", Bytes::from_static(b"data"), true)
        .await;
    assert_eq!(stored_on(&outcome).len(), 3);

    let report = cluster.coordinator.delete("f").await;
    assert_eq!(report.deleted, vec![NodeId(1), NodeId(2), NodeId(3)]);
    assert!(report.unreachable.is_empty());

    assert!(!cluster.coordinator.list().await.contains(&"f".to_string()));
    assert!(cluster.nodes.iter().all(|node| !node.has("f")));
}

#[tokio::test]
async fn test_delete_is_best_effort() {
    let cluster = Cluster::new(vec![
        FakeNode::with_files(&["f"]),
        FakeNode::with_files(&["f"]),
        FakeNode::default(),
    ]);
    cluster.node(2).set_down(true);

    let report = cluster.coordinator.delete("f").await;
    assert_eq!(report.deleted, vec![NodeId(1)]);
    assert_eq!(report.not_found, vec![NodeId(3)]);
    assert_eq!(report.unreachable, vec![NodeId(2)]);
    assert_eq!(report.responded(), 2);

    // The unreachable copy survives and shows up once the node returns
    cluster.node(2).set_down(false);
    assert_eq!(cluster.coordinator.list().await, vec!["f"]);
}

#[tokio::test]
async fn test_file_exists() {
    let cluster = Cluster::new(vec![
        FakeNode::default(),
        FakeNode::with_files(&["f"]),
        FakeNode::default(),
    ]);

    assert!(cluster.coordinator.file_exists("f").await);
    assert!(!cluster.coordinator.file_exists("g").await);

    cluster.node(2).set_down(true);
    assert!(!cluster.coordinator.file_exists("f").await);
}

#[tokio::test]
async fn test_file_exists_stops_at_first_holder() {
    let cluster = Cluster::new(vec![
        FakeNode::with_files(&["f"]),
        FakeNode::with_files(&["f"]),
    ]);

    assert!(cluster.coordinator.file_exists("f").await);
    assert_eq!(cluster.node(2).calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_node_is_retried_on_next_operation() {
    let cluster = Cluster::new(vec![
        FakeNode::with_files(&["one"]),
        FakeNode::with_files(&["two"]),
    ]);

    cluster.coordinator.list().await;
    assert!(cluster.is_connected(1));
    assert_eq!(cluster.node(1).lookups.load(Ordering::SeqCst), 1);

    // Connected node fails mid-operation: dropped, the rest still answer
    cluster.node(1).set_down(true);
    assert_eq!(cluster.coordinator.list().await, vec!["two"]);
    assert!(!cluster.is_connected(1));
    assert_eq!(cluster.node(1).lookups.load(Ordering::SeqCst), 1);

    // Down at lookup: stays disconnected
    cluster.coordinator.list().await;
    assert_eq!(cluster.node(1).lookups.load(Ordering::SeqCst), 2);
    assert!(!cluster.is_connected(1));

    cluster.node(1).set_down(false);
    assert_eq!(cluster.coordinator.list().await, vec!["one", "two"]);
    assert!(cluster.is_connected(1));
    assert_eq!(cluster.node(1).lookups.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_connected_nodes_are_not_looked_up_again() {
    let cluster = Cluster::empty(3);

    for _ in 0..3 {
        cluster.coordinator.list().await;
    }
    for node in &cluster.nodes {
        assert_eq!(node.lookups.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_status_reflects_connections() {
    let cluster = Cluster::empty(2);
    cluster.node(2).set_down(true);
    cluster.coordinator.list().await;

    let status = cluster.coordinator.pool().status();
    assert_eq!(status.len(), 2);
    assert!(status[0].connected);
    assert!(!status[1].connected);
}
