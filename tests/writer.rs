//! Integration tests for the serialized repertoire writer.

#![cfg(feature = "async")]

use repertoire_graph::provider::{InMemoryProvider, TAG_SOURCE};
use repertoire_graph::{
    Candidate, EngineConfig, LineRequest, ObservedMove, ProviderError, Repertoire,
    RepertoireWriter, Side,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn path(moves: &[&str]) -> Vec<String> {
    moves.iter().map(|m| m.to_string()).collect()
}

fn candidate(notation: &str, score_cp: i32) -> Candidate {
    Candidate {
        notation: notation.to_string(),
        score_cp: Some(score_cp),
        depth: 18,
    }
}

fn observed(notation: &str, share: f64, games: u64) -> ObservedMove {
    ObservedMove {
        notation: notation.to_string(),
        share,
        games,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CONCURRENCY TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_share_nodes() {
    let writer = RepertoireWriter::spawn(Repertoire::new(Side::White), 8);

    let mut tasks = Vec::new();
    for reply in ["Nc6", "Nf6", "d6", "f5"] {
        let handle = writer.handle();
        tasks.push(tokio::spawn(async move {
            handle
                .ingest(LineRequest::new(["e4", "e5", "Nf3", reply]))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let rep = writer.finish().await.unwrap();
    assert_eq!(rep.lines_ingested(), 4);
    // Root plus e4, e5, Nf3 and one node per reply.
    assert_eq!(rep.num_nodes(), 8);
    let after_nf3 = rep.node_after(&["e4", "e5", "Nf3"]).unwrap();
    assert_eq!(after_nf3.visits(), 4);
    assert_eq!(after_nf3.num_children(), 4);
}

#[tokio::test]
async fn test_rejected_line_reported_to_producer() {
    let writer = RepertoireWriter::spawn(Repertoire::new(Side::White), 1);
    let handle = writer.handle();

    let err = handle
        .ingest(LineRequest::from_movetext("1. e4 e5 2. Ke3"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Graph(_)));

    let nodes = handle.read(|rep| rep.num_nodes()).await.unwrap();
    assert_eq!(nodes, 1);

    drop(handle);
    assert!(writer.finish().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reads_from_cloned_handle() {
    let writer = RepertoireWriter::spawn(Repertoire::new(Side::Black), 1);
    let handle = writer.handle();
    handle.ingest(LineRequest::new(["d4"])).await.unwrap();

    let read_task = tokio::spawn({
        let handle = handle.clone();
        async move { handle.read(|rep| rep.lines_ingested()).await }
    });
    assert_eq!(read_task.await.unwrap().unwrap(), 1);

    drop(handle);
    let rep = writer.finish().await.unwrap();
    assert_eq!(rep.side(), Side::Black);
}

// ─────────────────────────────────────────────────────────────────────────────
// PROVIDER TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_extend_from_analysis_respects_limit() {
    let mut rep = Repertoire::new(Side::White);
    rep.ingest(&["e4", "c5"]).unwrap();
    let sicilian = rep.node_after(&["e4", "c5"]).unwrap().position().clone();

    let mut provider = InMemoryProvider::new();
    provider.add_candidates(
        sicilian,
        vec![candidate("Nf3", 35), candidate("Nc3", 20), candidate("c3", 15)],
    );
    let config = EngineConfig {
        cache_capacity: 16,
        ..EngineConfig::default()
    };
    let provider = config.analysis_cache(provider);
    assert_eq!(provider.cache_stats().cap, 16);

    let writer = RepertoireWriter::spawn(rep, 4);
    let handle = writer.handle();
    let outcomes = handle
        .extend_from_analysis(&provider, &path(&["e4", "c5"]), 2)
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);

    // Second call is answered from the cache and only bumps counters.
    handle
        .extend_from_analysis(&provider, &path(&["e4", "c5"]), 2)
        .await
        .unwrap();
    assert_eq!(provider.cache_stats().hits, 1);
    assert_eq!(provider.inner().evaluations(), 1);

    drop(handle);
    let rep = writer.finish().await.unwrap();
    let node = rep.node_after(&["e4", "c5"]).unwrap();
    let moves: Vec<(&str, u64)> = node.children().map(|e| (e.notation.as_str(), e.count)).collect();
    assert_eq!(moves, vec![("Nc3", 2), ("Nf3", 2)]);
    let leaf = rep.node_after(&["e4", "c5", "Nf3"]).unwrap();
    assert_eq!(leaf.metadata().get(TAG_SOURCE), Some("analysis"));
}

#[tokio::test]
async fn test_extend_from_statistics_records_games() {
    let rep = Repertoire::new(Side::Black);
    let start = rep.root_node().position().clone();

    let mut provider = InMemoryProvider::new();
    provider.add_observed(
        start,
        vec![
            observed("e4", 0.45, 4500),
            observed("d4", 0.35, 3500),
            observed("Nf3", 0.10, 1000),
            observed("c4", 0.10, 1000),
        ],
    );

    let writer = RepertoireWriter::spawn(rep, 4);
    let handle = writer.handle();
    let outcomes = handle
        .extend_from_statistics(&provider, &[], 0.75)
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);

    drop(handle);
    let rep = writer.finish().await.unwrap();
    let replies: Vec<&str> = rep.root_node().children().map(|e| e.notation.as_str()).collect();
    assert_eq!(replies, vec!["d4", "e4"]);
    let e4 = rep.node_after(&["e4"]).unwrap();
    assert_eq!(e4.metadata().games_reached(), Some(4500));
    assert_eq!(e4.metadata().get(TAG_SOURCE), Some("statistics"));
}

#[tokio::test]
async fn test_extend_unknown_path() {
    let writer = RepertoireWriter::spawn(Repertoire::new(Side::White), 1);
    let handle = writer.handle();
    let provider = InMemoryProvider::new();

    let err = handle
        .extend_from_analysis(&provider, &path(&["e4"]), 3)
        .await
        .unwrap_err();
    assert_eq!(err, ProviderError::UnknownPath("e4".to_string()));

    // Known path, but the provider has nothing for it.
    let err = handle
        .extend_from_analysis(&provider, &[], 3)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)));
}
