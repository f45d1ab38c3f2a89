//! Performance benchmarks for repertoire building and derivation.
//!
//! Run with: `cargo bench --bench ingest`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Ingest 1k lines | <50ms | Canonicalization dominates |
//! | Prune | Linear in nodes | One pass with a visited set |
//! | Split | Linear in edges | Each edge emitted once |

use criterion::{
    black_box, criterion_group, criterion_main,
    BenchmarkId, Criterion, Throughput,
};
use shakmaty::san::SanPlus;
use shakmaty::{Chess, Position as _};

use repertoire_graph::{
    frequencies, prune, split, LineErrorPolicy, LineRequest, Repertoire, Side,
};

/// Deterministic pseudo-random legal lines.
fn make_lines(count: usize, plies: usize) -> Vec<LineRequest> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    (0..count)
        .map(|_| {
            let mut board = Chess::default();
            let mut moves = Vec::with_capacity(plies);
            for _ in 0..plies {
                let legal = board.legal_moves();
                if legal.is_empty() {
                    break;
                }
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                // Bias towards the first few moves so lines share prefixes.
                let mv = legal[(state % 3) as usize % legal.len()].clone();
                moves.push(SanPlus::from_move(board.clone(), &mv).to_string());
                board.play_unchecked(&mv);
            }
            LineRequest::new(moves)
        })
        .collect()
}

fn build(lines: &[LineRequest]) -> Repertoire {
    let mut rep = Repertoire::new(Side::White);
    // Generated lines may repeat positions; skipping them is fine here.
    let _ = rep.ingest_batch(lines.iter().cloned(), LineErrorPolicy::Skip);
    rep
}

/// Benchmark batch ingestion.
fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");

    for count in [10, 100, 1000] {
        let lines = make_lines(count, 16);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("lines", count), &lines, |b, lines| {
            b.iter(|| build(black_box(lines)))
        });
    }

    group.finish();
}

/// Benchmark frequency tables and pruning.
fn bench_prune(c: &mut Criterion) {
    let mut group = c.benchmark_group("prune");

    for count in [100, 1000] {
        let rep = build(&make_lines(count, 16));
        group.throughput(Throughput::Elements(rep.num_nodes() as u64));
        group.bench_with_input(BenchmarkId::new("frequencies", count), &rep, |b, rep| {
            b.iter(|| frequencies(black_box(rep)))
        });
        group.bench_with_input(BenchmarkId::new("prune", count), &rep, |b, rep| {
            b.iter(|| prune(black_box(rep)))
        });
    }

    group.finish();
}

/// Benchmark chunk splitting at several ply caps.
fn bench_split(c: &mut Criterion) {
    let rep = build(&make_lines(1000, 16));
    let mut group = c.benchmark_group("split");
    group.throughput(Throughput::Elements(rep.num_edges() as u64));

    for max_plies in [2, 8, 1000] {
        group.bench_with_input(BenchmarkId::new("max_plies", max_plies), &rep, |b, rep| {
            b.iter(|| split(black_box(rep), max_plies).count())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ingest, bench_prune, bench_split);
criterion_main!(benches);
