// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end scenarios: build, query, save, and reload caches over
//! small graphs with known structure.

use synsim_core::{decode, encode, SimilarityCache, TriangleBuilder, SIMILARITIES_FILE};

/// Opaque synset handle the way a graph collaborator would supply it:
/// the cache only ever uses the position in the ordered list, but the
/// similarity function sees the whole handle.
#[derive(Debug, Clone)]
struct Synset {
    id: usize,
    #[allow(dead_code)]
    lemma: String,
}

fn synsets(n: usize) -> Vec<Synset> {
    (0..n)
        .map(|id| Synset {
            id,
            lemma: format!("synset-{id}"),
        })
        .collect()
}

fn pair_sim<'a>(
    pairs: &'a [(usize, usize, f32)],
) -> impl Fn(&Synset, &Synset) -> f32 + Sync + 'a {
    move |a: &Synset, b: &Synset| {
        if a.id == b.id {
            return 1.0;
        }
        let key = (a.id.min(b.id), a.id.max(b.id));
        pairs
            .iter()
            .find(|&&(lo, hi, _)| (lo, hi) == key)
            .map_or(-1.0, |&(_, _, s)| s)
    }
}

#[test]
fn empty_graph() {
    let cache = SimilarityCache::build(&synsets(0), |_, _| 1.0).unwrap();
    assert!(cache.is_empty());
    assert_eq!(cache.size_bytes(), 0);
    assert_eq!(cache.query(0, 0), -1.0);

    let dir = tempfile::tempdir().unwrap();
    cache.save_in(dir.path()).unwrap();
    let reloaded = SimilarityCache::load_in(dir.path()).unwrap();
    assert!(reloaded.is_empty());
    assert_eq!(reloaded.query(0, 0), -1.0);
}

#[test]
fn singleton_graph() {
    let cache = SimilarityCache::build(&synsets(1), |_, _| 1.0).unwrap();
    assert!(!cache.is_empty());
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.size_bytes(), 0);
    assert_eq!(cache.query(0, 0), 1.0);
    assert_eq!(cache.query(0, 1), -1.0);

    let row = cache.rows()[0];
    assert_eq!((row.from, row.to), (0, 0));
}

#[test]
fn constant_similarity() {
    let cache = SimilarityCache::build(&synsets(4), |a, b| {
        if a.id == b.id {
            1.0
        } else {
            0.5
        }
    })
    .unwrap();

    let code = encode(0.5);
    for (r, row) in cache.rows().iter().take(3).enumerate() {
        assert_eq!(row.from, r + 1);
        assert_eq!(row.to, 4);
    }
    assert!(cache.rows()[3].is_empty());
    assert!(cache.values().iter().all(|&v| v == code));

    // Exact equality with the decoded code, not with 0.5 itself:
    // quantization is lossy by design.
    assert_eq!(cache.query(1, 3), decode(code));
    assert_eq!(cache.count(code), 6);
}

#[test]
fn all_undefined_off_diagonal() {
    let cache = SimilarityCache::build(&synsets(3), |a, b| {
        if a.id == b.id {
            1.0
        } else {
            -1.0
        }
    })
    .unwrap();

    assert!(cache.rows().iter().all(|row| row.is_empty()));
    assert_eq!(cache.size_bytes(), 0);
    for a in 0..3 {
        for b in 0..3 {
            let expected = if a == b { 1.0 } else { -1.0 };
            assert_eq!(cache.query(a, b), expected, "({a},{b})");
        }
    }
}

#[test]
fn sparse_band() {
    let pairs = [
        (0, 1, 0.5f32),
        (0, 2, 0.25),
        (2, 3, 0.2),
        (2, 4, 0.125),
    ];
    let cache = SimilarityCache::build(&synsets(5), pair_sim(&pairs)).unwrap();

    let rows = cache.rows();
    assert_eq!((rows[0].from, rows[0].to), (1, 3));
    assert!(rows[1].is_empty());
    assert_eq!((rows[2].from, rows[2].to), (3, 5));
    assert!(rows[3].is_empty());
    assert!(rows[4].is_empty());

    assert_eq!(cache.query(0, 3), -1.0);
    assert_eq!(cache.query(2, 4), decode(encode(0.125)));
    assert_eq!(cache.query(4, 2), cache.query(2, 4));
}

#[test]
fn persistence_roundtrip() {
    let cache = SimilarityCache::build(&synsets(4), |a, b| {
        if a.id == b.id {
            1.0
        } else {
            0.5
        }
    })
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(SIMILARITIES_FILE);
    cache.save(&path).unwrap();

    let reloaded = SimilarityCache::load(&path).unwrap();
    assert_eq!(reloaded.rows(), cache.rows());
    assert_eq!(reloaded.values(), cache.values());

    for a in 0..5 {
        for b in 0..5 {
            assert_eq!(reloaded.query(a, b), cache.query(a, b), "({a},{b})");
        }
    }
}

#[test]
fn saved_bytes_are_stable_across_a_rewrite() {
    // Two saves of the same cache must be byte-identical; the format
    // has no timestamps or other nondeterminism.
    let pairs = [(0, 1, 0.5f32), (1, 3, 0.1), (2, 3, 0.9)];
    let cache = SimilarityCache::build(&synsets(4), pair_sim(&pairs)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a");
    let second = dir.path().join("b");
    cache.save(&first).unwrap();
    cache.save(&second).unwrap();

    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}

#[test]
fn load_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(SIMILARITIES_FILE);
    std::fs::write(&path, b"not a similarity file").unwrap();
    assert!(SimilarityCache::load(&path).is_err());

    assert!(SimilarityCache::load(dir.path().join("missing")).is_err());
}

#[test]
fn progress_observes_the_whole_build() {
    let n = 300;
    let mut snapshots = Vec::new();
    let builder = TriangleBuilder::new()
        .rows_per_block(32)
        .on_progress(|p| snapshots.push(p));

    let cache = SimilarityCache::build_with(&builder, &synsets(n), |a, b| {
        if a.id == b.id {
            1.0
        } else {
            0.5
        }
    })
    .unwrap();
    drop(builder);

    assert_eq!(cache.len(), n);
    assert!(!snapshots.is_empty());
    // Cumulative counters arrive in order and end at the full totals.
    assert!(snapshots.windows(2).all(|w| w[0].rows_done < w[1].rows_done));
    let last = snapshots.last().unwrap();
    assert_eq!(last.rows_done, n);
    assert_eq!(last.total_rows, n);
    assert_eq!(last.pairs_done, (n * (n + 1) / 2) as u64);
}

#[test]
fn wordnet_like_path_similarity() {
    // A miniature two-tree taxonomy: ids 0..5 are one hierarchy,
    // 6..9 a second one with no cross links (a different part of
    // speech, say). Path similarity 1/(1+d) within a tree, undefined
    // across trees.
    let parent: [Option<usize>; 10] = [
        None,
        Some(0),
        Some(0),
        Some(1),
        Some(1),
        Some(2),
        None,
        Some(6),
        Some(6),
        Some(7),
    ];
    let tree = |mut v: usize| {
        while let Some(p) = parent[v] {
            v = p;
        }
        v
    };
    let depth = |mut v: usize| {
        let mut d = 0;
        while let Some(p) = parent[v] {
            v = p;
            d += 1;
        }
        d
    };
    let dist = |a: usize, b: usize| {
        // Walk both nodes up to their lowest common ancestor.
        let (mut x, mut y) = (a, b);
        while depth(x) > depth(y) {
            x = parent[x].unwrap();
        }
        while depth(y) > depth(x) {
            y = parent[y].unwrap();
        }
        while x != y {
            x = parent[x].unwrap();
            y = parent[y].unwrap();
        }
        depth(a) + depth(b) - 2 * depth(x)
    };
    let sim = |a: &Synset, b: &Synset| {
        if tree(a.id) != tree(b.id) {
            return -1.0;
        }
        1.0 / (1.0 + dist(a.id, b.id) as f32)
    };

    let cache = SimilarityCache::build(&synsets(10), sim).unwrap();

    // Within-tree pairs decode to the quantized path score.
    assert_eq!(cache.query(3, 4), decode(encode(1.0 / 3.0)));
    assert_eq!(cache.query(0, 5), decode(encode(1.0 / 3.0)));
    assert_eq!(cache.query(7, 8), decode(encode(1.0 / 3.0)));

    // Cross-tree pairs are undefined, and whole bands trim away:
    // row 5 has only cross-tree columns to its right.
    assert_eq!(cache.query(5, 6), -1.0);
    assert_eq!(cache.query(0, 9), -1.0);
    assert!(cache.rows()[5].is_empty());

    // Symmetry and the diagonal hold across the whole graph.
    for a in 0..10 {
        assert_eq!(cache.query(a, a), 1.0);
        for b in 0..10 {
            assert_eq!(cache.query(a, b), cache.query(b, a));
        }
    }
}
