// ringscan/src/workers/cluster.rs
//
// Similarity grouping shared by the answer, device and behavior detectors.
//
// Greedy (default):
//   Single forward pass in batch order. Each unclaimed eligible response seeds
//   a group and claims every later unclaimed response scoring ≥ threshold
//   against the SEED. Claimed responses never seed or join another group.
//   Non-transitive: a response close to member #2 but not to the seed is
//   missed, and a claimed response stays claimed even if the seed's group
//   never reaches min_size.
//
// Connected:
//   Every eligible pair is scored; pairs ≥ threshold become edges, and the
//   connected components (union-find) of size ≥ min_size are the groups.
//   Order-independent.
//
// Both modes are O(n²) similarity calls; callers cap n upstream.

use std::collections::HashMap;

use petgraph::unionfind::UnionFind;

use crate::config::ClusteringMode;

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Batch indices, ascending.
    pub members: Vec<usize>,
    /// Mean similarity over the scores that formed the group.
    pub similarity: f64,
}

pub fn group<E, S>(
    n:         usize,
    eligible:  E,
    sim:       S,
    threshold: f64,
    min_size:  usize,
    mode:      ClusteringMode,
) -> Vec<Cluster>
where
    E: Fn(usize) -> bool,
    S: Fn(usize, usize) -> f64,
{
    match mode {
        ClusteringMode::Greedy    => greedy(n, eligible, sim, threshold, min_size),
        ClusteringMode::Connected => connected(n, eligible, sim, threshold, min_size),
    }
}

fn greedy<E, S>(n: usize, eligible: E, sim: S, threshold: f64, min_size: usize) -> Vec<Cluster>
where
    E: Fn(usize) -> bool,
    S: Fn(usize, usize) -> f64,
{
    let mut claimed = vec![false; n];
    let mut out     = Vec::new();

    for i in 0..n {
        if claimed[i] || !eligible(i) { continue; }

        let mut members = vec![i];
        let mut scores  = Vec::new();

        for j in (i + 1)..n {
            if claimed[j] || !eligible(j) { continue; }
            let s = sim(i, j);
            if s >= threshold {
                members.push(j);
                scores.push(s);
                claimed[j] = true;
            }
        }

        if members.len() >= min_size {
            claimed[i] = true;
            out.push(Cluster { members, similarity: mean(&scores) });
        }
    }
    out
}

fn connected<E, S>(n: usize, eligible: E, sim: S, threshold: f64, min_size: usize) -> Vec<Cluster>
where
    E: Fn(usize) -> bool,
    S: Fn(usize, usize) -> f64,
{
    let idx: Vec<usize> = (0..n).filter(|&i| eligible(i)).collect();
    let mut uf    = UnionFind::<usize>::new(n);
    let mut edges = Vec::new();

    for (a, &i) in idx.iter().enumerate() {
        for &j in &idx[a + 1..] {
            let s = sim(i, j);
            if s >= threshold {
                uf.union(i, j);
                edges.push((i, s));
            }
        }
    }

    // Components in order of their smallest member.
    let mut slot: HashMap<usize, usize> = HashMap::new();
    let mut comps: Vec<(Vec<usize>, Vec<f64>)> = Vec::new();
    for &i in &idx {
        let root = uf.find(i);
        let k = *slot.entry(root).or_insert_with(|| {
            comps.push((Vec::new(), Vec::new()));
            comps.len() - 1
        });
        comps[k].0.push(i);
    }
    for (i, s) in edges {
        if let Some(&k) = slot.get(&uf.find(i)) {
            comps[k].1.push(s);
        }
    }

    comps.into_iter()
        .filter(|(members, _)| members.len() >= min_size)
        .map(|(members, scores)| Cluster { members, similarity: mean(&scores) })
        .collect()
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() { 0.0 } else { xs.iter().sum::<f64>() / xs.len() as f64 }
}
