use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::AlignerConfig;
use crate::error::{DendriteError, DendriteResult};
use crate::geometry::{distance, Vec3};
use crate::model::{BranchIdx, PointIdx, Tree};

/// Matched point IDs, keyed by the ID in tree B and valued by the ID in tree A.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentResult {
    pub remap: BTreeMap<String, String>,
}

impl AlignmentResult {
    /// Only the pairs whose IDs actually differ.
    pub fn changes(&self) -> BTreeMap<String, String> {
        self.remap
            .iter()
            .filter(|(b, a)| b != a)
            .map(|(b, a)| (b.clone(), a.clone()))
            .collect()
    }

    pub fn is_identity(&self) -> bool {
        self.remap.iter().all(|(b, a)| b == a)
    }
}

/// Remaps point IDs of tree B so biologically coincident points agree with tree A.
///
/// Branches are visited in A's pre-order. A branch whose ID also exists in B
/// is paired with it; any other branch is paired with the B branch leaving
/// the B point already matched to its parent point, at the same rank among
/// that point's children.
pub struct IdentityAligner<'a> {
    a: &'a Tree,
    b: &'a Tree,
    config: AlignerConfig,
    id_pairs: HashMap<BranchIdx, BranchIdx>,
}

impl<'a> IdentityAligner<'a> {
    pub fn new(a: &'a Tree, b: &'a Tree, config: AlignerConfig) -> Self {
        let id_pairs = a
            .branches()
            .filter_map(|(x, branch)| b.branch_by_id(&branch.id).map(|y| (x, y)))
            .collect();
        IdentityAligner {
            a,
            b,
            config,
            id_pairs,
        }
    }

    /// Upper bound on the DP states, and so on the progress callbacks of
    /// `perform_alignment`. Exact when every A branch is reachable from the
    /// root and has a same-ID partner.
    pub fn max_call_count(&self) -> usize {
        let reserved: HashSet<BranchIdx> = self.id_pairs.values().copied().collect();
        let longest_free = self
            .b
            .branches()
            .filter(|(y, _)| !reserved.contains(y))
            .map(|(_, branch)| branch.len())
            .max()
            .unwrap_or(0);
        self.a
            .branches()
            .map(|(x, branch)| match self.id_pairs.get(&x) {
                Some(&y) => branch.len() * self.b.branch(y).len(),
                None => branch.len() * longest_free,
            })
            .sum()
    }

    /// Runs the alignment. `progress` is polled once per DP state; returning
    /// `true` cancels with [`DendriteError::Cancelled`].
    pub fn perform_alignment<F>(&self, mut progress: F) -> DendriteResult<AlignmentResult>
    where
        F: FnMut() -> bool,
    {
        log::info!(
            "Aligning point ids of {} branches (at most {} states)",
            self.a.branch_count(),
            self.max_call_count()
        );
        let mut remap = BTreeMap::new();
        let mut matched: HashMap<PointIdx, PointIdx> = HashMap::new();
        if let (Some(ra), Some(rb)) = (self.a.root(), self.b.root()) {
            remap.insert(self.b.point(rb).id.clone(), self.a.point(ra).id.clone());
            matched.insert(ra, rb);
        }
        let mut used_b: HashSet<BranchIdx> = self.id_pairs.values().copied().collect();

        for x in self.a.flatten_branches() {
            let y = match self.id_pairs.get(&x) {
                Some(&y) => y,
                None => match self.structural_partner(x, &matched, &used_b) {
                    Some(y) => {
                        used_b.insert(y);
                        y
                    }
                    None => {
                        log::debug!("branch {} has no partner", self.a.branch(x).id);
                        continue;
                    }
                },
            };

            let a_points = self.a.branch(x).points();
            let b_points = self.b.branch(y).points();
            let a_coords: Vec<Vec3> = a_points.iter().map(|&p| self.a.world_coord(p)).collect();
            let b_coords: Vec<Vec3> = b_points.iter().map(|&p| self.b.world_coord(p)).collect();

            let matches = align_sequences(
                &a_coords,
                &b_coords,
                self.config.max_skip,
                self.config.unmatched_penalty,
                &mut progress,
            )?;
            log::debug!(
                "branch {} <-> {}: {} of {}x{} points matched",
                self.a.branch(x).id,
                self.b.branch(y).id,
                matches.len(),
                a_points.len(),
                b_points.len()
            );
            for (i, j) in matches {
                matched.insert(a_points[i], b_points[j]);
                remap.insert(
                    self.b.point(b_points[j]).id.clone(),
                    self.a.point(a_points[i]).id.clone(),
                );
            }
        }
        Ok(AlignmentResult { remap })
    }

    /// The unused B branch leaving the B point matched to `x`'s parent point,
    /// with the same rank among that point's children.
    fn structural_partner(
        &self,
        x: BranchIdx,
        matched: &HashMap<PointIdx, PointIdx>,
        used_b: &HashSet<BranchIdx>,
    ) -> Option<BranchIdx> {
        let a_parent = self.a.branch(x).parent_point()?;
        let b_parent = matched.get(&a_parent)?;
        let rank = self.a.index_in_parent(x)?;
        self.b
            .point(*b_parent)
            .children()
            .get(rank)
            .copied()
            .filter(|y| !used_b.contains(y))
    }
}

/// Bounded-skip DP over two point sequences. A state `(i, j)` means `a[i]`
/// is matched to `b[j]` as the latest pair; between consecutive pairs at
/// most `max_skip` points may be skipped on each side. Every unmatched point
/// costs `penalty`, so a match at distance `d` beats skipping both points only
/// when `d < 2 * penalty`. Leading and trailing runs are unbounded.
fn align_sequences<F>(
    a: &[Vec3],
    b: &[Vec3],
    max_skip: usize,
    penalty: f64,
    progress: &mut F,
) -> DendriteResult<Vec<(usize, usize)>>
where
    F: FnMut() -> bool,
{
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return Ok(Vec::new());
    }
    let at = |i: usize, j: usize| i * m + j;
    let mut cost = vec![f64::INFINITY; n * m];
    let mut back: Vec<Option<(usize, usize)>> = vec![None; n * m];

    for i in 0..n {
        for j in 0..m {
            if progress() {
                return Err(DendriteError::Cancelled);
            }
            let mut best = penalty * (i + j) as f64;
            let mut from = None;
            for pi in i.saturating_sub(max_skip + 1)..i {
                for pj in j.saturating_sub(max_skip + 1)..j {
                    let skipped = (i - pi - 1) + (j - pj - 1);
                    let c = cost[at(pi, pj)] + penalty * skipped as f64;
                    if c < best {
                        best = c;
                        from = Some((pi, pj));
                    }
                }
            }
            cost[at(i, j)] = best + distance(&a[i], &b[j]);
            back[at(i, j)] = from;
        }
    }

    let mut best_total = penalty * (n + m) as f64;
    let mut end = None;
    for i in 0..n {
        for j in 0..m {
            let total = cost[at(i, j)] + penalty * ((n - 1 - i) + (m - 1 - j)) as f64;
            if total < best_total {
                best_total = total;
                end = Some((i, j));
            }
        }
    }

    let mut matches = Vec::new();
    let mut current = end;
    while let Some((i, j)) = current {
        matches.push((i, j));
        current = back[at(i, j)];
    }
    matches.reverse();
    Ok(matches)
}

/// Applies an alignment to tree B.
///
/// Every source is validated first; then renamed sources move to fresh
/// temporary IDs, and finally the temporaries take their targets. A target
/// still held by an unmatched point pushes that point to a fresh ID.
pub fn apply_alignment(tree: &mut Tree, result: &AlignmentResult) -> DendriteResult<()> {
    let mut targets = HashSet::new();
    for target in result.remap.values() {
        if !targets.insert(target.as_str()) {
            return Err(DendriteError::StructureViolation(format!(
                "two points remap onto {}",
                target
            )));
        }
    }
    let changes: Vec<(String, String)> = result.changes().into_iter().collect();
    for (from, _) in &changes {
        if tree.point_by_id(from).is_none() {
            return Err(DendriteError::NotFound(format!("point {}", from)));
        }
    }

    let mut staged = Vec::with_capacity(changes.len());
    for (from, to) in changes {
        let tmp = fresh_point_id(tree, "__align_tmp");
        tree.rename_point(&from, &tmp)?;
        staged.push((tmp, to));
    }
    for (tmp, to) in staged {
        if tree.point_by_id(&to).is_some() {
            let moved = fresh_point_id(tree, &format!("{}_unmatched", to));
            log::warn!("point id {} held by an unmatched point, moving it to {}", to, moved);
            tree.rename_point(&to, &moved)?;
        }
        tree.rename_point(&tmp, &to)?;
    }
    Ok(())
}

fn fresh_point_id(tree: &Tree, base: &str) -> String {
    (0..)
        .map(|k| format!("{}#{}", base, k))
        .find(|id| tree.point_by_id(id).is_none())
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod identity_align_tests {
    use super::*;
    use crate::model::{Point, Transform};
    use crate::utils::test_utils::{order_fixture, build_tree};

    fn primed_copy(tree: &Tree, prime_branches: bool) -> Tree {
        let mut copy = Tree::new(tree.transform).unwrap();
        let root = tree.root().unwrap();
        let r = tree.point(root);
        copy.set_root(Point::new(
            format!("{}'", r.id),
            r.location.x,
            r.location.y,
            r.location.z,
        ))
        .unwrap();
        for b in tree.flatten_branches() {
            let branch = tree.branch(b);
            let parent = tree.point(branch.parent_point().unwrap());
            let id = if prime_branches {
                format!("{}'", branch.id)
            } else {
                branch.id.clone()
            };
            let new_b = copy.add_branch(id, &format!("{}'", parent.id)).unwrap();
            for &p in branch.points() {
                let pt = tree.point(p);
                copy.add_point(
                    new_b,
                    Point::new(
                        format!("{}'", pt.id),
                        pt.location.x,
                        pt.location.y,
                        pt.location.z,
                    ),
                )
                .unwrap();
            }
        }
        copy
    }

    fn run(a: &Tree, b: &Tree) -> AlignmentResult {
        IdentityAligner::new(a, b, AlignerConfig::default())
            .perform_alignment(|| false)
            .unwrap()
    }

    #[test]
    fn test_self_alignment_is_identity() {
        let a = order_fixture();
        let result = run(&a, &a);
        assert!(result.is_identity());
        assert_eq!(result.remap.len(), a.point_count());
        assert!(result.changes().is_empty());
    }

    #[test]
    fn test_primed_ids_map_back() {
        let a = order_fixture();
        for prime_branches in [false, true] {
            let mut b = primed_copy(&a, prime_branches);
            let result = run(&a, &b);
            assert_eq!(result.remap.len(), a.point_count());
            for (from, to) in &result.remap {
                assert_eq!(from, &format!("{}'", to));
            }

            apply_alignment(&mut b, &result).unwrap();
            for (_, p) in a.points() {
                assert!(b.point_by_id(&p.id).is_some(), "missing {}", p.id);
            }
            assert!(run(&a, &b).changes().is_empty());
        }
    }

    #[test]
    fn test_skips_inserted_and_far_points() {
        let a = build_tree(
            Transform::default(),
            [0.0, 0.0, 0.0],
            vec![(
                "b",
                "root",
                vec![
                    ("a1", [0.0, 10.0, 0.0]),
                    ("a2", [0.0, 20.0, 0.0]),
                    ("a3", [0.0, 30.0, 0.0]),
                ],
            )],
        );
        let b = build_tree(
            Transform::default(),
            [0.0, 0.0, 0.0],
            vec![(
                "b",
                "root",
                vec![
                    ("q1", [0.5, 10.0, 0.0]),
                    ("extra", [40.0, 15.0, 0.0]),
                    ("q2", [0.0, 20.5, 0.0]),
                    ("q3", [0.0, 30.0, 1.0]),
                    ("tip", [0.0, 90.0, 0.0]),
                ],
            )],
        );
        let result = run(&a, &b);
        let expected: BTreeMap<String, String> = [
            ("root", "root"),
            ("q1", "a1"),
            ("q2", "a2"),
            ("q3", "a3"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(result.remap, expected);
    }

    fn id_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_child_branch_follows_matched_parent_point() {
        let a = build_tree(
            Transform::default(),
            [0.0, 0.0, 0.0],
            vec![
                (
                    "s",
                    "root",
                    vec![
                        ("a1", [0.0, 10.0, 0.0]),
                        ("a2", [0.0, 20.0, 0.0]),
                        ("a3", [0.0, 30.0, 0.0]),
                    ],
                ),
                ("x", "a2", vec![("ax1", [5.0, 20.0, 0.0]), ("ax2", [10.0, 20.0, 0.0])]),
            ],
        );
        // an extra point near the soma shifts every index on the shaft
        let b = build_tree(
            Transform::default(),
            [0.0, 0.0, 0.0],
            vec![
                (
                    "s",
                    "root",
                    vec![
                        ("q0", [0.0, 3.0, 0.0]),
                        ("q1", [0.0, 10.0, 0.0]),
                        ("q2", [0.0, 20.0, 0.0]),
                        ("q3", [0.0, 30.0, 0.0]),
                    ],
                ),
                ("y", "q2", vec![("by1", [5.0, 20.0, 0.0]), ("by2", [10.0, 20.0, 0.0])]),
            ],
        );
        let aligner = IdentityAligner::new(&a, &b, AlignerConfig::default());
        let mut calls = 0;
        let result = aligner
            .perform_alignment(|| {
                calls += 1;
                false
            })
            .unwrap();
        assert_eq!(
            result.remap,
            id_map(&[
                ("root", "root"),
                ("q1", "a1"),
                ("q2", "a2"),
                ("q3", "a3"),
                ("by1", "ax1"),
                ("by2", "ax2"),
            ])
        );
        assert!(calls <= aligner.max_call_count());
    }

    #[test]
    fn test_renamed_branches_with_missing_shaft_point() {
        let a = build_tree(
            Transform::default(),
            [0.0, 0.0, 0.0],
            vec![
                (
                    "s",
                    "root",
                    vec![
                        ("a1", [0.0, 10.0, 0.0]),
                        ("a2", [0.0, 20.0, 0.0]),
                        ("a3", [0.0, 30.0, 0.0]),
                    ],
                ),
                ("x1", "a2", vec![("x1a", [5.0, 20.0, 0.0]), ("x1b", [10.0, 20.0, 0.0])]),
                ("x2", "a2", vec![("x2a", [-5.0, 20.0, 0.0]), ("x2b", [-10.0, 20.0, 0.0])]),
            ],
        );
        let b = build_tree(
            Transform::default(),
            [0.0, 0.0, 0.0],
            vec![
                ("t", "root", vec![("q2", [0.0, 20.5, 0.0]), ("q3", [0.0, 30.0, 0.0])]),
                ("u1", "q2", vec![("u1a", [5.0, 20.5, 0.0]), ("u1b", [10.0, 20.0, 0.0])]),
                ("u2", "q2", vec![("u2a", [-5.0, 20.0, 0.0]), ("u2b", [-10.0, 20.0, 0.0])]),
            ],
        );
        let aligner = IdentityAligner::new(&a, &b, AlignerConfig::default());
        assert_eq!(aligner.max_call_count(), 3 * 2 + 2 * 2 + 2 * 2);
        let result = aligner.perform_alignment(|| false).unwrap();
        assert_eq!(
            result.remap,
            id_map(&[
                ("root", "root"),
                ("q2", "a2"),
                ("q3", "a3"),
                ("u1a", "x1a"),
                ("u1b", "x1b"),
                ("u2a", "x2a"),
                ("u2b", "x2b"),
            ])
        );
    }

    #[test]
    fn test_progress_counts_and_cancellation() {
        let a = order_fixture();
        let aligner = IdentityAligner::new(&a, &a, AlignerConfig::default());
        let mut calls = 0;
        aligner
            .perform_alignment(|| {
                calls += 1;
                false
            })
            .unwrap();
        assert_eq!(calls, aligner.max_call_count());
        assert_eq!(aligner.max_call_count(), 10 * 10 + 1 + 4 * 4 + 1);

        let mut calls = 0;
        let cancelled = aligner.perform_alignment(|| {
            calls += 1;
            calls > 3
        });
        assert_eq!(cancelled, Err(DendriteError::Cancelled));
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_apply_moves_unmatched_holder_of_target_id() {
        let mut b = build_tree(
            Transform::default(),
            [0.0, 0.0, 0.0],
            vec![
                ("b", "root", vec![("x1", [0.0, 1.0, 0.0]), ("x2", [0.0, 2.0, 0.0])]),
                ("other", "root", vec![("a2", [5.0, 0.0, 0.0])]),
            ],
        );
        let remap: BTreeMap<String, String> = [("x1", "a1"), ("x2", "a2")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        apply_alignment(&mut b, &AlignmentResult { remap }).unwrap();

        let a2 = b.point_by_id("a2").unwrap();
        assert_eq!(b.point(a2).location.y, 2.0);
        assert!(b.point_by_id("a1").is_some());
        assert!(b.point_by_id("x1").is_none());
        let moved = b.point_by_id("a2_unmatched#0").unwrap();
        assert_eq!(b.point(moved).location.x, 5.0);
    }

    #[test]
    fn test_apply_rejects_duplicate_targets_without_mutation() {
        let mut b = order_fixture();
        let remap: BTreeMap<String, String> = [("b1_1", "z"), ("b3_1", "z")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let err = apply_alignment(&mut b, &AlignmentResult { remap }).unwrap_err();
        assert!(matches!(err, DendriteError::StructureViolation(_)));
        assert!(b.point_by_id("b1_1").is_some());
        assert!(b.point_by_id("z").is_none());
    }
}
