use super::polynomial::Polynomial;
use crate::error::{DendriteError, DendriteResult};
use crate::geometry::{distance, segment_crosses_sphere, Vec3};
use crate::model::Tree;

/// Sampled radii `0, Δ, 2Δ, …` strictly below `max_radius`.
pub fn sholl_radii(bin_size: f64, max_radius: f64) -> Vec<f64> {
    if !(bin_size > 0.0) || !max_radius.is_finite() {
        return Vec::new();
    }
    (0..)
        .map(|i| i as f64 * bin_size)
        .take_while(|&r| r < max_radius)
        .collect()
}

/// Parent -> point segments of the whole tree in world coordinates.
fn world_segments(tree: &Tree) -> Vec<(Vec3, Vec3)> {
    let mut segments = Vec::with_capacity(tree.point_count());
    for (b, branch) in tree.branches() {
        if branch.parent_point().is_none() {
            continue;
        }
        for pair in tree.full_branch_points(b).windows(2) {
            segments.push((tree.world_coord(pair[0]), tree.world_coord(pair[1])));
        }
    }
    segments
}

/// Distance from the soma to the farthest point plus one bin.
pub fn default_max_radius(tree: &Tree, bin_size: f64) -> f64 {
    let Some(root) = tree.root() else {
        return bin_size;
    };
    let soma = tree.world_coord(root);
    let farthest = tree
        .points()
        .map(|(p, _)| distance(&soma, &tree.world_coord(p)))
        .fold(0.0, f64::max);
    farthest + bin_size
}

/// Number of segments crossing each Sholl sphere around the soma.
pub fn sholl_crossings(tree: &Tree, bin_size: f64, max_radius: f64) -> Vec<usize> {
    let radii = sholl_radii(bin_size, max_radius);
    let Some(root) = tree.root() else {
        return vec![0; radii.len()];
    };
    let soma = tree.world_coord(root);
    let segments = world_segments(tree);
    radii
        .iter()
        .map(|&r| {
            segments
                .iter()
                .filter(|(a, b)| segment_crosses_sphere(a, b, &soma, r))
                .count()
        })
        .collect()
}

/// Polynomial fitted to a Sholl profile and its maximum over the sampled range.
#[derive(Debug, Clone, PartialEq)]
pub struct ShollMetrics {
    pub polynomial: Polynomial,
    pub critical_radius: f64,
    pub max_crossings: f64,
}

pub fn sholl_metrics(
    crossings: &[usize],
    bin_size: f64,
    degree: usize,
) -> DendriteResult<ShollMetrics> {
    if crossings.is_empty() {
        return Err(DendriteError::InvalidInput(
            "Sholl metrics need at least one radius".into(),
        ));
    }
    let radii: Vec<f64> = (0..crossings.len()).map(|i| i as f64 * bin_size).collect();
    let counts: Vec<f64> = crossings.iter().map(|&c| c as f64).collect();
    let polynomial = Polynomial::fit(&radii, &counts, degree)?;
    let (lo, hi) = (radii[0], radii[radii.len() - 1]);
    let (critical_radius, max_crossings) = polynomial.argmax(lo, hi);
    Ok(ShollMetrics {
        polynomial,
        critical_radius,
        max_crossings,
    })
}

#[cfg(test)]
mod sholl_tests {
    use super::*;
    use crate::utils::test_utils::{straight_branch_tree, triple_fork_tree};
    use approx::assert_relative_eq;

    #[test]
    fn test_radii() {
        assert_eq!(sholl_radii(1.0, 3.0), vec![0.0, 1.0, 2.0]);
        assert_eq!(sholl_radii(0.1, 1.2).len(), 12);
        assert!(sholl_radii(0.0, 3.0).is_empty());
    }

    #[test]
    fn test_single_branch() {
        let tree = straight_branch_tree();
        assert_eq!(
            sholl_crossings(&tree, 1.0, 10.0),
            vec![1, 1, 1, 1, 1, 1, 1, 1, 0, 0]
        );
    }

    #[test]
    fn test_triple_fork() {
        let tree = triple_fork_tree();
        assert_eq!(
            sholl_crossings(&tree, 0.1, 1.2),
            vec![3, 3, 3, 3, 3, 12, 9, 9, 3, 3, 3, 0]
        );
    }

    #[test]
    fn test_empty_tree_is_all_zero() {
        assert_eq!(sholl_crossings(&Tree::default(), 5.0, 20.0), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_default_max_radius() {
        let tree = straight_branch_tree();
        assert_relative_eq!(default_max_radius(&tree, 1.0), 50.0_f64.sqrt() + 1.0);
        assert_eq!(default_max_radius(&Tree::default(), 2.0), 2.0);
    }

    #[test]
    fn test_linear_fit_metrics() {
        let metrics = sholl_metrics(&[1, 1, 1, 1, 1], 1.0, 1).unwrap();
        assert_relative_eq!(metrics.polynomial.coefficients[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.polynomial.coefficients[1], 0.0, epsilon = 1e-9);
        assert_eq!(metrics.critical_radius, 0.0);
        assert_relative_eq!(metrics.max_crossings, 1.0, epsilon = 1e-9);
        assert!(sholl_metrics(&[], 1.0, 1).is_err());
    }

    #[test]
    fn test_metrics_find_peak() {
        let tree = triple_fork_tree();
        let crossings = sholl_crossings(&tree, 0.1, 1.2);
        let metrics = sholl_metrics(&crossings, 0.1, 4).unwrap();
        assert!(metrics.critical_radius > 0.2 && metrics.critical_radius < 0.95);
        assert!(metrics.max_crossings > 3.0);
    }
}
