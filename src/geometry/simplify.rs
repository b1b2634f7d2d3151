use super::{point_segment_distance, Vec3};

/// Ramer-Douglas-Peucker simplification of a polyline.
///
/// Returns the indices of the points that are kept, always including the first
/// and the last point.
pub fn simplify_rdp(points: &[Vec3], tolerance: f64) -> Vec<usize> {
    if points.len() <= 2 {
        return (0..points.len()).collect();
    }

    let tolerance = tolerance.max(0.0);
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    // explicit stack instead of recursion, long traces can be thousands of points
    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let mut max_idx = start;
        let mut max_dist = -1.0;
        for i in start + 1..end {
            let d = point_segment_distance(&points[start], &points[end], &points[i]);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }
        if max_dist > tolerance {
            keep[max_idx] = true;
            stack.push((start, max_idx));
            stack.push((max_idx, end));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| if k { Some(i) } else { None })
        .collect()
}
