use anyhow::{bail, Context};
use ndarray::{Array2, ArrayView2};

use crate::io::volume::VolumeProvider;
use crate::model::{FullState, Punctum};

/// Radius of punctum `id` at `t`, falling back to the nearest earlier
/// timepoint that has one, then the nearest later one.
pub fn inherited_radius(state: &FullState, id: &str, t: usize) -> Option<f64> {
    let radius_at = |i: usize| state.timepoints[i].punctum(id).and_then(|p| p.radius);
    radius_at(t)
        .or_else(|| (0..t).rev().find_map(radius_at))
        .or_else(|| (t + 1..state.len()).find_map(radius_at))
}

/// `|ids| x T` areas: `π r²` where the punctum exists, 0 where it does not,
/// NaN when no timepoint knows its radius.
pub fn per_puncta_size(state: &FullState, ids: &[String]) -> Array2<f64> {
    let mut sizes = Array2::zeros((ids.len(), state.len()));
    for (i, id) in ids.iter().enumerate() {
        for t in 0..state.len() {
            if state.timepoints[t].punctum(id).is_none() {
                continue;
            }
            sizes[[i, t]] = inherited_radius(state, id, t).map_or(f64::NAN, Punctum::area_for_radius);
        }
    }
    sizes
}

/// Mean of the pixels whose centres `(col + 0.5, row + 0.5)` lie within
/// `radius` of `(x, y)`, scaled to `[0, 1]`.
pub fn disk_mean(plane: ArrayView2<'_, u8>, x: f64, y: f64, radius: f64) -> f64 {
    let (height, width) = plane.dim();
    let row_lo = (y - radius - 0.5).floor().max(0.0) as usize;
    let row_hi = ((y + radius).ceil().max(0.0) as usize).min(height);
    let col_lo = (x - radius - 0.5).floor().max(0.0) as usize;
    let col_hi = ((x + radius).ceil().max(0.0) as usize).min(width);

    let mut sum = 0.0;
    let mut count = 0usize;
    for row in row_lo..row_hi {
        for col in col_lo..col_hi {
            let dx = col as f64 + 0.5 - x;
            let dy = row as f64 + 0.5 - y;
            if dx * dx + dy * dy <= radius * radius {
                sum += plane[[row, col]] as f64;
                count += 1;
            }
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64 / 255.0
    }
}

/// `|ids| x T` mean intensities in `channel`, read from the Z plane nearest
/// each punctum.
///
/// Missing puncta and timepoints without an image are NaN, a zero (or
/// unknown) radius gives 0.
pub fn per_puncta_intensity(
    state: &FullState,
    ids: &[String],
    channel: usize,
    provider: &dyn VolumeProvider,
) -> anyhow::Result<Array2<f64>> {
    let mut intensities = Array2::from_elem((ids.len(), state.len()), f64::NAN);
    for (t, timepoint) in state.timepoints.iter().enumerate() {
        let present: Vec<(usize, &Punctum)> = ids
            .iter()
            .enumerate()
            .filter_map(|(i, id)| timepoint.punctum(id).map(|p| (i, p)))
            .collect();
        if present.is_empty() {
            continue;
        }
        let Some(path) = timepoint.image_path.as_deref() else {
            log::warn!("timepoint {} has puncta but no image", t);
            continue;
        };
        let volume = provider
            .get_volume(path)
            .with_context(|| format!("intensity of timepoint {}", t))?;
        if channel >= volume.channels() {
            bail!(
                "channel {} requested but {:?} has {} channels",
                channel,
                path,
                volume.channels()
            );
        }

        for (i, punctum) in present {
            let radius = inherited_radius(state, &punctum.id, t).unwrap_or(0.0);
            if radius <= 0.0 {
                intensities[[i, t]] = 0.0;
                continue;
            }
            let z = punctum.location.z.round();
            if z < 0.0 {
                continue;
            }
            if let Some(plane) = volume.plane(channel, z as usize) {
                intensities[[i, t]] =
                    disk_mean(plane, punctum.location.x, punctum.location.y, radius);
            }
        }
    }
    Ok(intensities)
}

#[cfg(test)]
mod puncta_tests {
    use super::*;
    use crate::io::volume::{MemoVolumeCache, Volume};
    use crate::model::{Timepoint, Tree};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;
    use std::path::Path;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn series(puncta: Vec<Vec<Punctum>>) -> FullState {
        FullState::new(
            puncta
                .into_iter()
                .enumerate()
                .map(|(t, p)| {
                    Timepoint::new(Tree::default())
                        .with_image(format!("t{}.tif", t))
                        .with_puncta(p)
                })
                .collect(),
        )
    }

    #[test]
    fn test_size_with_inherited_radius() {
        let state = series(vec![
            vec![Punctum::new("a", 1.0, 1.0, 0.0).with_radius(3.0)],
            vec![
                Punctum::new("a", 1.0, 1.0, 0.0),
                Punctum::new("b", 2.0, 2.0, 0.0),
            ],
            vec![Punctum::new("b", 2.0, 2.0, 0.0).with_radius(1.0)],
            vec![Punctum::new("c", 0.0, 0.0, 0.0)],
        ]);
        let sizes = per_puncta_size(&state, &ids(&["a", "b", "c"]));
        assert_eq!(sizes.dim(), (3, 4));
        assert_relative_eq!(sizes[[0, 0]], PI * 9.0);
        assert_relative_eq!(sizes[[0, 1]], PI * 9.0);
        assert_eq!(sizes[[0, 2]], 0.0);
        // b has no earlier radius and takes the later one
        assert_relative_eq!(sizes[[1, 1]], PI);
        assert!(sizes[[2, 3]].is_nan());
    }

    #[test]
    fn test_intensity_on_saturated_volume() {
        let provider = MemoVolumeCache::new(|_: &Path| Ok(Volume::filled(2, 4, 20, 20, 255)));
        let state = series(vec![vec![
            Punctum::new("inside", 10.0, 10.0, 2.2).with_radius(3.0),
            Punctum::new("dot", 5.0, 5.0, 1.0).with_radius(0.0),
            Punctum::new("deep", 10.0, 10.0, 9.0).with_radius(2.0),
        ]]);
        let values =
            per_puncta_intensity(&state, &ids(&["deep", "dot", "inside", "gone"]), 1, &provider)
                .unwrap();
        assert!(values[[0, 0]].is_nan());
        assert_eq!(values[[1, 0]], 0.0);
        assert_relative_eq!(values[[2, 0]], 1.0);
        assert!(values[[3, 0]].is_nan());

        assert!(per_puncta_intensity(&state, &ids(&["inside"]), 2, &provider).is_err());
    }

    #[test]
    fn test_disk_mean_over_split_plane() {
        let mut volume = Volume::filled(1, 1, 20, 20, 0);
        for row in 0..20 {
            for col in 10..20 {
                volume.data_mut()[[0, 0, row, col]] = 255;
            }
        }
        let plane = volume.plane(0, 0).unwrap();
        assert_relative_eq!(disk_mean(plane, 10.0, 10.0, 2.0), 0.5);
        assert_relative_eq!(disk_mean(plane, 15.0, 10.0, 2.0), 1.0);
        // no pixel centre within 0.1 of a pixel corner
        assert!(disk_mean(plane, 10.0, 10.0, 0.1).is_nan());
    }
}
