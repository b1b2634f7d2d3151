use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use ndarray::{Array4, ArrayView2, Axis};

use crate::model::FullState;

/// An 8-bit image stack laid out `[channel, z, y, x]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Array4<u8>,
}

impl Volume {
    pub fn new(data: Array4<u8>) -> Self {
        Volume { data }
    }

    pub fn filled(channels: usize, depth: usize, height: usize, width: usize, value: u8) -> Self {
        Volume::new(Array4::from_elem((channels, depth, height, width), value))
    }

    pub fn channels(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn depth(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn data(&self) -> &Array4<u8> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array4<u8> {
        &mut self.data
    }

    /// The `[y, x]` plane at `z` of `channel`, if both are in range.
    pub fn plane(&self, channel: usize, z: usize) -> Option<ArrayView2<'_, u8>> {
        if channel >= self.channels() || z >= self.depth() {
            return None;
        }
        Some(self.data.index_axis(Axis(0), channel).index_axis_move(Axis(0), z))
    }
}

/// Slow, synchronous source of image volumes keyed by path. Implementations
/// must return the same volume for the same path.
pub trait VolumeProvider: Send + Sync {
    fn get_volume(&self, path: &Path) -> anyhow::Result<Arc<Volume>>;
}

/// Memoizing provider around a loader function.
pub struct MemoVolumeCache<F> {
    loader: F,
    cache: Mutex<HashMap<PathBuf, Arc<Volume>>>,
}

impl<F> MemoVolumeCache<F>
where
    F: Fn(&Path) -> anyhow::Result<Volume> + Send + Sync,
{
    pub fn new(loader: F) -> Self {
        MemoVolumeCache {
            loader,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl<F> VolumeProvider for MemoVolumeCache<F>
where
    F: Fn(&Path) -> anyhow::Result<Volume> + Send + Sync,
{
    fn get_volume(&self, path: &Path) -> anyhow::Result<Arc<Volume>> {
        if let Some(volume) = self
            .cache
            .lock()
            .map_err(|_| anyhow!("volume cache lock poisoned"))?
            .get(path)
        {
            return Ok(Arc::clone(volume));
        }
        // loading happens outside the lock
        log::debug!("loading volume {:?}", path);
        let volume = Arc::new(
            (self.loader)(path).with_context(|| format!("failed to load volume {:?}", path))?,
        );
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| anyhow!("volume cache lock poisoned"))?;
        Ok(Arc::clone(
            cache.entry(path.to_path_buf()).or_insert(volume),
        ))
    }
}

/// Channel count of the first timepoint whose volume loads; 0 without images.
pub fn estimate_channel_count(state: &FullState, provider: &dyn VolumeProvider) -> usize {
    for path in state.timepoints.iter().filter_map(|t| t.image_path.as_deref()) {
        match provider.get_volume(path) {
            Ok(volume) => return volume.channels(),
            Err(e) => log::warn!("skipping unreadable volume {:?}: {:#}", path, e),
        }
    }
    0
}

#[cfg(test)]
mod volume_tests {
    use super::*;
    use crate::model::{Timepoint, Tree};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_plane_bounds() {
        let mut volume = Volume::filled(2, 3, 4, 5, 0);
        volume.data_mut()[[1, 2, 3, 4]] = 7;
        let plane = volume.plane(1, 2).unwrap();
        assert_eq!(plane.dim(), (4, 5));
        assert_eq!(plane[[3, 4]], 7);
        assert!(volume.plane(2, 0).is_none());
        assert!(volume.plane(0, 3).is_none());
    }

    #[test]
    fn test_cache_loads_each_path_once() {
        let loads = AtomicUsize::new(0);
        let cache = MemoVolumeCache::new(|path: &Path| {
            loads.fetch_add(1, Ordering::SeqCst);
            if path.ends_with("bad.tif") {
                anyhow::bail!("corrupt stack");
            }
            Ok(Volume::filled(3, 1, 1, 1, 0))
        });
        let a = cache.get_volume(Path::new("a.tif")).unwrap();
        let again = cache.get_volume(Path::new("a.tif")).unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cache.get_volume(Path::new("bad.tif")).is_err());
        assert_eq!(cache.len(), 1);

        let state = FullState::new(vec![
            Timepoint::new(Tree::default()),
            Timepoint::new(Tree::default()).with_image("bad.tif"),
            Timepoint::new(Tree::default()).with_image("a.tif"),
        ]);
        assert_eq!(estimate_channel_count(&state, &cache), 3);
        assert_eq!(
            estimate_channel_count(&FullState::from_trees(vec![Tree::default()]), &cache),
            0
        );
        cache.clear();
        assert!(cache.is_empty());
    }
}
