use futures::future::join_all;
use crate::assets::cache::{ImageCache, ImageLoader};
use crate::assets::manifest::ImageManifest;
use crate::components::feel::ImageSlot;

/// Loaded images indexed by slot, with a fallback for slots that failed.
/// Built once by the runner before the animation loop starts.
pub struct ImageSet<I> {
    images: Vec<Option<I>>,
    fallback: Option<usize>,
}

impl<I> ImageSet<I> {
    pub fn empty() -> Self {
        Self {
            images: ImageSlot::ALL.iter().map(|_| None).collect(),
            fallback: None,
        }
    }

    pub fn insert(&mut self, slot: ImageSlot, image: I) {
        self.images[slot.index()] = Some(image);
    }

    /// Pick the fallback image: the `Default` slot when it loaded, otherwise
    /// the first slot that did.
    pub fn compute_fallback(&mut self) {
        self.fallback = if self.images[ImageSlot::Default.index()].is_some() {
            Some(ImageSlot::Default.index())
        } else {
            self.images.iter().position(Option::is_some)
        };
    }

    /// Image for a slot, or the fallback when that slot failed to load.
    pub fn get(&self, slot: ImageSlot) -> Option<&I> {
        self.get_index(slot.index())
    }

    pub fn get_index(&self, index: usize) -> Option<&I> {
        self.images
            .get(index)
            .and_then(Option::as_ref)
            .or_else(|| self.fallback.and_then(|f| self.images[f].as_ref()))
    }

    pub fn loaded_count(&self) -> usize {
        self.images.iter().filter(|i| i.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded_count() == 0
    }
}

impl<I> Default for ImageSet<I> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<I: Clone + 'static> ImageSet<I> {
    /// Preload every slot the manifest lists through `cache`. Individual
    /// failures leave the slot empty; the set never fails as a whole.
    pub async fn load<L>(cache: &ImageCache<L>, manifest: &ImageManifest) -> Self
    where
        L: ImageLoader<Image = I>,
    {
        let requests: Vec<_> = ImageSlot::ALL
            .iter()
            .filter_map(|&slot| manifest.src(slot).map(|src| (slot, cache.preload_image(&src))))
            .collect();
        let (slots, loads): (Vec<_>, Vec<_>) = requests.into_iter().unzip();

        let mut set = Self::empty();
        for (slot, image) in slots.into_iter().zip(join_all(loads).await) {
            match image {
                Some(image) => set.insert(slot, image),
                None => log::warn!("image for `{}` unavailable, using fallback", slot.key()),
            }
        }
        set.compute_fallback();
        log::info!("images ready: {}/{}", set.loaded_count(), ImageSlot::ALL.len());
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::cache::tests::EchoLoader;
    use futures::executor::block_on;

    #[test]
    fn fallback_prefers_default_slot() {
        let mut set = ImageSet::empty();
        set.insert(ImageSlot::Good, "good");
        set.insert(ImageSlot::Default, "default");
        set.compute_fallback();
        assert_eq!(set.get(ImageSlot::Good), Some(&"good"));
        assert_eq!(set.get(ImageSlot::Bad), Some(&"default"));
    }

    #[test]
    fn fallback_uses_first_loaded_without_default() {
        let mut set = ImageSet::empty();
        set.insert(ImageSlot::Normal, "normal");
        set.insert(ImageSlot::VeryGood, "very-good");
        set.compute_fallback();
        assert_eq!(set.get(ImageSlot::Default), Some(&"normal"));
        assert_eq!(set.get_index(99), Some(&"normal"));
    }

    #[test]
    fn empty_set_resolves_nothing() {
        let mut set: ImageSet<&str> = ImageSet::empty();
        set.compute_fallback();
        assert!(set.is_empty());
        assert_eq!(set.get(ImageSlot::Good), None);
    }

    #[test]
    fn load_survives_individual_failures() {
        let mut manifest = ImageManifest::default();
        manifest.images.insert("bad".into(), "missing-bad.png".into());
        manifest.images.insert("very-bad".into(), "good.png".into());

        let loader = EchoLoader::default();
        let loads = loader.loads.clone();
        let cache = ImageCache::new(loader);
        let set = block_on(ImageSet::load(&cache, &manifest));

        assert_eq!(set.loaded_count(), 5);
        assert_eq!(set.get(ImageSlot::Bad).map(String::as_str), Some("default.png"));
        // "good.png" is listed twice but fetched once.
        assert_eq!(loads.get(), 5);
        assert_eq!(set.get(ImageSlot::VeryBad).map(String::as_str), Some("good.png"));
    }
}
