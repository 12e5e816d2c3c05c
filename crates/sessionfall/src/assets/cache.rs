//! Deduplicating asynchronous image cache.
//!
//! Each distinct `src` is fetched at most once: concurrent requesters share one
//! in-flight load through a `Shared` future, later requesters get the settled
//! value. A failed load settles to `None` so one bad asset cannot fail a batch.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use crate::api::error::LoadError;

/// Fetches and decodes one image. Implemented by the host (browser image
/// elements on the web; in-memory fakes in tests).
pub trait ImageLoader {
    type Image: Clone + 'static;

    fn load(&self, src: &str) -> LocalBoxFuture<'static, Result<Self::Image, LoadError>>;
}

type PendingLoad<I> = Shared<LocalBoxFuture<'static, Option<I>>>;

struct CacheState<I> {
    /// Finished loads, including failures (`None`).
    settled: HashMap<String, Option<I>>,
    pending: HashMap<String, PendingLoad<I>>,
    /// Bumped on teardown; loads started under an older generation are discarded.
    generation: u64,
    loads_issued: usize,
}

/// Cheap to clone: clones share the loader and the cache state.
pub struct ImageCache<L: ImageLoader> {
    loader: Rc<L>,
    state: Rc<RefCell<CacheState<L::Image>>>,
}

impl<L: ImageLoader> Clone for ImageCache<L> {
    fn clone(&self) -> Self {
        Self {
            loader: Rc::clone(&self.loader),
            state: Rc::clone(&self.state),
        }
    }
}

impl<L: ImageLoader> ImageCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader: Rc::new(loader),
            state: Rc::new(RefCell::new(CacheState {
                settled: HashMap::new(),
                pending: HashMap::new(),
                generation: 0,
                loads_issued: 0,
            })),
        }
    }

    /// Resolve `src` to its image. Returns the settled value immediately when
    /// present, joins the in-flight load when one is pending, and otherwise
    /// issues exactly one load. Never fails: errors resolve to `None`.
    pub fn preload_image(&self, src: &str) -> LocalBoxFuture<'static, Option<L::Image>> {
        let mut state = self.state.borrow_mut();
        if let Some(settled) = state.settled.get(src) {
            return future::ready(settled.clone()).boxed_local();
        }
        if let Some(pending) = state.pending.get(src) {
            return pending.clone().boxed_local();
        }

        let load = self.loader.load(src);
        let key = src.to_string();
        let generation = state.generation;
        let weak = Rc::downgrade(&self.state);
        let shared = async move {
            let result = match load.await {
                Ok(image) => Some(image),
                Err(err) => {
                    log::warn!("{}", err);
                    None
                }
            };
            if let Some(state) = weak.upgrade() {
                let mut state = state.borrow_mut();
                if state.generation == generation {
                    state.pending.remove(&key);
                    state.settled.insert(key, result.clone());
                }
            }
            result
        }
        .boxed_local()
        .shared();

        state.pending.insert(src.to_string(), shared.clone());
        state.loads_issued += 1;
        shared.boxed_local()
    }

    /// Settled image for `src`, if it loaded successfully.
    pub fn get(&self, src: &str) -> Option<L::Image> {
        self.state.borrow().settled.get(src).cloned().flatten()
    }

    pub fn is_pending(&self, src: &str) -> bool {
        self.state.borrow().pending.contains_key(src)
    }

    /// Number of loads ever handed to the loader.
    pub fn loads_issued(&self) -> usize {
        self.state.borrow().loads_issued
    }

    /// Tear down: forget every entry. In-flight loads still settle for whoever
    /// awaits them, but their results are not stored.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.generation += 1;
        state.settled.clear();
        state.pending.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::future::join_all;

    /// Loader that resolves every src to itself, except sources containing "missing".
    #[derive(Clone, Default)]
    pub(crate) struct EchoLoader {
        pub loads: Rc<Cell<usize>>,
    }

    impl ImageLoader for EchoLoader {
        type Image = String;

        fn load(&self, src: &str) -> LocalBoxFuture<'static, Result<String, LoadError>> {
            self.loads.set(self.loads.get() + 1);
            let src = src.to_string();
            async move {
                if src.contains("missing") {
                    Err(LoadError::Failed { src, reason: "404".into() })
                } else {
                    Ok(src)
                }
            }
            .boxed_local()
        }
    }

    /// Loader whose single load completes only when the test says so.
    struct GatedLoader {
        gate: RefCell<Option<oneshot::Receiver<String>>>,
    }

    impl ImageLoader for GatedLoader {
        type Image = String;

        fn load(&self, src: &str) -> LocalBoxFuture<'static, Result<String, LoadError>> {
            let src = src.to_string();
            let gate = self.gate.borrow_mut().take();
            async move {
                match gate {
                    Some(rx) => rx.await.map_err(|_| LoadError::Failed { src, reason: "cancelled".into() }),
                    None => Err(LoadError::Failed { src, reason: "loaded twice".into() }),
                }
            }
            .boxed_local()
        }
    }

    #[test]
    fn concurrent_requests_share_one_load() {
        let loader = EchoLoader::default();
        let loads = loader.loads.clone();
        let cache = ImageCache::new(loader);

        let requests: Vec<_> = (0..5).map(|_| cache.preload_image("good.png")).collect();
        assert_eq!(cache.loads_issued(), 1);
        assert!(cache.is_pending("good.png"));

        let results = block_on(join_all(requests));
        assert!(results.iter().all(|r| r.as_deref() == Some("good.png")));
        assert_eq!(loads.get(), 1);
        assert!(!cache.is_pending("good.png"));
        assert_eq!(cache.get("good.png").as_deref(), Some("good.png"));

        // Settled: served from cache without touching the loader.
        assert_eq!(block_on(cache.preload_image("good.png")).as_deref(), Some("good.png"));
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn in_flight_load_is_joined() {
        let (tx, rx) = oneshot::channel();
        let cache = ImageCache::new(GatedLoader { gate: RefCell::new(Some(rx)) });

        let first = cache.preload_image("bad.png");
        let second = cache.preload_image("bad.png");
        assert!(cache.is_pending("bad.png"));
        tx.send("decoded".to_string()).unwrap();

        let (a, b) = block_on(futures::future::join(first, second));
        assert_eq!(a.as_deref(), Some("decoded"));
        assert_eq!(b.as_deref(), Some("decoded"));
        assert_eq!(cache.loads_issued(), 1);
    }

    #[test]
    fn failure_resolves_to_none_and_is_not_refetched() {
        let loader = EchoLoader::default();
        let loads = loader.loads.clone();
        let cache = ImageCache::new(loader);

        let results = block_on(join_all(vec![
            cache.preload_image("missing.png"),
            cache.preload_image("normal.png"),
        ]));
        assert_eq!(results[0], None);
        assert_eq!(results[1].as_deref(), Some("normal.png"));

        assert_eq!(block_on(cache.preload_image("missing.png")), None);
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn teardown_discards_in_flight_results() {
        let (tx, rx) = oneshot::channel();
        let cache = ImageCache::new(GatedLoader { gate: RefCell::new(Some(rx)) });

        let pending = cache.preload_image("good.png");
        cache.clear();
        tx.send("late".to_string()).unwrap();

        assert_eq!(block_on(pending).as_deref(), Some("late"));
        assert_eq!(cache.get("good.png"), None);
        assert!(!cache.is_pending("good.png"));
    }
}
