use futures::future::{FutureExt, LocalBoxFuture};

use crate::api::config::EngineConfig;
use crate::api::engine::SessionEngine;
use crate::api::error::ConfigError;
use crate::api::types::{DataBatch, EngineEvent, WireEvent};
use crate::assets::cache::{ImageCache, ImageLoader};
use crate::assets::manifest::ImageManifest;
use crate::assets::registry::ImageSet;
use crate::bridge::protocol::ProtocolLayout;
use crate::renderer::traits::Surface;
use crate::systems::render::paint;

/// Wires the engine to a drawing surface and an image loader.
///
/// The loop only runs once the image set is loaded: until `images_loaded`
/// is called, `frame` is a no-op. Hosts that cannot export generics (wasm)
/// keep one concrete `Runner` in a `thread_local!`.
pub struct Runner<S, L>
where
    S: Surface,
    L: ImageLoader<Image = S::Image> + 'static,
{
    engine: SessionEngine,
    surface: Option<S>,
    cache: ImageCache<L>,
    manifest: ImageManifest,
    images: ImageSet<S::Image>,
    layout: ProtocolLayout,
    started: bool,
    destroyed: bool,
    frame_counter: u32,
    /// Events drained during the last frame.
    events: Vec<EngineEvent>,
    wire_events: Vec<WireEvent>,
    /// Packed frame for shared-memory reads.
    frame_buffer: Vec<f32>,
    warned_no_surface: bool,
}

impl<S, L> Runner<S, L>
where
    S: Surface,
    L: ImageLoader<Image = S::Image> + 'static,
{
    pub fn new(config: EngineConfig, manifest: ImageManifest, loader: L) -> Self {
        let layout = ProtocolLayout::from_config(&config);
        Self {
            engine: SessionEngine::new(config),
            surface: None,
            cache: ImageCache::new(loader),
            manifest,
            images: ImageSet::empty(),
            frame_buffer: Vec::with_capacity(layout.buffer_total_floats),
            layout,
            started: false,
            destroyed: false,
            frame_counter: 0,
            events: Vec::new(),
            wire_events: Vec::new(),
            warned_no_surface: false,
        }
    }

    pub fn attach_surface(&mut self, surface: S) {
        self.surface = Some(surface);
        self.warned_no_surface = false;
    }

    /// Future that preloads every manifest slot through the shared cache.
    /// It holds no borrow of the runner, so the host can keep ticking (and
    /// feeding data) while it resolves; hand the result to `images_loaded`.
    pub fn load_images(&self) -> LocalBoxFuture<'static, ImageSet<S::Image>> {
        let cache = self.cache.clone();
        let manifest = self.manifest.clone();
        async move { ImageSet::load(&cache, &manifest).await }.boxed_local()
    }

    /// Install the loaded images and start the loop. Returns false when the
    /// runner was destroyed while loading; the images are discarded.
    pub fn images_loaded(&mut self, images: ImageSet<S::Image>) -> bool {
        if self.destroyed {
            log::debug!("images arrived after destroy, discarded");
            return false;
        }
        self.images = images;
        self.started = true;
        log::info!("runner started");
        true
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn set_data(&mut self, batch: &DataBatch, now: f64) {
        self.engine.set_data(batch, now);
    }

    /// Parse and apply a JSON batch. A payload that is not a batch at all is
    /// rejected whole; malformed entries inside it are skipped by the engine.
    pub fn set_data_json(&mut self, json: &str, now: f64) -> Result<(), ConfigError> {
        let batch = DataBatch::from_json(json)?;
        self.engine.set_data(&batch, now);
        Ok(())
    }

    /// One animation frame: tick, pack the frame buffer, paint.
    pub fn frame(&mut self, now: f64) {
        if !self.started || self.destroyed {
            return;
        }
        self.engine.tick(now);
        self.frame_counter = self.frame_counter.wrapping_add(1);

        self.events = self.engine.drain_events();
        self.wire_events.clear();
        self.wire_events.extend(self.events.iter().map(EngineEvent::to_wire));
        self.layout.write_frame(
            &mut self.frame_buffer,
            self.frame_counter,
            self.engine.render_buffer(),
            &self.wire_events,
        );

        match self.surface.as_mut() {
            Some(surface) => paint(self.engine.render_buffer(), surface, &self.images),
            None => {
                if !self.warned_no_surface {
                    log::warn!("no drawing surface attached, skipping paint");
                    self.warned_no_surface = true;
                } else {
                    log::debug!("no drawing surface, frame {} not painted", self.frame_counter);
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.events.clear();
        self.wire_events.clear();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.engine.resize(width, height);
        self.layout = ProtocolLayout::from_config(self.engine.config());
    }

    /// Tear everything down: engine state, pending tasks, the image cache
    /// (loads still in flight settle and are dropped) and the surface.
    pub fn destroy(&mut self) {
        self.engine.destroy();
        self.cache.clear();
        self.images = ImageSet::empty();
        self.surface = None;
        self.started = false;
        self.destroyed = true;
        self.events.clear();
        self.wire_events.clear();
        self.frame_buffer.clear();
    }

    // ---- Accessors ----

    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SessionEngine {
        &mut self.engine
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn images(&self) -> &ImageSet<S::Image> {
        &self.images
    }

    pub fn cache(&self) -> &ImageCache<L> {
        &self.cache
    }

    pub fn layout(&self) -> &ProtocolLayout {
        &self.layout
    }

    /// Events from the last frame.
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    // ---- Pointer accessors for shared-memory reads ----

    pub fn frame_ptr(&self) -> *const f32 {
        self.frame_buffer.as_ptr()
    }

    pub fn frame_len(&self) -> u32 {
        self.frame_buffer.len() as u32
    }

    pub fn frame_buffer(&self) -> &[f32] {
        &self.frame_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::cache::tests::EchoLoader;
    use crate::bridge::protocol::HEADER_BALL_COUNT;
    use crate::renderer::instance::{BallInstance, ParticleInstance};
    use futures::executor::block_on;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        balls: Vec<Option<String>>,
        frames: usize,
    }

    impl Surface for Recorder {
        type Image = String;

        fn clear(&mut self, _width: f32, _height: f32) {
            self.frames += 1;
        }

        fn draw_border(&mut self, _y: f32, _width: f32) {}

        fn draw_ball(&mut self, _ball: &BallInstance, image: Option<&String>) {
            self.balls.push(image.cloned());
        }

        fn draw_particle(&mut self, _particle: &ParticleInstance) {}
    }

    fn runner() -> Runner<Recorder, EchoLoader> {
        Runner::new(
            EngineConfig::default().with_viewport(240.0, 600.0),
            ImageManifest::default(),
            EchoLoader::default(),
        )
    }

    fn insert_json(id: &str) -> String {
        json!({ "insert": [[id, 1200.0, 800.0, 100.0, 0.02, 300.0]] }).to_string()
    }

    #[test]
    fn frames_wait_for_images() {
        let mut runner = runner();
        runner.attach_surface(Recorder::default());
        runner.set_data_json(&insert_json("d1"), 0.0).unwrap();

        runner.frame(0.0);
        assert_eq!(runner.surface().unwrap().frames, 0);

        let images = block_on(runner.load_images());
        assert!(runner.images_loaded(images));
        runner.frame(16.0);

        let surface = runner.surface().unwrap();
        assert_eq!(surface.frames, 1);
        assert_eq!(surface.balls, vec![Some("very-good.png".to_string())]);
        assert_eq!(runner.frame_buffer()[HEADER_BALL_COUNT], 1.0);
        assert_eq!(runner.cache().loads_issued(), 6);
    }

    #[test]
    fn missing_surface_skips_paint_but_ticks() {
        let mut runner = runner();
        let images = block_on(runner.load_images());
        runner.images_loaded(images);
        runner.set_data_json(&insert_json("d1"), 0.0).unwrap();

        runner.frame(0.0);
        assert_eq!(runner.frame_buffer()[HEADER_BALL_COUNT], 1.0);

        runner.attach_surface(Recorder::default());
        runner.frame(16.0);
        assert_eq!(runner.surface().unwrap().frames, 1);
    }

    #[test]
    fn bad_payload_is_rejected() {
        let mut runner = runner();
        assert!(runner.set_data_json("not json", 0.0).is_err());
        assert!(runner.engine().active_sessions().is_empty());
    }

    #[test]
    fn destroy_discards_late_images() {
        let mut runner = runner();
        runner.attach_surface(Recorder::default());
        let loading = runner.load_images();
        runner.destroy();

        let images = block_on(loading);
        assert!(!runner.images_loaded(images));
        assert!(!runner.is_started());
        assert!(runner.surface().is_none());
        assert!(runner.engine().is_destroyed());
    }
}
