//! Browser bindings for sessionfall.
//!
//! wasm-bindgen cannot export the generic `Runner`, so one concrete runner
//! (canvas surface, `<img>` loader) lives in a `thread_local!` and free
//! functions forward to it.

use std::cell::RefCell;

use sessionfall::{EngineConfig, ImageManifest, Runner};
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

pub mod canvas;
pub mod loader;

pub use canvas::CanvasSurface;
pub use loader::HtmlImageLoader;

type WebRunner = Runner<CanvasSurface, HtmlImageLoader>;

thread_local! {
    static RUNNER: RefCell<Option<WebRunner>> = RefCell::new(None);
}

/// Run `f` on the runner. Before `sessionfall_init` (or after destroy) the
/// call is logged and skipped.
fn with_runner<R>(f: impl FnOnce(&mut WebRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| match cell.borrow_mut().as_mut() {
        Some(runner) => Some(f(runner)),
        None => {
            log::warn!("sessionfall not initialized, call sessionfall_init() first");
            None
        }
    })
}

#[wasm_bindgen]
pub fn sessionfall_init(config_json: &str, manifest_json: &str) {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let config = if config_json.trim().is_empty() {
        EngineConfig::default()
    } else {
        EngineConfig::from_json(config_json).unwrap_or_else(|err| {
            log::warn!("config rejected ({}), using defaults", err);
            EngineConfig::default()
        })
    };
    let manifest = if manifest_json.trim().is_empty() {
        ImageManifest::default()
    } else {
        ImageManifest::from_json(manifest_json).unwrap_or_else(|err| {
            log::warn!("image manifest rejected ({}), using defaults", err);
            ImageManifest::default()
        })
    };

    let runner = Runner::new(config, manifest, HtmlImageLoader);
    RUNNER.with(|cell| {
        *cell.borrow_mut() = Some(runner);
    });
    log::info!("sessionfall: initialized");
}

#[wasm_bindgen]
pub fn sessionfall_attach_canvas(canvas: &HtmlCanvasElement) {
    match CanvasSurface::from_canvas(canvas) {
        Ok(surface) => {
            with_runner(|r| r.attach_surface(surface));
        }
        Err(err) => log::error!("cannot draw on canvas: {:?}", err),
    }
}

/// Preload the image set, then start the loop. Frames before that are no-ops.
#[wasm_bindgen]
pub fn sessionfall_load_images() {
    let Some(loading) = with_runner(|r| r.load_images()) else {
        return;
    };
    wasm_bindgen_futures::spawn_local(async move {
        let images = loading.await;
        with_runner(|r| r.images_loaded(images));
    });
}

#[wasm_bindgen]
pub fn sessionfall_set_data(json: &str, now: f64) {
    with_runner(|r| {
        if let Err(err) = r.set_data_json(json, now) {
            log::warn!("set_data payload rejected: {}", err);
        }
    });
}

#[wasm_bindgen]
pub fn sessionfall_frame(now: f64) {
    with_runner(|r| r.frame(now));
}

#[wasm_bindgen]
pub fn sessionfall_resize(width: f32, height: f32) {
    with_runner(|r| r.resize(width, height));
}

#[wasm_bindgen]
pub fn sessionfall_stop() {
    with_runner(|r| r.engine_mut().stop());
}

#[wasm_bindgen]
pub fn sessionfall_start(now: f64) {
    with_runner(|r| r.engine_mut().start(now));
}

#[wasm_bindgen]
pub fn sessionfall_reset() {
    with_runner(|r| r.reset());
}

/// Tear down and drop the runner. Image loads still in flight settle into nothing.
#[wasm_bindgen]
pub fn sessionfall_destroy() {
    RUNNER.with(|cell| {
        if let Some(mut runner) = cell.borrow_mut().take() {
            runner.destroy();
        }
    });
    log::info!("sessionfall: destroyed");
}

// ---- Data accessors ----

#[wasm_bindgen]
pub fn get_frame_ptr() -> *const f32 {
    with_runner(|r| r.frame_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_frame_len() -> u32 {
    with_runner(|r| r.frame_len()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_ball_count() -> u32 {
    with_runner(|r| r.engine().arena().len() as u32).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_active_session_count() -> u32 {
    with_runner(|r| r.engine().active_sessions().len() as u32).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_explosion_count() -> f64 {
    with_runner(|r| r.engine().explosion_count() as f64).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn get_is_started() -> bool {
    with_runner(|r| r.is_started()).unwrap_or(false)
}
