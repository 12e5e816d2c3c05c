use futures::future::{FutureExt, LocalBoxFuture};
use sessionfall::{ImageLoader, LoadError};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlImageElement;

/// Loads images through `<img>` elements; resolves once the browser has decoded them.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlImageLoader;

impl ImageLoader for HtmlImageLoader {
    type Image = HtmlImageElement;

    fn load(&self, src: &str) -> LocalBoxFuture<'static, Result<HtmlImageElement, LoadError>> {
        let src = src.to_string();
        async move {
            let loaded = load_image(&src).await;
            loaded.map_err(|reason| LoadError::Failed { src, reason })
        }
        .boxed_local()
    }
}

async fn load_image(src: &str) -> Result<HtmlImageElement, String> {
    let img = HtmlImageElement::new().map_err(|_| "failed to create image element".to_string())?;
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let onload = Closure::once(move || {
            let _ = resolve.call0(&JsValue::NULL);
        });
        let onerror = Closure::once(move || {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str("image_load_failed"));
        });
        img.set_onload(Some(onload.as_ref().unchecked_ref()));
        img.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onload.forget();
        onerror.forget();
    });
    img.set_src(src);
    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|_| "image_load_failed".to_string())?;
    img.set_onload(None);
    img.set_onerror(None);
    Ok(img)
}
