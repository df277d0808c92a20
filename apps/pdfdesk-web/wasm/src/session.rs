//! Stateful browser session
//!
//! Wraps the operation controller so that all UI state lives in Rust and
//! JavaScript only forwards DOM events, renders the view model and saves
//! downloads.

use pdfdesk_controller::{Controller, ControllerError, Download, InputFile, OperationKind, Toast};
use pdfdesk_core::PrerenderedPages;
use wasm_bindgen::prelude::*;

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
#[derive(Default)]
pub struct PdfDeskSession {
    controller: Controller,
    /// Page bitmaps drawn by pdf.js, consumed by compress
    renderings: PrerenderedPages,
    progress_callback: Option<js_sys::Function>,
    download_name: Option<String>,
}

#[wasm_bindgen]
impl PdfDeskSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback signature: (done: number, total: number, message: string) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    /// Open an operation form by its tag, e.g. `"merge"` or `"addCover"`.
    pub fn select(&mut self, tag: &str) -> Result<(), JsValue> {
        self.select_internal(tag).map_err(|e| JsValue::from_str(&e))
    }

    pub fn home(&mut self) {
        self.renderings.clear();
        self.controller.home();
    }

    /// Append a file to the primary selection.
    #[wasm_bindgen(js_name = addFile)]
    pub fn add_file(&mut self, name: &str, media_type: &str, bytes: &[u8]) -> Result<(), JsValue> {
        self.add_file_internal(InputFile::new(name, media_type, bytes.to_vec()))
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = clearFiles)]
    pub fn clear_files(&mut self) -> Result<(), JsValue> {
        self.renderings.clear();
        self.controller.set_files(Vec::new()).map_err(js_err)
    }

    /// Set the body PDF of the add-cover form.
    #[wasm_bindgen(js_name = setSecondaryFile)]
    pub fn set_secondary_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), JsValue> {
        self.controller
            .set_secondary_file(Some(InputFile::pdf(name, bytes.to_vec())))
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = setText)]
    pub fn set_text(&mut self, text: &str) -> Result<(), JsValue> {
        self.controller.set_text(text).map_err(js_err)
    }

    /// Returns the tile's new selection state.
    #[wasm_bindgen(js_name = togglePage)]
    pub fn toggle_page(&mut self, page_number: u32) -> Result<bool, JsValue> {
        self.controller.toggle_page(page_number).map_err(js_err)
    }

    #[wasm_bindgen(js_name = movePage)]
    pub fn move_page(&mut self, from: usize, to: usize) -> Result<(), JsValue> {
        self.controller.move_page(from, to).map_err(js_err)
    }

    /// Number of pages the host should render before applying compress.
    #[wasm_bindgen(js_name = pagesToRender)]
    pub fn pages_to_render(&self) -> usize {
        match self.controller.operation() {
            Some(OperationKind::Compress) => self.controller.grid().map_or(0, |grid| grid.len()),
            _ => 0,
        }
    }

    /// Hand over one page drawn at scale 1.0, as RGBA canvas data.
    #[wasm_bindgen(js_name = addRenderedPage)]
    pub fn add_rendered_page(
        &mut self,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Result<(), JsValue> {
        self.renderings.push_rgba(width, height, data).map_err(js_err)
    }

    #[wasm_bindgen(js_name = clearRenderedPages)]
    pub fn clear_rendered_pages(&mut self) {
        self.renderings.clear();
    }

    /// Run the open form. Returns the output PDF, or `undefined` when the
    /// form was rejected or the operation failed; toasts say why.
    pub fn apply(&mut self) -> Result<Option<js_sys::Uint8Array>, JsValue> {
        let download = self.apply_internal().map_err(|e| JsValue::from_str(&e))?;
        Ok(download.map(|download| {
            let array = js_sys::Uint8Array::new_with_length(download.bytes.len() as u32);
            array.copy_from(&download.bytes);
            array
        }))
    }

    /// File name for the last successful download.
    #[wasm_bindgen(getter, js_name = downloadName)]
    pub fn download_name(&self) -> Option<String> {
        self.download_name.clone()
    }

    /// The view model as a plain JS object.
    pub fn render(&self) -> Result<JsValue, JsValue> {
        to_js(&self.controller.render())
    }

    /// Toasts raised since the last call, as `[{kind, message}]`.
    #[wasm_bindgen(js_name = takeToasts)]
    pub fn take_toasts(&mut self) -> Result<JsValue, JsValue> {
        let toasts: Vec<Toast> = self.controller.take_toasts();
        to_js(&toasts)
    }

    #[wasm_bindgen(js_name = activityLog)]
    pub fn activity_log(&self) -> Vec<String> {
        self.controller.activity_log().lines()
    }
}

impl PdfDeskSession {
    fn select_internal(&mut self, tag: &str) -> Result<(), String> {
        let operation = tag.parse::<OperationKind>().map_err(|e| e.to_string())?;
        self.controller.select(operation).map_err(|e| e.to_string())?;
        self.renderings.clear();
        self.download_name = None;
        Ok(())
    }

    fn add_file_internal(&mut self, file: InputFile) -> Result<(), ControllerError> {
        let mut files = self.controller.files().to_vec();
        files.push(file);
        self.renderings.clear();
        self.controller.set_files(files)
    }

    fn apply_internal(&mut self) -> Result<Option<Download>, String> {
        let Self {
            controller,
            renderings,
            progress_callback,
            download_name,
        } = self;

        let Some(job) = controller.begin_apply().map_err(|e| e.to_string())? else {
            return Ok(None);
        };
        let id = job.id();
        let message = job.operation().descriptor().busy_message;

        let result = job.run(&*renderings, &mut |done, total| {
            controller.report_progress(id, done, total);
            if let Some(callback) = progress_callback.as_ref() {
                let _ = callback.call3(
                    &JsValue::null(),
                    &JsValue::from(done as u32),
                    &JsValue::from(total as u32),
                    &JsValue::from_str(message),
                );
            }
        });

        let download = controller.finish(id, result);
        renderings.clear();
        *download_name = download.as_ref().map(|d| d.file_name.clone());
        Ok(download)
    }
}
