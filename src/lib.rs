/// Focus Guard - Chrome extension that archives tabs instead of hoarding them
/// Built with Rust + WASM + Yew

mod archive;
mod archive_view;
mod background;
mod chrome;
mod config;
mod domain;
mod error;
mod host;
mod operations;
mod reminder;
mod restore;
mod router;
mod selection;
mod settings;
mod smart_url;
mod snapshot;
mod storage;
mod tab_data;
pub mod ui;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export core domain functions for JavaScript access
#[wasm_bindgen]
pub fn domain_label(url: &str) -> String {
    domain::domain_label(url)
}

// Register the service worker's listeners
#[wasm_bindgen]
pub fn start_background() {
    chrome::run_background();
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
