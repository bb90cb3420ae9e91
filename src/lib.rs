/// MinMaxer - soft-reserve intelligence for softres.it raid pages
/// Built with Rust + WASM + Yew
///
/// One WASM binary serves all three extension contexts; each HTML entry
/// point calls its own start function after the module loads.

mod analyzer;
mod background;
mod competition;
mod extract;
mod messages;
mod raids;
mod snapshot;
mod storage;
pub mod ui;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    log::info!("starting popup");
    yew::Renderer::<ui::App>::new().render();
}

// Start the page analyzer in the content script context
#[wasm_bindgen]
pub fn start_analyzer() {
    log::info!("starting page analyzer");
    if let Err(e) = analyzer::start() {
        log::error!("failed to start analyzer: {e:?}");
    }
}

// Start the coordinator in the background service worker
#[wasm_bindgen]
pub fn start_background() {
    log::info!("starting background worker");
    background::start();
}
