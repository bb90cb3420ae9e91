/// UI module exports
pub mod components;
pub mod popup;

pub use popup::App;
