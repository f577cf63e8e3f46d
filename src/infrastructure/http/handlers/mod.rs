//! HTTP Handlers

mod books;
mod ping;
mod websocket;

pub use books::*;
pub use ping::*;
pub use websocket::*;
