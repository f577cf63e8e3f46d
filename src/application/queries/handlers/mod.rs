//! Query Handlers 实现

mod book_handlers;
mod package_handlers;
mod stream_handlers;

pub use book_handlers::*;
pub use package_handlers::*;
pub use stream_handlers::*;
