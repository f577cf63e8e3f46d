//! Command Handlers 实现

mod ingest_handlers;
mod lifecycle;
mod segmentation_handlers;
mod synthesis_handlers;
mod voice_map_handlers;

#[cfg(test)]
pub(crate) mod test_support;

pub use ingest_handlers::*;
pub use segmentation_handlers::*;
pub use synthesis_handlers::*;
pub use voice_map_handlers::*;
