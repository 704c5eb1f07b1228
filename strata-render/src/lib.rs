//! The model query rendering pipeline (§4.3): template/macro expansion,
//! normalize & quote, schema-aware optimization, table resolution, and the
//! incremental filter wrapper — cached two levels deep.

pub mod cache;
pub mod canonical;
pub mod dates;
pub mod optimize;
pub mod renderer;
pub mod resolve;
pub mod template;

pub use cache::RenderCache;
pub use renderer::{RenderRequest, Renderer};
