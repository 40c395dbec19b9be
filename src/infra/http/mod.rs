mod middleware;
mod multipart;
mod pages;
mod recovery;

pub use pages::{HttpState, build_router};
pub use recovery::recovery_layer;
