//! Playlist enumeration: walks the music directory and builds the catalog.

mod model;
mod scan;

pub use model::{Codec, Track};
pub use scan::scan;
