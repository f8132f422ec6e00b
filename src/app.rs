//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the catalog, the latest
//! engine status snapshot and the browsing cursor.

mod model;

pub use model::*;
