pub mod lookup;
pub mod models;

pub use lookup::SceneMatch;
pub use models::{Scene, SceneDatabase, SceneTypeConfig, VideoEntry};
