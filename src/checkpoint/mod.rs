pub mod schema;
pub mod store;

pub use schema::{no_progress, ComponentCheckpoint, FileCheckpoint, CHECKPOINT_VERSION};
pub use store::{CheckpointError, CheckpointStore};
