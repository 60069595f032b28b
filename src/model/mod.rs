pub mod component;
pub mod group;
pub mod identity;
pub mod log_file;

pub use component::ComponentLogConfiguration;
pub use group::{InvalidLogGroupError, LogFileGroup};
pub use identity::FileIdentity;
pub use log_file::{FileAccessError, LogFile, MIN_READABLE_FILE_SIZE};
