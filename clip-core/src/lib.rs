pub mod config;
pub mod error;
pub mod error_utils;
pub mod link;
pub mod log_channels;
pub mod retry;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use link::{clip_reference_for, find_clip_reference};
pub use retry::*;
pub use traits::*;
pub use types::*;
