pub mod code;
pub mod error;
pub mod json;
pub mod record;

pub use code::{REPLAY_CODE_LEN, ReplayCode};
pub use error::{ReplayError, Result};
pub use record::ReplayRecord;
