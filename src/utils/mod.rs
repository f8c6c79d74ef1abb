pub mod cancel;
pub mod retry;
pub mod time;

pub use cancel::CancelFlag;
pub use retry::retry_with_backoff;
pub use time::sleep_with_jitter;
