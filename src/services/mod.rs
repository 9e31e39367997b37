//! Data acquisition and streaming services.

pub mod fetcher;
pub mod market_data;
pub mod session;

pub use fetcher::{RetryConfig, RetryingFetcher};
pub use market_data::{BarSource, FetchError, SyntheticBarSource};
pub use session::{
    BroadcastClosed, Broadcaster, SessionConfig, SessionError, SessionRequest, SessionState,
    StreamingSession, ValidationError,
};
