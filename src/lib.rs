//! # slicedl
//!
//! Resumable, parallel-chunked download of one large HTTP(S) resource into
//! one file.
//!
//! The resource is split into slices, each slice is fetched with its own
//! `Range` request, and every buffer is written at its offset through a
//! single locked file handle. A session can be paused and started again;
//! only the missing tail of each slice is requested.
//!
//! ```no_run
//! use slicedl::{DownloadConfig, DownloadSession};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> slicedl::Result<()> {
//!     let config = DownloadConfig::new("https://example.com/large.zip", "large.zip")?
//!         .with_block_count(8)?;
//!     let session = DownloadSession::create(config).await?;
//!     session.init(slicedl::client::default_client()?)?;
//!     session.start(&CancellationToken::new())?;
//!     session.wait().await?;
//!     assert_eq!(session.download_size(), session.content_length());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod hashing;
pub mod planner;
pub mod probe;
pub mod session;
pub mod slice;
pub mod state;
pub mod utils;
pub mod writer;

mod fetcher;

pub use config::DownloadConfig;
pub use error::{DownloadError, Result, StateError};
pub use fetcher::RequestCustomizer;
pub use session::DownloadSession;
pub use state::{RunState, SessionSnapshot, SliceTask};
