//! # cvsync-clients
//!
//! HTTP clients for the two systems the reconciler talks to:
//! [`MetaClient`] implements [`cvsync_sync::SourceDirectory`] and [`CvClient`]
//! implements [`cvsync_sync::TargetDirectory`].

pub mod cv;
pub mod error;
pub mod meta;

pub use cv::CvClient;
pub use error::ClientError;
pub use meta::MetaClient;
