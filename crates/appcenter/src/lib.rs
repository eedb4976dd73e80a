//! Visual Studio App Center release distribution
//!
//! Publishes a mobile binary to App Center and distributes the resulting
//! release.
//!
//! ## Publishing
//!
//! The binary is uploaded through App Center's chunked upload protocol: an
//! upload slot is requested, the file is split into the chunk size the upload
//! service asks for, all chunks are sent in parallel, and the upload is
//! committed. The release only exists once server-side processing is done, so
//! the publisher polls the upload until it is `readyToBePublished`.
//!
//! ## Distribution
//!
//! Once a release id is known it can be attached to distribution groups,
//! stores and individual testers, get release notes and a symbol file.
//! [`pipeline::deploy`] runs the whole sequence.
//!
//! ## Usage
//!
//! ```ignore
//! use appcenter::{App, AppCenterClient, ClientConfig, ReleaseOptions};
//!
//! let client = AppCenterClient::new(ClientConfig::new(token))?;
//! let app = App::new("acme", "field-service");
//!
//! let mut options = ReleaseOptions::new(app.clone(), "build/app-release.apk");
//! options.group_names = vec!["QA".to_string()];
//!
//! let outcome = appcenter::pipeline::deploy(&client.app(app.clone()), &options, |_| {}).await?;
//! println!("{:?}", outcome.outputs(&app));
//! ```

pub mod app;
pub mod client;
mod endpoints;
pub mod error;
pub mod file;
pub mod pipeline;
pub mod publish;
pub mod release;
pub mod transport;
pub mod types;
pub mod upload;

pub use app::{AppClient, PublishedRelease};
pub use client::{AppCenterClient, ClientConfig};
pub use endpoints::DEFAULT_API_URL;
pub use error::{AppCenterError, Result};
pub use pipeline::{deploy, DeployOutcome, DeployStep};
pub use publish::{PollPolicy, PublishStage, ReadyRelease, ReleasePublisher};
pub use release::ReleaseClient;
pub use transport::RetryPolicy;
pub use types::*;
