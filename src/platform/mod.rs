//! Edge platform integration.
//!
//! This module contains the capability traits the deploy pipeline is written
//! against, the REST client that implements them, and the static uploader.

mod client;
mod resources;
mod traits;
mod types;
mod uploader;

pub use client::PlatformClient;
pub use traits::{
    ApplicationClient, BucketClient, DomainClient, FunctionClient, OriginClient,
    RulesEngineClient, StaticUploader,
};
#[cfg(test)]
pub use traits::{
    MockApplicationClient, MockBucketClient, MockDomainClient, MockFunctionClient,
    MockOriginClient, MockRulesEngineClient, MockStaticUploader,
};
pub use types::*;
pub use uploader::{StorageUploader, UPLOAD_CONCURRENCY};

use crate::error::Result;
use crate::settings::PlatformSettings;

/// One client per resource kind, as used by a deploy run.
pub struct Clients {
    /// Application client.
    pub application: Box<dyn ApplicationClient>,
    /// Origin client.
    pub origin: Box<dyn OriginClient>,
    /// Bucket client.
    pub bucket: Box<dyn BucketClient>,
    /// Function client.
    pub function: Box<dyn FunctionClient>,
    /// Domain client.
    pub domain: Box<dyn DomainClient>,
    /// Rules engine client.
    pub rules_engine: Box<dyn RulesEngineClient>,
    /// Static asset uploader.
    pub uploader: Box<dyn StaticUploader>,
}

impl Clients {
    /// Builds every client on top of one shared REST client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_settings(settings: &PlatformSettings) -> Result<Self> {
        Ok(Self::from_platform(&PlatformClient::new(settings)?))
    }

    /// Builds every client from an existing REST client.
    #[must_use]
    pub fn from_platform(client: &PlatformClient) -> Self {
        Self {
            application: Box::new(client.clone()),
            origin: Box::new(client.clone()),
            bucket: Box::new(client.clone()),
            function: Box::new(client.clone()),
            domain: Box::new(client.clone()),
            rules_engine: Box::new(client.clone()),
            uploader: Box::new(StorageUploader::new(client.clone())),
        }
    }
}

impl std::fmt::Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients").finish_non_exhaustive()
    }
}
