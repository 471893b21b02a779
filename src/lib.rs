//! Client for the AutoRABIT CI jobs REST API v1.
//!
//! Every operation goes through one gateway: the parameters are validated
//! against a static [`OperationDescriptor`], a single request is sent to
//! `{instance}/api/cijobs/v1/...` and the JSON object in the response is
//! returned as-is.
//!
//! ```no_run
//! use rabit_cijobs::{CiJobsClient, Credentials, PollParams, TriggerParams};
//!
//! # async fn run() -> rabit_cijobs::Result<()> {
//! let credentials = Credentials::new("https://rabit.example.com", "my-token")?;
//! let client = CiJobsClient::new(credentials)?;
//!
//! let triggered = client.trigger(TriggerParams::new("release-job")).await?;
//! let build = rabit_cijobs::status::cycle_number(&triggered).unwrap_or_default();
//! let status = client.poll(PollParams::new("release-job").build(build)).await?;
//! println!("{status:?}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod descriptor;
pub mod error;
pub mod params;
pub mod request;
pub mod status;

pub use auth::{Credentials, Token};
pub use client::{CiJobsClient, JsonObject, DEFAULT_TIMEOUT};
pub use descriptor::{Operation, OperationDescriptor};
pub use error::{RabitError, Result};
pub use params::{
    BuildRange, HistoryParams, OperationParams, Params, PollParams, QuickDeployParams,
    RollbackDetailsParams, RollbackHistoryParams, RollbackManifest, RollbackParams,
    TriggerParams, UpdateParams,
};
pub use request::PreparedRequest;
