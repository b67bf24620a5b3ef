//! Backend API adapters.
//!
//! - `BackendApiClient` - reqwest client for the Fluently backend
//! - `MockBackend` - scripted stand-in for tests and local runs

mod api_client;
mod mock;

pub use api_client::{BackendApiClient, BackendClientConfig};
pub use mock::{MockBackend, PreferenceUpdate};
