pub mod client;
pub mod models;

pub use client::{
    BrokerClient, DEFAULT_BROKER_URL, DEFAULT_REQUEST_TAG, DiscoveryError, HostFailure,
};
pub use models::{MappedAddress, ServerDescriptor};
