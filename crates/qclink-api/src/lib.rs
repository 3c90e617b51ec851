// qclink-api: async clients for the QuickConnect broker and the DSM Web API

pub mod appliance;
pub mod broker;
pub mod error;
pub mod transport;

pub use appliance::{ApplianceClient, DOWNLOAD_STATION_SESSION};
pub use broker::{BrokerClient, DiscoveryError, HostFailure, MappedAddress, ServerDescriptor};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
