pub mod github;
pub mod signing;
pub mod transport;

pub use github::{AppClaims, AppCredentials, InstallationToken};
pub use signing::AppJwtSigner;
pub use transport::{InstallationTransport, TransportOptions, DEFAULT_API_BASE_URL};
