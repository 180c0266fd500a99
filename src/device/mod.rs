//! Device-side collaborators: the location provider and the local key-value store.

pub mod credentials;
pub mod location;
pub mod store;

pub use credentials::CredentialStore;
pub use location::{LocationProvider, ReportedLocation};
pub use store::{FileStore, KeyValueStore, MemoryStore};
