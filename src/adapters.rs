//! Site adapters
//!
//! One module per site protocol, all implementing [`SiteAdapter`]. The
//! registry decides which protocol serves which (locality, region); the
//! factory turns a registry entry into an adapter instance.

pub mod contract;
pub mod cpt_portal;
pub mod error;
pub mod factory;
pub mod gcs_portal;
pub mod hennepin;
pub mod lake_county;
pub mod patriot;
pub mod registry;
pub mod spokane;

pub use contract::{ScrapeContext, SiteAdapter};
pub use error::{AdapterError, ScrapeError};
pub use factory::{AdapterFactory, SiteAdapterFactory};
pub use registry::{AdapterRegistry, AdapterVariant, RegistryEntry, RegistryError};
