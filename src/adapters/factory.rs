//! Builds adapter instances from registry entries

use url::Url;

use super::contract::SiteAdapter;
use super::cpt_portal::CptPortalAdapter;
use super::error::AdapterError;
use super::gcs_portal::GcsPortalAdapter;
use super::hennepin::HennepinAdapter;
use super::lake_county::LakeCountyAdapter;
use super::patriot::PatriotAdapter;
use super::registry::{AdapterVariant, RegistryEntry};
use super::spokane::SpokaneAdapter;

/// Turns a registry entry into a ready-to-run adapter.
pub trait AdapterFactory: Send + Sync {
    fn build(&self, entry: &RegistryEntry) -> Result<Box<dyn SiteAdapter>, AdapterError>;
}

/// Factory for the site adapters shipped with this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SiteAdapterFactory;

impl SiteAdapterFactory {
    fn base_url(entry: &RegistryEntry) -> Result<Url, AdapterError> {
        match entry.parsed_base_url() {
            Some(Ok(url)) => Ok(url),
            Some(Err(e)) => Err(AdapterError::configuration(format!(
                "{}: invalid base_url: {}",
                entry.adapter_name(),
                e
            ))),
            None => Err(AdapterError::configuration(format!(
                "{}: base_url is required",
                entry.adapter_name()
            ))),
        }
    }
}

impl AdapterFactory for SiteAdapterFactory {
    fn build(&self, entry: &RegistryEntry) -> Result<Box<dyn SiteAdapter>, AdapterError> {
        let name = entry.adapter_name();
        let adapter: Box<dyn SiteAdapter> = match entry.variant {
            AdapterVariant::GcsPortal => Box::new(GcsPortalAdapter::new(name, Self::base_url(entry)?)),
            AdapterVariant::Hennepin => Box::new(HennepinAdapter::new(name, entry.base_url.clone())),
            AdapterVariant::Spokane => Box::new(SpokaneAdapter::new(name, entry.base_url.clone())),
            AdapterVariant::LakeCounty => Box::new(LakeCountyAdapter::new(name, entry.base_url.clone())),
            AdapterVariant::Patriot => Box::new(PatriotAdapter::new(name, Self::base_url(entry)?)),
            AdapterVariant::CptPortal => Box::new(CptPortalAdapter::new(name, Self::base_url(entry)?)),
        };
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_named_adapter_for_each_builtin_entry() {
        let registry = super::super::AdapterRegistry::builtin().unwrap();
        for entry in registry.entries() {
            let adapter = SiteAdapterFactory.build(entry).unwrap();
            assert_eq!(adapter.name(), entry.adapter_name());
        }
    }

    #[test]
    fn test_parameterised_variant_without_url_is_rejected() {
        let entry = RegistryEntry::new("Somewhere", "MA", AdapterVariant::Patriot);
        let err = SiteAdapterFactory.build(&entry).err().unwrap();
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }
}
