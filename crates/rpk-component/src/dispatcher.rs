//! Component dispatch
//!
//! Provides the [`Dispatcher`] trait and [`ComponentRegistry`], a static
//! dispatcher that picks the first registered component whose targets the
//! resource's tags satisfy.

use crate::component::{applies_to, Packer, Unpacker};
use rpk_resource::TagSet;
use std::sync::Arc;

/// Selects components for a resource by its tags
pub trait Dispatcher: Send + Sync {
    /// Unpacker to run on a resource tagged `tags`
    fn unpacker_for(&self, tags: &TagSet) -> Option<Arc<dyn Unpacker>>;

    /// Packer to run on a resource tagged `tags`
    fn packer_for(&self, tags: &TagSet) -> Option<Arc<dyn Packer>>;
}

/// Registry of components in registration order
#[derive(Default, Clone)]
pub struct ComponentRegistry {
    unpackers: Vec<Arc<dyn Unpacker>>,
    packers: Vec<Arc<dyn Packer>>,
}

impl ComponentRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unpacker
    pub fn register_unpacker(&mut self, unpacker: Arc<dyn Unpacker>) {
        self.unpackers.push(unpacker);
    }

    /// Register a packer
    pub fn register_packer(&mut self, packer: Arc<dyn Packer>) {
        self.packers.push(packer);
    }

    /// With an additional unpacker
    #[must_use]
    pub fn with_unpacker(mut self, unpacker: Arc<dyn Unpacker>) -> Self {
        self.register_unpacker(unpacker);
        self
    }

    /// With an additional packer
    #[must_use]
    pub fn with_packer(mut self, packer: Arc<dyn Packer>) -> Self {
        self.register_packer(packer);
        self
    }

    /// Ids of every unpacker applicable to `tags`, in registration order
    #[must_use]
    pub fn unpackers_for(&self, tags: &TagSet) -> Vec<&'static str> {
        self.unpackers
            .iter()
            .filter(|u| applies_to(u.targets(), tags))
            .map(|u| u.id())
            .collect()
    }

    /// Ids of every packer applicable to `tags`, in registration order
    #[must_use]
    pub fn packers_for(&self, tags: &TagSet) -> Vec<&'static str> {
        self.packers
            .iter()
            .filter(|p| applies_to(p.targets(), tags))
            .map(|p| p.id())
            .collect()
    }

    /// Number of registered components
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.unpackers.len() + self.packers.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unpackers.is_empty() && self.packers.is_empty()
    }
}

impl Dispatcher for ComponentRegistry {
    fn unpacker_for(&self, tags: &TagSet) -> Option<Arc<dyn Unpacker>> {
        let mut matching = self.unpackers.iter().filter(|u| applies_to(u.targets(), tags));
        let first = matching.next().cloned();
        if let (Some(chosen), Some(_)) = (&first, matching.next()) {
            tracing::debug!("Several unpackers match {}; using {}", tags, chosen.id());
        }
        first
    }

    fn packer_for(&self, tags: &TagSet) -> Option<Arc<dyn Packer>> {
        let mut matching = self.packers.iter().filter(|p| applies_to(p.targets(), tags));
        let first = matching.next().cloned();
        if let (Some(chosen), Some(_)) = (&first, matching.next()) {
            tracing::debug!("Several packers match {}; using {}", tags, chosen.id());
        }
        first
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unpackers: Vec<_> = self.unpackers.iter().map(|u| u.id()).collect();
        let packers: Vec<_> = self.packers.iter().map(|p| p.id()).collect();
        f.debug_struct("ComponentRegistry")
            .field("unpackers", &unpackers)
            .field("packers", &packers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ComponentContext;
    use crate::error::ComponentError;
    use async_trait::async_trait;
    use rpk_resource::{ResourceTag, GENERIC_BINARY};

    const IMAGE: ResourceTag = ResourceTag::new("Image", &[GENERIC_BINARY]);
    const BOOT_IMAGE: ResourceTag = ResourceTag::new("BootImage", &[IMAGE]);

    struct Named(&'static str, &'static [ResourceTag]);

    #[async_trait]
    impl Unpacker for Named {
        fn id(&self) -> &'static str {
            self.0
        }

        fn targets(&self) -> &[ResourceTag] {
            self.1
        }

        fn children(&self) -> &[ResourceTag] {
            &[]
        }

        async fn unpack(&self, _ctx: &mut ComponentContext) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    #[test]
    fn registry_new_empty() {
        let registry = ComponentRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.unpacker_for(&TagSet::from([IMAGE])).is_none());
    }

    #[test]
    fn registry_first_registered_match_wins() {
        let registry = ComponentRegistry::new()
            .with_unpacker(Arc::new(Named("Generic", &[IMAGE])))
            .with_unpacker(Arc::new(Named("Boot", &[BOOT_IMAGE])));

        let tags = TagSet::from([BOOT_IMAGE]);
        assert_eq!(registry.unpackers_for(&tags), vec!["Generic", "Boot"]);
        assert_eq!(registry.unpacker_for(&tags).unwrap().id(), "Generic");
        assert_eq!(registry.unpackers_for(&TagSet::from([IMAGE])), vec!["Generic"]);
    }

    #[test]
    fn registry_no_match_for_base_tag() {
        let registry = ComponentRegistry::new().with_unpacker(Arc::new(Named("Boot", &[BOOT_IMAGE])));
        assert!(registry.unpacker_for(&TagSet::from([IMAGE])).is_none());
        assert!(registry.packer_for(&TagSet::from([BOOT_IMAGE])).is_none());
        assert_eq!(registry.len(), 1);
    }
}
