//! Per-world settings.

/// Configuration consumed by [`World::with_config`](crate::World::with_config).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldConfig {
    /// Whether [`World::tick`](crate::World::tick) reclaims pending-destroy
    /// entities before ticking systems.
    pub auto_cleanup: bool,
    /// Initial capacity reserved for the entity list.
    pub entity_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            auto_cleanup: true,
            entity_capacity: 0,
        }
    }
}

impl WorldConfig {
    /// A configuration where the host calls [`World::cleanup`](crate::World::cleanup) itself.
    #[must_use]
    pub fn manual_cleanup() -> Self {
        Self {
            auto_cleanup: false,
            ..Self::default()
        }
    }

    /// Sets whether ticking runs cleanup first.
    #[must_use]
    pub fn with_auto_cleanup(mut self, enabled: bool) -> Self {
        self.auto_cleanup = enabled;
        self
    }

    /// Sets the initial entity capacity.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }
}
