//! Storage pool configuration

use crate::error::{Result, VellumError};
use crate::storage::max_safe_allocation;

/// Configuration for storage pools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Name used in log output
    pub name: String,
    /// Size of every pooled region in bytes
    pub region_size: usize,
    /// Maximum number of regions, 0 for unbounded
    pub capacity: usize,
    /// Whether regions may exceed the safe allocation ceiling
    pub allow_exceeding_limit: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            region_size: 4096,
            capacity: 0,
            allow_exceeding_limit: false,
        }
    }
}

impl PoolConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_region_size(mut self, size: usize) -> Self {
        self.region_size = size;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_allow_exceeding_limit(mut self, allow: bool) -> Self {
        self.allow_exceeding_limit = allow;
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.capacity != 0
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.region_size == 0 {
            return Err(VellumError::invalid_parameter(
                "region_size",
                "Region size cannot be zero",
            ));
        }

        let limit = max_safe_allocation();
        if self.region_size > limit && !self.allow_exceeding_limit {
            return Err(VellumError::allocation_limit(self.region_size, limit));
        }

        if self.is_bounded() && self.region_size.checked_mul(self.capacity).is_none() {
            return Err(VellumError::invalid_parameter(
                "capacity",
                "Pool footprint overflows usize",
            ));
        }

        Ok(())
    }

    /// Bytes held once every slot is allocated, if the pool is bounded
    pub fn max_footprint(&self) -> Option<usize> {
        self.is_bounded().then(|| self.region_size * self.capacity)
    }
}

/// Builder pattern for pool configuration
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: PoolConfig::new(name),
        }
    }

    pub fn region_size(mut self, size: usize) -> Self {
        self.config.region_size = size;
        self
    }

    /// Maximum number of regions; 0 removes the bound
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.config.capacity = 0;
        self
    }

    pub fn allow_exceeding_limit(mut self, allow: bool) -> Self {
        self.config.allow_exceeding_limit = allow;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PoolConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_validates() {
        let config = PoolConfigBuilder::new("test")
            .region_size(1024)
            .capacity(4)
            .build()
            .unwrap();
        assert_eq!(config.max_footprint(), Some(4096));

        assert!(PoolConfigBuilder::new("zero").region_size(0).build().is_err());
        assert!(matches!(
            PoolConfigBuilder::new("huge")
                .region_size(max_safe_allocation() + 1)
                .build(),
            Err(VellumError::AllocationLimit { .. })
        ));
    }

    #[test]
    fn test_unbounded_has_no_footprint() {
        let config = PoolConfig::new("open").with_capacity(3).with_region_size(8);
        assert!(config.is_bounded());
        let config = PoolConfigBuilder::new("open").capacity(3).unbounded().build().unwrap();
        assert_eq!(config.max_footprint(), None);
    }
}
