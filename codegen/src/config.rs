//! Mapping configuration.
//!
//! Provides typed configuration with bon builders and environment variable fallbacks.

use bon::bon;

/// Naming and access-pattern knobs for one mapping pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingConfig {
    /// Prefix of generated object identifiers (`obj` gives `obj0`, `obj1`, ...).
    pub name_prefix: String,
    /// Prefix of loop induction variables (`sforidx` gives `sforidx0`, ...).
    pub induction_prefix: String,
    /// Emit the unit-stride access path for buffers whose innermost stride is 1.
    pub contiguous_loads: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self { name_prefix: "obj".to_string(), induction_prefix: "sforidx".to_string(), contiguous_loads: true }
    }
}

#[bon]
impl MappingConfig {
    /// Create a mapping configuration with builder pattern.
    #[builder]
    pub fn new(
        #[builder(into, default = "obj".to_string())] name_prefix: String,
        #[builder(into, default = "sforidx".to_string())] induction_prefix: String,
        #[builder(default = true)] contiguous_loads: bool,
    ) -> Self {
        Self { name_prefix, induction_prefix, contiguous_loads }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `KERNMAP_NAME_PREFIX` - Generated identifier prefix (default: `obj`)
    /// * `KERNMAP_INDUCTION_PREFIX` - Loop variable prefix (default: `sforidx`)
    /// * `KERNMAP_FORCE_STRIDED` - Always use the strided access path if set
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from any key lookup, with the same rules as [`Self::from_env`].
    ///
    /// Empty prefixes fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let name_prefix = lookup("KERNMAP_NAME_PREFIX").filter(|s| !s.is_empty());
        let induction_prefix = lookup("KERNMAP_INDUCTION_PREFIX").filter(|s| !s.is_empty());
        let contiguous_loads = lookup("KERNMAP_FORCE_STRIDED").is_none();

        Self {
            name_prefix: name_prefix.unwrap_or(defaults.name_prefix),
            induction_prefix: induction_prefix.unwrap_or(defaults.induction_prefix),
            contiguous_loads,
        }
    }
}
