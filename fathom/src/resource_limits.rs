/// Resource limits for the markup adapter
///
/// These protect against hostile documents while staying generous enough for
/// real pages.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Maximum document size in bytes
    /// Real usage: ~100KB, Limit: 5MB (50x)
    pub max_document_bytes: usize,

    /// Maximum element nesting depth
    /// Real usage: ~30 levels, Limit: 256 (8x)
    pub max_nesting_depth: usize,

    /// Maximum size of a selector in bytes
    /// Real usage: ~50 bytes, Limit: 4KB
    pub max_selector_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_document_bytes: 5 * 1024 * 1024, // 5 MB
            max_nesting_depth: 256,
            max_selector_bytes: 4 * 1024, // 4 KB
        }
    }
}

impl ResourceLimits {
    /// Create a new ResourceLimits with default values
    pub fn new() -> Self {
        Self::default()
    }
}
