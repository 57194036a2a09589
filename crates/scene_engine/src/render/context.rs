//! Graphics context abstraction
//!
//! A graphics context exposes the backend's named integer constants, the
//! way a WebGL rendering context exposes `gl.ALWAYS` or `gl.KEEP`.

use std::collections::HashMap;

/// Source of backend enum values, looked up by constant name
pub trait GraphicsContext {
    /// Look up a named constant such as `"ALWAYS"` or `"INCR_WRAP"`
    fn constant(&self, name: &str) -> Option<u32>;

    /// Human-readable backend name for diagnostics
    fn backend_name(&self) -> &str {
        "graphics context"
    }
}

/// Constant table with the WebGL 1.0 values used by stencil state
#[derive(Debug, Clone)]
pub struct WebGlConstants {
    constants: HashMap<&'static str, u32>,
}

impl WebGlConstants {
    const TABLE: [(&'static str, u32); 18] = [
        // Comparison functions
        ("NEVER", 0x0200),
        ("LESS", 0x0201),
        ("EQUAL", 0x0202),
        ("LEQUAL", 0x0203),
        ("GREATER", 0x0204),
        ("NOTEQUAL", 0x0205),
        ("GEQUAL", 0x0206),
        ("ALWAYS", 0x0207),
        // Stencil operations
        ("ZERO", 0x0000),
        ("KEEP", 0x1E00),
        ("REPLACE", 0x1E01),
        ("INCR", 0x1E02),
        ("DECR", 0x1E03),
        ("INVERT", 0x150A),
        ("INCR_WRAP", 0x8507),
        ("DECR_WRAP", 0x8508),
        // Capabilities and clear bits
        ("STENCIL_TEST", 0x0B90),
        ("STENCIL_BUFFER_BIT", 0x0400),
    ];

    /// Create the constant table
    pub fn new() -> Self {
        Self {
            constants: Self::TABLE.into_iter().collect(),
        }
    }

    /// Remove a constant, simulating a backend that lacks it
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.constants.remove(name);
        self
    }
}

impl Default for WebGlConstants {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsContext for WebGlConstants {
    fn constant(&self, name: &str) -> Option<u32> {
        self.constants.get(name).copied()
    }

    fn backend_name(&self) -> &str {
        "webgl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let gl = WebGlConstants::new();
        assert_eq!(gl.constant("ALWAYS"), Some(0x0207));
        assert_eq!(gl.constant("ZERO"), Some(0));
        assert_eq!(gl.constant("always"), None);
    }

    #[test]
    fn test_without() {
        let gl = WebGlConstants::new().without("INVERT");
        assert_eq!(gl.constant("INVERT"), None);
        assert_eq!(gl.constant("KEEP"), Some(0x1E00));
    }
}
