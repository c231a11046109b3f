//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn output() -> PathBuf {
        "dist".into()
    }

    pub fn routes() -> String {
        "routes.js".into()
    }
}

// ============================================================================
// [source] Section Defaults
// ============================================================================

pub mod source {
    use std::path::PathBuf;

    pub fn dir() -> PathBuf {
        "data".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_defaults() {
        assert!(r#true());
        assert!(!r#false());
    }

    #[test]
    fn test_section_defaults() {
        assert_eq!(build::root(), None);
        assert_eq!(build::output(), std::path::PathBuf::from("dist"));
        assert_eq!(build::routes(), "routes.js");
        assert_eq!(source::dir(), std::path::PathBuf::from("data"));
    }
}
