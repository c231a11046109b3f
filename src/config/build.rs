//! `[build]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in sitegraph.toml - output settings.
///
/// # Example
/// ```toml
/// [build]
/// output = "dist"          # Directory the route manifest is written into
/// routes = "routes.js"     # Manifest file name
/// quiet = false            # Silence log output
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (set from CLI, not config file).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Output directory for generated artifacts.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// File name of the route manifest inside `output`.
    #[serde(default = "defaults::build::routes")]
    #[educe(Default = defaults::build::routes())]
    pub routes: String,

    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub quiet: bool,
}

impl BuildConfig {
    /// Full path of the route manifest.
    pub fn routes_path(&self) -> PathBuf {
        self.output.join(&self.routes)
    }
}

#[cfg(test)]
mod tests {
    use super::super::AppConfig;
    use std::path::PathBuf;

    #[test]
    fn test_build_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert_eq!(config.build.routes, "routes.js");
        assert!(!config.build.quiet);
        assert_eq!(config.build.routes_path(), PathBuf::from("dist/routes.js"));
    }

    #[test]
    fn test_build_custom() {
        let config: AppConfig = toml::from_str(
            r#"
            [build]
            output = "public"
            routes = "router.js"
            quiet = true
        "#,
        )
        .unwrap();
        assert_eq!(config.build.routes_path(), PathBuf::from("public/router.js"));
        assert!(config.build.quiet);
    }

    #[test]
    fn test_build_unknown_field_rejected() {
        let result: Result<AppConfig, _> = toml::from_str(
            r#"
            [build]
            minify = true
        "#,
        );
        assert!(result.is_err());
    }
}
