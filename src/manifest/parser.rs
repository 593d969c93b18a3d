//! Manifest discovery and parsing.
//!
//! The loader looks for the manifest in a fixed list of project-relative
//! locations and parses it strictly: missing required fields, malformed
//! structure and unknown keys are all parse errors.

use crate::error::{EdgeDeployError, ManifestError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::schema::Manifest;

/// Manifest locations relative to the project directory, in lookup order.
pub const DEFAULT_MANIFEST_FILES: &[&str] = &[
    ".edge/manifest.json",
    "edge.manifest.json",
    "edge.manifest.yaml",
    "edge.manifest.yml",
];

/// On-disk manifest formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl ManifestFormat {
    /// Picks the format from a file extension; anything but `.json` is YAML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Locates and parses the project manifest.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    /// Project root the candidate locations are resolved against.
    project_dir: PathBuf,
}

impl ManifestLoader {
    /// Creates a loader rooted at the given project directory.
    #[must_use]
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    /// Returns the project directory.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Finds the first existing manifest candidate.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::FileNotFound` naming the preferred location if
    /// no candidate exists.
    pub fn locate(&self) -> Result<PathBuf> {
        for candidate in DEFAULT_MANIFEST_FILES {
            let path = self.project_dir.join(candidate);
            if path.is_file() {
                info!("Found manifest: {}", path.display());
                return Ok(path);
            }
        }

        Err(EdgeDeployError::Manifest(ManifestError::FileNotFound {
            path: self.project_dir.join(DEFAULT_MANIFEST_FILES[0]),
        }))
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or malformed.
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let path = path.as_ref();
        info!("Loading manifest from: {}", path.display());

        if !path.exists() {
            return Err(EdgeDeployError::Manifest(ManifestError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ManifestError::parse(
                format!("Failed to read file: {e}"),
                Some(path.display().to_string()),
            )
        })?;

        Self::parse_str(&content, ManifestFormat::from_path(path), Some(path))
    }

    /// Locates and parses the manifest in one go.
    ///
    /// # Errors
    ///
    /// Returns an error if no manifest exists or it cannot be parsed.
    pub fn load(&self) -> Result<Manifest> {
        let path = self.locate()?;
        self.parse(path)
    }

    /// Parses manifest content in the given format.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the content is malformed.
    pub fn parse_str(
        content: &str,
        format: ManifestFormat,
        source: Option<&Path>,
    ) -> Result<Manifest> {
        let location = source.map(|p| p.display().to_string());

        let manifest: Manifest = match format {
            ManifestFormat::Json => {
                debug!("Parsing JSON manifest");
                serde_json::from_str(content).map_err(|e| {
                    ManifestError::parse(format!("JSON parse error: {e}"), location)
                })?
            }
            ManifestFormat::Yaml => {
                debug!("Parsing YAML manifest");
                // An empty YAML document is an empty manifest, not an error.
                if content.trim().is_empty() {
                    Manifest::default()
                } else {
                    serde_yaml::from_str(content).map_err(|e| {
                        ManifestError::parse(format!("YAML parse error: {e}"), location)
                    })?
                }
            }
        };

        debug!(
            "Parsed manifest with {} declarations",
            manifest.resource_count()
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::schema::{OriginType, RulePhase};
    use tempfile::TempDir;

    #[test]
    fn test_parse_json_manifest() {
        let json = r#"{
            "applications": [{"name": "shop"}],
            "origins": [{"name": "backend", "addresses": ["api.shop.example"]}],
            "rules": [{
                "name": "api",
                "criteria": [[{"variable": "${uri}", "operator": "starts_with", "conditional": "if", "input_value": "/api"}]],
                "behaviors": [{"name": "set_origin", "target": "backend"}]
            }]
        }"#;

        let manifest = ManifestLoader::parse_str(json, ManifestFormat::Json, None).unwrap();

        assert_eq!(manifest.applications[0].name, "shop");
        assert_eq!(manifest.applications[0].https_port, 443);
        assert_eq!(manifest.origins[0].origin_type, OriginType::SingleOrigin);
        assert_eq!(manifest.origins[0].host_header, "${host}");
        assert_eq!(manifest.rules[0].phase, RulePhase::Request);
        assert!(manifest.rules[0].active);
        assert!(manifest.buckets.is_empty());
    }

    #[test]
    fn test_parse_yaml_manifest() {
        let yaml = r"
buckets:
  - name: shop-assets
    edge_access: read_write
functions:
  - name: handler
    args:
      greeting: hello
domains:
  - name: shop
    cnames: [www.shop.example]
";
        let manifest = ManifestLoader::parse_str(yaml, ManifestFormat::Yaml, None).unwrap();

        assert_eq!(manifest.buckets[0].name, "shop-assets");
        assert_eq!(manifest.functions[0].args["greeting"], "hello");
        assert_eq!(manifest.domains[0].cnames, vec!["www.shop.example"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{"applications": [{"name": "shop", "colour": "blue"}]}"#;
        let result = ManifestLoader::parse_str(json, ManifestFormat::Json, None);

        assert!(matches!(
            result,
            Err(EdgeDeployError::Manifest(ManifestError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let json = r#"{"rules": [{"phase": "request"}]}"#;
        let result = ManifestLoader::parse_str(json, ManifestFormat::Json, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_locate_prefers_edge_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".edge")).unwrap();
        std::fs::write(dir.path().join(".edge/manifest.json"), "{}").unwrap();
        std::fs::write(dir.path().join("edge.manifest.yaml"), "").unwrap();

        let loader = ManifestLoader::new(dir.path());
        let path = loader.locate().unwrap();
        assert!(path.ends_with(".edge/manifest.json"));
        assert_eq!(loader.load().unwrap(), Manifest::default());
    }

    #[test]
    fn test_locate_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let result = ManifestLoader::new(dir.path()).locate();

        assert!(matches!(
            result,
            Err(EdgeDeployError::Manifest(ManifestError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ManifestFormat::from_path(Path::new("a.json")), ManifestFormat::Json);
        assert_eq!(ManifestFormat::from_path(Path::new("a.JSON")), ManifestFormat::Json);
        assert_eq!(ManifestFormat::from_path(Path::new("a.yml")), ManifestFormat::Yaml);
    }
}
