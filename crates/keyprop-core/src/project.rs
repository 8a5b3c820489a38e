//! Flutter project layout and toolchain metadata.
//!
//! The SDK levels, application id and version numbers belong to the host
//! toolchain. This module only reports the values Flutter hands to Gradle,
//! without validating them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KeypropError, Result};
use crate::properties::Properties;
use crate::signing::KEY_PROPERTIES_FILE;

/// Paths of a Flutter project's Android host project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlutterProject {
    root: PathBuf,
}

impl FlutterProject {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A Flutter project is identified by the presence of `pubspec.yaml`.
    pub fn is_flutter_project(&self) -> bool {
        self.root.join("pubspec.yaml").is_file()
    }

    /// The Gradle root project.
    pub fn android_dir(&self) -> PathBuf {
        self.root.join("android")
    }

    /// The application module; relative `storeFile` values resolve here.
    pub fn app_dir(&self) -> PathBuf {
        self.android_dir().join("app")
    }

    pub fn key_properties_path(&self) -> PathBuf {
        self.android_dir().join(KEY_PROPERTIES_FILE)
    }

    pub fn local_properties_path(&self) -> PathBuf {
        self.android_dir().join("local.properties")
    }

    pub fn pubspec_path(&self) -> PathBuf {
        self.root.join("pubspec.yaml")
    }
}

/// Version and SDK values supplied by the Flutter toolchain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolchainMetadata {
    pub app_name: Option<String>,
    pub flutter_sdk: Option<String>,
    pub version_name: Option<String>,
    pub version_code: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Pubspec {
    name: Option<String>,
    // `version: 1.0` is a YAML number, not a string
    version: Option<serde_yaml::Value>,
}

impl ToolchainMetadata {
    /// Reads `android/local.properties`, falling back to the `version` field
    /// of `pubspec.yaml` for anything it does not set.
    pub fn load(project: &FlutterProject) -> Result<Self> {
        let mut metadata = Self::default();

        if let Some(local) = Properties::load(&project.local_properties_path())? {
            metadata.flutter_sdk = local.get_non_empty("flutter.sdk").map(str::to_string);
            metadata.version_name = local.get_non_empty("flutter.versionName").map(str::to_string);
            metadata.version_code = local
                .get_non_empty("flutter.versionCode")
                .and_then(|code| code.trim().parse().ok());
        }

        if let Some(pubspec) = read_pubspec(&project.pubspec_path())? {
            metadata.app_name = pubspec.name;
            let version = match pubspec.version {
                Some(serde_yaml::Value::String(s)) => Some(s),
                Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            if let Some((name, code)) = version.as_deref().map(split_version) {
                metadata.version_name = metadata.version_name.or(Some(name));
                metadata.version_code = metadata.version_code.or(code);
            }
        }

        Ok(metadata)
    }
}

fn read_pubspec(path: &Path) -> Result<Option<Pubspec>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(KeypropError::ConfigFileUnreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let pubspec = serde_yaml::from_str(&content)
        .map_err(|e| KeypropError::Project(format!("Invalid {}: {}", path.display(), e)))?;
    Ok(Some(pubspec))
}

/// Splits a pubspec version such as `1.2.3+45` into name and build number.
fn split_version(version: &str) -> (String, Option<u32>) {
    match version.split_once('+') {
        Some((name, build)) => (name.trim().to_string(), build.trim().parse().ok()),
        None => (version.trim().to_string(), None),
    }
}
