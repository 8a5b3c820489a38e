//! CLI configuration loading and resolution.
//!
//! Supports profile-based configuration from `~/.keyprop/config.huml` with
//! priority order: CLI flags > environment variables > config file > defaults.

use anyhow::{bail, Context, Result};
use keyprop_core::models::KeystorePolicy;
use keyprop_core::project::FlutterProject;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// CLI configuration loaded from config.huml file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    /// Name of the default profile to use.
    pub default_profile: String,
    /// Map of profile name to profile configuration.
    pub profiles: HashMap<String, Profile>,
}

/// A named profile pointing at a Flutter project.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Flutter project root (e.g., "~/src/my_app").
    pub project: String,
    /// Properties file, if not `<project>/android/key.properties`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<String>,
    /// Keystore policy: "require", "warn" or "ignore".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

/// Resolved configuration after applying priority rules.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub project: FlutterProject,
    /// Properties file to resolve the signing identity from.
    pub properties: PathBuf,
    pub policy: KeystorePolicy,
}

impl Default for CliConfig {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            "default".to_string(),
            Profile {
                project: ".".to_string(),
                properties: None,
                policy: None,
            },
        );
        Self {
            default_profile: "default".to_string(),
            profiles,
        }
    }
}

/// Returns the default config file path (~/.keyprop/config.huml).
pub fn default_config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(".keyprop/config.huml"))
        .context("Could not determine home directory")
}

/// Returns the config file path, honoring `KEYPROP_CONFIG`.
pub fn config_path() -> Result<PathBuf> {
    match std::env::var("KEYPROP_CONFIG") {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => default_config_path(),
    }
}

/// Load configuration from the config file.
///
/// Returns `Ok(None)` if the config file doesn't exist.
/// Returns an error if the file exists but is invalid.
pub fn load_config() -> Result<Option<CliConfig>> {
    let path = config_path()?;

    if !path.exists() {
        return Ok(None);
    }

    let content =
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    let config: CliConfig = huml_rs::serde::from_str(&content)
        .with_context(|| format!("Invalid HUML in {}", path.display()))?;

    validate_config(&config)?;

    Ok(Some(config))
}

/// Validate that the default profile exists and every profile is usable.
pub(crate) fn validate_config(config: &CliConfig) -> Result<()> {
    if config.profiles.is_empty() {
        bail!("Config file must contain at least one profile");
    }

    if !config.profiles.contains_key(&config.default_profile) {
        bail!(
            "Default profile '{}' not found in profiles",
            config.default_profile
        );
    }

    for (name, profile) in &config.profiles {
        validate_profile_name(name)?;
        if profile.project.is_empty() {
            bail!("Profile '{}' has an empty project path", name);
        }
        if let Some(policy) = &profile.policy {
            parse_policy(policy).with_context(|| format!("Profile '{}'", name))?;
        }
    }

    Ok(())
}

/// Profile names are written as bare HUML keys, so they must be identifiers.
pub(crate) fn validate_profile_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        bail!(
            "Invalid profile name '{}': use letters, digits, '_' or '-', starting with a letter",
            name
        );
    }
    Ok(())
}

fn parse_policy(value: &str) -> Result<KeystorePolicy> {
    value.parse::<KeystorePolicy>().map_err(anyhow::Error::msg)
}

/// Resolve configuration by applying priority rules.
///
/// Priority order (highest to lowest):
/// 1. CLI flags (`--project`, `--properties`, `--policy`)
/// 2. Environment variables (`KEYPROP_PROJECT`, `KEYPROP_PROPERTIES`, `KEYPROP_POLICY`)
/// 3. Config file profile
/// 4. Defaults (current directory, `android/key.properties`, `require`)
pub fn resolve_config(
    profile_flag: Option<&str>,
    project_flag: Option<&str>,
    properties_flag: Option<&str>,
    policy_flag: Option<&str>,
    file_config: Option<CliConfig>,
) -> Result<ResolvedConfig> {
    let mut project = ".".to_string();
    let mut properties: Option<String> = None;
    let mut policy: Option<String> = None;

    // Apply config file (lowest priority)
    if let Some(config) = file_config {
        let profile_name = profile_flag.unwrap_or(&config.default_profile);
        if let Some(profile) = config.profiles.get(profile_name) {
            project = profile.project.clone();
            properties = profile.properties.clone();
            policy = profile.policy.clone();
        } else if profile_flag.is_some() {
            bail!(
                "Profile '{}' not found. Run 'keyprop config profiles' to see available profiles.",
                profile_name
            );
        }
    } else if let Some(requested_profile) = profile_flag {
        if requested_profile != "default" {
            bail!(
                "Profile '{}' not found. No config file exists. Run 'keyprop config init' to create one.",
                requested_profile
            );
        }
    }

    // Apply environment variables (medium priority)
    if let Ok(env_project) = std::env::var("KEYPROP_PROJECT") {
        project = env_project;
    }
    if let Ok(env_properties) = std::env::var("KEYPROP_PROPERTIES") {
        properties = Some(env_properties);
    }
    if let Ok(env_policy) = std::env::var("KEYPROP_POLICY") {
        policy = Some(env_policy);
    }

    // Apply CLI flags (highest priority)
    if let Some(p) = project_flag {
        project = p.to_string();
    }
    if let Some(p) = properties_flag {
        properties = Some(p.to_string());
    }
    if let Some(p) = policy_flag {
        policy = Some(p.to_string());
    }

    let project = FlutterProject::new(expand_home(&project));
    let properties = properties
        .map(|p| expand_home(&p))
        .unwrap_or_else(|| project.key_properties_path());
    let policy = match policy {
        Some(p) => parse_policy(&p)?,
        None => KeystorePolicy::default(),
    };

    Ok(ResolvedConfig {
        project,
        properties,
        policy,
    })
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
