//! `keyprop config` commands for managing CLI configuration.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::config::{
    config_path, load_config, validate_config, validate_profile_name, CliConfig, Profile,
};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create a new config file with default settings
    Init {
        /// Flutter project root for the default profile
        #[arg(long)]
        project: Option<String>,

        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Set profile values (creates profile if it doesn't exist)
    Set {
        /// Profile name to update (defaults to "default")
        #[arg(long, default_value = "default")]
        profile: String,

        /// Flutter project root
        #[arg(long)]
        project: Option<String>,

        /// Properties file path
        #[arg(long)]
        properties: Option<String>,

        /// Keystore policy (require, warn, ignore)
        #[arg(long)]
        policy: Option<String>,

        /// Set this profile as the default
        #[arg(long)]
        default: bool,
    },

    /// Show current configuration
    Show,

    /// List all available profiles
    Profiles,

    /// Show config file path
    Path,
}

pub fn handle_config_command(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Init { project, force } => init_config(project, force),
        ConfigCommands::Set {
            profile,
            project,
            properties,
            policy,
            default,
        } => set_config(profile, project, properties, policy, default),
        ConfigCommands::Show => show_config(),
        ConfigCommands::Profiles => list_profiles(),
        ConfigCommands::Path => show_path(),
    }
}

/// Create a new config file.
fn init_config(project: Option<String>, force: bool) -> Result<()> {
    let path = config_path()?;

    if path.exists() && !force {
        bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    let mut config = CliConfig::default();
    if let Some(project) = project {
        config.profiles.insert(
            "default".to_string(),
            Profile {
                project,
                properties: None,
                policy: None,
            },
        );
    }

    write_config(&path, &config)?;

    println!("Created config file at {}", path.display());
    println!();
    println!("To add more profiles:");
    println!("  keyprop config set --profile client --project ~/src/client_app");

    Ok(())
}

/// Update profile values.
fn set_config(
    profile_name: String,
    project: Option<String>,
    properties: Option<String>,
    policy: Option<String>,
    set_default: bool,
) -> Result<()> {
    validate_profile_name(&profile_name)?;
    let path = config_path()?;

    let mut config = load_config()?.unwrap_or_else(|| CliConfig {
        default_profile: "default".to_string(),
        profiles: HashMap::new(),
    });

    let profile = config
        .profiles
        .entry(profile_name.clone())
        .or_insert_with(|| Profile {
            project: ".".to_string(),
            properties: None,
            policy: None,
        });

    let mut updated = false;
    if let Some(p) = project {
        profile.project = p;
        updated = true;
    }
    if let Some(p) = properties {
        profile.properties = Some(p);
        updated = true;
    }
    if let Some(p) = policy {
        profile.policy = Some(p);
        updated = true;
    }

    if set_default && config.default_profile != profile_name {
        config.default_profile = profile_name.clone();
        updated = true;
    }

    if !updated && !set_default {
        println!("No changes specified. Use --project, --properties, --policy, or --default.");
        return Ok(());
    }

    validate_config(&config)?;
    write_config(&path, &config)?;

    println!("Updated profile '{}'", profile_name);
    if set_default {
        println!("Set '{}' as default profile", profile_name);
    }

    Ok(())
}

/// Display current configuration.
fn show_config() -> Result<()> {
    let path = config_path()?;

    let config = match load_config()? {
        Some(c) => c,
        None => {
            println!("No config file found at {}", path.display());
            println!();
            println!("Using defaults:");
            println!("  Project:    .");
            println!("  Properties: ./android/key.properties");
            println!("  Policy:     require");
            println!();
            println!("Run 'keyprop config init' to create a config file.");
            return Ok(());
        }
    };

    println!("Config file: {}", path.display());
    println!("Default profile: {}", config.default_profile);
    println!();

    let mut names: Vec<_> = config.profiles.keys().collect();
    names.sort();

    for name in names {
        let profile = &config.profiles[name];
        let marker = if name == &config.default_profile { " *" } else { "" };

        println!("[{}]{}", name, marker);
        println!("  Project:    {}", profile.project);
        println!(
            "  Properties: {}",
            profile.properties.as_deref().unwrap_or("(project default)")
        );
        println!("  Policy:     {}", profile.policy.as_deref().unwrap_or("require"));
        println!();
    }

    Ok(())
}

/// List all available profiles.
fn list_profiles() -> Result<()> {
    let config = match load_config()? {
        Some(c) => c,
        None => {
            println!("No config file found. Run 'keyprop config init' to create one.");
            return Ok(());
        }
    };

    let mut names: Vec<_> = config.profiles.keys().collect();
    names.sort();

    println!("Available profiles:");
    for name in names {
        if name == &config.default_profile {
            println!("  {} *", name);
        } else {
            println!("  {}", name);
        }
    }
    println!();
    println!("* = default profile");

    Ok(())
}

/// Show the config file path.
fn show_path() -> Result<()> {
    println!("{}", config_path()?.display());

    if let Ok(env_path) = std::env::var("KEYPROP_CONFIG") {
        println!();
        println!("Note: KEYPROP_CONFIG is set to: {}", env_path);
    }

    Ok(())
}

/// Write config to file with HUML formatting and owner-only permissions.
fn write_config(path: &Path, config: &CliConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            #[cfg(unix)]
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
        }
    }

    let content = serialize_to_huml(config);
    fs::write(path, &content).with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

/// Serialize config to HUML format.
///
/// huml-rs only deserializes, so the document is generated by hand.
fn serialize_to_huml(config: &CliConfig) -> String {
    let mut output = String::new();

    output.push_str("%HUML v0.2.0\n");
    output.push_str(&format!("default_profile: {}\n", quote(&config.default_profile)));
    output.push('\n');
    output.push_str("profiles::\n");

    // Sorted for deterministic output
    let mut profile_names: Vec<_> = config.profiles.keys().collect();
    profile_names.sort();

    for name in profile_names {
        let profile = &config.profiles[name];
        output.push_str(&format!("  {}::\n", name));
        output.push_str(&format!("    project: {}\n", quote(&profile.project)));
        if let Some(ref properties) = profile.properties {
            output.push_str(&format!("    properties: {}\n", quote(properties)));
        }
        if let Some(ref policy) = profile.policy {
            output.push_str(&format!("    policy: {}\n", quote(policy)));
        }
        output.push('\n');
    }

    output
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
