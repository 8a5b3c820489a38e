//! Signing resolution commands.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use keyprop_core::models::{BuildVariantResponse, SigningIdentity, SigningIdentityResponse};
use keyprop_core::project::ToolchainMetadata;
use keyprop_core::signing::{
    bind_variants, check_keystore, cleanup_key_properties, resolve, select_signing_config,
    verify_identity, write_key_properties,
};
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::output::{
    print_info, print_json, print_key_value, print_optional, print_section, print_success,
    print_warning,
};

#[derive(Subcommand)]
pub enum SigningCommands {
    /// Show the signing identity read from the properties file
    Resolve {
        /// Show password values instead of masking them
        #[arg(long)]
        show_secrets: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which identity the release build would be signed with
    Select {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show toolchain metadata and the signing of every build variant
    Plan {
        /// Show password values instead of masking them
        #[arg(long)]
        show_secrets: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the selected identity against its keystore with keytool
    Verify,

    /// Write android/key.properties
    Write {
        /// Path to the keystore (relative paths resolve against android/app)
        #[arg(long)]
        store_file: PathBuf,

        /// Key alias inside the keystore
        #[arg(long)]
        alias: String,

        /// Keystore password
        #[arg(long, env = "KEYPROP_STORE_PASSWORD", hide_env_values = true)]
        store_password: String,

        /// Key password (defaults to the keystore password)
        #[arg(long, env = "KEYPROP_KEY_PASSWORD", hide_env_values = true)]
        key_password: Option<String>,

        /// Overwrite an existing key.properties
        #[arg(long)]
        force: bool,
    },

    /// Remove android/key.properties
    Clean,
}

#[derive(Serialize)]
struct SelectionResponse {
    properties: String,
    policy: String,
    signing: Option<SigningIdentityResponse>,
    default_signing: bool,
}

#[derive(Serialize)]
struct PlanResponse {
    project: String,
    properties: String,
    policy: String,
    toolchain: ToolchainMetadata,
    variants: Vec<BuildVariantResponse>,
}

pub async fn handle_signing_command(config: &ResolvedConfig, cmd: SigningCommands) -> Result<()> {
    match cmd {
        SigningCommands::Resolve { show_secrets, json } => {
            resolve_identity(config, show_secrets, json)
        }
        SigningCommands::Select { json } => select_identity(config, json),
        SigningCommands::Plan { show_secrets, json } => show_plan(config, show_secrets, json),
        SigningCommands::Verify => verify(config).await,
        SigningCommands::Write {
            store_file,
            alias,
            store_password,
            key_password,
            force,
        } => {
            let key_password = key_password.unwrap_or_else(|| store_password.clone());
            write(config, store_file, &alias, &store_password, &key_password, force).await
        }
        SigningCommands::Clean => clean(config).await,
    }
}

fn load_identity(config: &ResolvedConfig) -> Result<SigningIdentity> {
    resolve(&config.properties)
        .with_context(|| format!("Failed to resolve {}", config.properties.display()))
}

/// Resolves, selects and applies the keystore policy.
fn select_release(config: &ResolvedConfig) -> Result<Option<SigningIdentity>> {
    let identity = load_identity(config)?;
    let selected = check_keystore(
        select_signing_config(identity),
        &config.project.app_dir(),
        config.policy,
    )?;
    Ok(selected)
}

fn resolve_identity(config: &ResolvedConfig, show_secrets: bool, json: bool) -> Result<()> {
    let identity = load_identity(config)?;

    if json {
        return print_json(&SigningIdentityResponse::new(&identity, show_secrets));
    }

    if !config.properties.exists() {
        print_info(&format!(
            "{} not found, all fields are unset",
            config.properties.display()
        ));
    }

    print_identity(&identity, show_secrets);

    if !identity.is_usable() {
        println!();
        print_warning(&format!(
            "Identity is not usable for release signing (missing {})",
            identity.missing_required_fields().join(", ")
        ));
    }

    Ok(())
}

fn select_identity(config: &ResolvedConfig, json: bool) -> Result<()> {
    let selected = select_release(config)?;

    if json {
        return print_json(&SelectionResponse {
            properties: config.properties.display().to_string(),
            policy: config.policy.to_string(),
            signing: selected
                .as_ref()
                .map(|id| SigningIdentityResponse::new(id, false)),
            default_signing: selected.is_none(),
        });
    }

    match selected {
        Some(identity) => {
            print_success("Release builds will be signed with:");
            print_identity(&identity, false);
        }
        None => print_info("Release builds will use the toolchain default signing"),
    }

    Ok(())
}

fn show_plan(config: &ResolvedConfig, show_secrets: bool, json: bool) -> Result<()> {
    let toolchain = ToolchainMetadata::load(&config.project)
        .context("Failed to read toolchain metadata")?;
    let selected = select_release(config)?;
    let variants = bind_variants(selected.as_ref());

    if json {
        return print_json(&PlanResponse {
            project: config.project.root().display().to_string(),
            properties: config.properties.display().to_string(),
            policy: config.policy.to_string(),
            toolchain,
            variants: variants
                .iter()
                .map(|v| BuildVariantResponse::new(v, show_secrets))
                .collect(),
        });
    }

    if !config.project.is_flutter_project() {
        print_warning(&format!(
            "No pubspec.yaml in {}",
            config.project.root().display()
        ));
    }

    print_section("Project");
    print_key_value("Root", &config.project.root().display().to_string());
    print_key_value("Properties", &config.properties.display().to_string());
    print_key_value("Keystore policy", config.policy.as_str());

    print_section("Toolchain");
    print_optional("App name", toolchain.app_name.as_deref());
    print_optional("Flutter SDK", toolchain.flutter_sdk.as_deref());
    print_optional("Version name", toolchain.version_name.as_deref());
    print_optional(
        "Version code",
        toolchain.version_code.map(|c| c.to_string()).as_deref(),
    );

    print_section("Variants");
    for variant in &variants {
        match &variant.signing_config {
            Some(identity) => {
                let alias = identity.key_alias.as_deref().unwrap_or_default();
                let store = identity
                    .store_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                print_key_value(variant.name(), &format!("{} @ {}", alias, store));
            }
            None => print_key_value(variant.name(), "default signing"),
        }
    }

    Ok(())
}

async fn verify(config: &ResolvedConfig) -> Result<()> {
    let Some(identity) = select_release(config)? else {
        bail!(
            "No usable signing identity in {}; release builds use the toolchain default signing",
            config.properties.display()
        );
    };

    let info = verify_identity(&identity, &config.project.app_dir()).await?;

    print_success(&format!(
        "Alias '{}' found in {} ({})",
        identity.key_alias.as_deref().unwrap_or_default(),
        info.path.display(),
        info.keystore_type
    ));

    Ok(())
}

async fn write(
    config: &ResolvedConfig,
    store_file: PathBuf,
    alias: &str,
    store_password: &str,
    key_password: &str,
    force: bool,
) -> Result<()> {
    let android_dir = config.project.android_dir();
    let path = write_key_properties(
        &android_dir,
        &store_file,
        store_password,
        alias,
        key_password,
        force,
    )
    .await?;

    if path != config.properties {
        print_warning(&format!(
            "Configured properties path is {}; resolution will not read the new file",
            config.properties.display()
        ));
    }

    let keystore = config.project.app_dir().join(&store_file);
    if !keystore.is_file() {
        print_warning(&format!("Keystore {} does not exist yet", keystore.display()));
    }

    print_success(&format!("Wrote {}", path.display()));
    Ok(())
}

async fn clean(config: &ResolvedConfig) -> Result<()> {
    let android_dir = config.project.android_dir();
    if cleanup_key_properties(&android_dir).await? {
        print_success(&format!("Removed {}", config.project.key_properties_path().display()));
    } else {
        print_info("Nothing to remove");
    }
    Ok(())
}

fn print_identity(identity: &SigningIdentity, show_secrets: bool) {
    let view = SigningIdentityResponse::new(identity, show_secrets);
    print_optional("keyAlias", view.key_alias.as_deref());
    print_optional("keyPassword", view.key_password.as_deref());
    print_optional("storeFile", view.store_file.as_deref());
    print_optional("storePassword", view.store_password.as_deref());
}
