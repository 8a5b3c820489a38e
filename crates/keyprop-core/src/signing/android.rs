//! Android keystore validation and key.properties generation.
//!
//! These are the side-effecting helpers around resolution: checking a
//! keystore with `keytool`, and writing or removing the `key.properties`
//! file that the Gradle build script reads.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{KeypropError, Result};
use crate::models::{
    KeystoreType, SigningIdentity, KEY_ALIAS, KEY_PASSWORD, STORE_FILE, STORE_PASSWORD,
};
use crate::properties::Properties;

/// File name Gradle looks for in the Android root project.
pub const KEY_PROPERTIES_FILE: &str = "key.properties";

/// Environment variable that carries the store password to keytool.
const STOREPASS_ENV: &str = "KEYPROP_KEYTOOL_STOREPASS";

/// A keystore whose alias was found by keytool.
#[derive(Debug, Clone)]
pub struct KeystoreInfo {
    pub path: PathBuf,
    /// Type of the keystore (JKS or PKCS12).
    pub keystore_type: KeystoreType,
}

/// Detects the keystore type from its magic bytes.
pub fn detect_keystore_type(data: &[u8]) -> KeystoreType {
    // JKS files start with 0xFEEDFEED; PKCS12 is an ASN.1 SEQUENCE (0x30)
    if data.starts_with(&[0xFE, 0xED, 0xFE, 0xED]) {
        return KeystoreType::Jks;
    }

    KeystoreType::Pkcs12
}

/// Verifies that the keystore at `path` opens with `store_password` and
/// contains `alias`.
///
/// Uses the `keytool` CLI shipped with the JDK.
pub async fn verify_keystore(path: &Path, store_password: &str, alias: &str) -> Result<KeystoreInfo> {
    let data = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            KeypropError::KeystoreNotFound(path.to_path_buf())
        } else {
            KeypropError::Io(e)
        }
    })?;
    let keystore_type = detect_keystore_type(&data);

    let output = keytool_list_command(path, store_password, alias)
        .output()
        .await
        .map_err(|e| KeypropError::Keytool(format!("Failed to run keytool: {}", e)))?;

    if !output.status.success() {
        // keytool reports most failures on stdout
        let mut message = String::from_utf8_lossy(&output.stderr).into_owned();
        message.push_str(&String::from_utf8_lossy(&output.stdout));
        return Err(keytool_error(&message, alias));
    }

    tracing::debug!("Verified alias '{}' in {}", alias, path.display());

    Ok(KeystoreInfo {
        path: path.to_path_buf(),
        keystore_type,
    })
}

/// Builds `keytool -list` for one alias.
///
/// The password is passed through the child's environment (`-storepass:env`)
/// so it never appears in the process arguments.
fn keytool_list_command(path: &Path, store_password: &str, alias: &str) -> Command {
    let mut command = Command::new("keytool");
    command
        .arg("-list")
        .arg("-keystore")
        .arg(path)
        .args(["-storepass:env", STOREPASS_ENV, "-alias", alias])
        .env(STOREPASS_ENV, store_password)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command
}

/// Verifies a selected identity against its keystore, resolving a relative
/// store file against `base_dir`.
pub async fn verify_identity(identity: &SigningIdentity, base_dir: &Path) -> Result<KeystoreInfo> {
    let (Some(alias), Some(path)) = (identity.key_alias.as_deref(), identity.store_file_in(base_dir))
    else {
        return Err(KeypropError::Keytool(format!(
            "Signing identity is missing {}",
            identity.missing_required_fields().join(", ")
        )));
    };

    let password = identity.store_password.as_deref().unwrap_or_default();
    verify_keystore(&path, password, alias).await
}

/// Maps keytool output to a specific error.
fn keytool_error(output: &str, alias: &str) -> KeypropError {
    if output.contains("keystore password was incorrect") {
        return KeypropError::Keytool("Invalid keystore password".to_string());
    }
    if output.contains("does not exist") {
        return KeypropError::Keytool(format!("Alias '{}' not found in keystore", alias));
    }
    if output.contains("Invalid keystore format") || output.contains("Unrecognized keystore format") {
        return KeypropError::Keytool("Invalid keystore format".to_string());
    }

    KeypropError::Keytool(format!("Failed to validate keystore: {}", output.trim()))
}

/// Generates a key.properties file content for Flutter/Gradle.
pub fn generate_key_properties(
    keystore_path: &Path,
    keystore_password: &str,
    key_alias: &str,
    key_password: &str,
) -> String {
    let mut properties = Properties::new();
    properties.insert(STORE_PASSWORD, keystore_password);
    properties.insert(KEY_PASSWORD, key_password);
    properties.insert(KEY_ALIAS, key_alias);
    properties.insert(STORE_FILE, keystore_path.display().to_string());
    properties.to_properties_string()
}

/// Writes key.properties into the Android project directory.
///
/// Refuses to replace an existing file unless `overwrite` is set. On Unix
/// the file is readable by its owner only.
pub async fn write_key_properties(
    android_dir: &Path,
    keystore_path: &Path,
    keystore_password: &str,
    key_alias: &str,
    key_password: &str,
    overwrite: bool,
) -> Result<PathBuf> {
    if !android_dir.is_dir() {
        return Err(KeypropError::Project(format!(
            "Android directory not found: {}",
            android_dir.display()
        )));
    }

    let key_properties_path = android_dir.join(KEY_PROPERTIES_FILE);
    if key_properties_path.exists() && !overwrite {
        return Err(KeypropError::Project(format!(
            "{} already exists",
            key_properties_path.display()
        )));
    }

    let content = generate_key_properties(keystore_path, keystore_password, key_alias, key_password);
    tokio::fs::write(&key_properties_path, content).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&key_properties_path, permissions).await?;
    }

    tracing::debug!("Wrote {}", key_properties_path.display());

    Ok(key_properties_path)
}

/// Removes key.properties from the Android project directory.
///
/// Returns whether a file was removed.
pub async fn cleanup_key_properties(android_dir: &Path) -> Result<bool> {
    let key_properties_path = android_dir.join(KEY_PROPERTIES_FILE);

    match tokio::fs::remove_file(&key_properties_path).await {
        Ok(()) => {
            tracing::debug!("Removed {}", key_properties_path.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
