//! Signing configuration resolver.
//!
//! Resolution is a single synchronous pass:
//! 1. [`resolve`] reads the optional properties file into a
//!    [`SigningIdentity`] whose fields are independently optional.
//! 2. [`select_signing_config`] keeps the identity only if it is usable.
//! 3. [`check_keystore`] applies the [`KeystorePolicy`] to the referenced
//!    keystore file.
//! 4. [`bind_variants`] attaches the selection to the release build type.

use std::path::{Path, PathBuf};

use crate::error::{KeypropError, Result};
use crate::models::{
    BuildType, BuildVariant, KeystorePolicy, SigningIdentity, KEY_ALIAS, KEY_PASSWORD,
    STORE_FILE, STORE_PASSWORD,
};
use crate::properties::Properties;

/// Resolves a signing identity from a properties file.
///
/// A missing file yields an empty identity; this is the expected state on
/// machines without release keys. A file that exists but cannot be read or
/// parsed is an error.
pub fn resolve(properties_path: &Path) -> Result<SigningIdentity> {
    match Properties::load(properties_path)? {
        Some(properties) => Ok(identity_from_properties(&properties)),
        None => {
            tracing::debug!(
                "No signing properties at {}, using empty identity",
                properties_path.display()
            );
            Ok(SigningIdentity::empty())
        }
    }
}

/// Builds an identity from already-parsed properties.
///
/// Unrecognized keys are ignored. A key that is present with an empty value
/// is kept as `Some("")`; only a missing key is absent.
pub fn identity_from_properties(properties: &Properties) -> SigningIdentity {
    let text = |key: &str| properties.get(key).map(str::to_string);

    SigningIdentity {
        key_alias: text(KEY_ALIAS),
        key_password: text(KEY_PASSWORD),
        store_file: properties.get(STORE_FILE).map(PathBuf::from),
        store_password: text(STORE_PASSWORD),
    }
}

/// Returns the identity unchanged if it is usable, otherwise `None`.
pub fn select_signing_config(identity: SigningIdentity) -> Option<SigningIdentity> {
    if identity.is_usable() {
        Some(identity)
    } else {
        if !identity.is_empty() {
            tracing::debug!(
                "Signing identity is incomplete (missing {}), falling back to default signing",
                identity.missing_required_fields().join(", ")
            );
        }
        None
    }
}

/// Applies `policy` to a selected identity whose store file resolves
/// against `base_dir`.
pub fn check_keystore(
    selected: Option<SigningIdentity>,
    base_dir: &Path,
    policy: KeystorePolicy,
) -> Result<Option<SigningIdentity>> {
    let Some(identity) = selected else {
        return Ok(None);
    };
    if policy == KeystorePolicy::Ignore {
        return Ok(Some(identity));
    }

    let Some(keystore) = identity.store_file_in(base_dir) else {
        return Ok(Some(identity));
    };

    if keystore.is_file() {
        return Ok(Some(identity));
    }

    match policy {
        KeystorePolicy::Require => Err(KeypropError::KeystoreNotFound(keystore)),
        _ => {
            tracing::warn!(
                "Keystore {} does not exist; release signing will fail when packaging",
                keystore.display()
            );
            Ok(Some(identity))
        }
    }
}

/// Binds every build type to its signing configuration.
///
/// Only the release variant receives `selected`; the others always use the
/// toolchain default.
pub fn bind_variants(selected: Option<&SigningIdentity>) -> Vec<BuildVariant> {
    BuildType::ALL
        .into_iter()
        .map(|build_type| BuildVariant {
            build_type,
            signing_config: if build_type.uses_release_signing() {
                selected.cloned()
            } else {
                None
            },
        })
        .collect()
}
