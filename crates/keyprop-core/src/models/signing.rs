//! Signing models for Android release builds.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Property key for the key alias.
pub const KEY_ALIAS: &str = "keyAlias";
/// Property key for the key password.
pub const KEY_PASSWORD: &str = "keyPassword";
/// Property key for the keystore path.
pub const STORE_FILE: &str = "storeFile";
/// Property key for the keystore password.
pub const STORE_PASSWORD: &str = "storePassword";

/// Credentials needed to sign a release artifact.
///
/// Every field is independently optional. An identity is only *usable* when
/// both the key alias and the store file are present; see [`is_usable`].
///
/// [`is_usable`]: SigningIdentity::is_usable
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SigningIdentity {
    pub key_alias: Option<String>,
    pub key_password: Option<String>,
    /// Keystore path exactly as written in the properties file.
    pub store_file: Option<PathBuf>,
    pub store_password: Option<String>,
}

impl SigningIdentity {
    /// An identity with every field absent.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.key_alias.is_none()
            && self.key_password.is_none()
            && self.store_file.is_none()
            && self.store_password.is_none()
    }

    /// Whether this identity may be attached to a release build.
    pub fn is_usable(&self) -> bool {
        self.key_alias.is_some() && self.store_file.is_some()
    }

    /// Names of the gating fields that are absent.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.key_alias.is_none() {
            missing.push(KEY_ALIAS);
        }
        if self.store_file.is_none() {
            missing.push(STORE_FILE);
        }
        missing
    }

    /// Resolves the store file against `base_dir`.
    ///
    /// Relative paths are joined onto `base_dir`; absolute paths are returned
    /// unchanged.
    pub fn store_file_in(&self, base_dir: &Path) -> Option<PathBuf> {
        self.store_file.as_ref().map(|file| {
            if file.is_absolute() {
                file.clone()
            } else {
                base_dir.join(file)
            }
        })
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("key_alias", &self.key_alias)
            .field("key_password", &self.key_password.as_ref().map(|_| "***"))
            .field("store_file", &self.store_file)
            .field("store_password", &self.store_password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Serializable view of an identity, with secrets masked unless requested.
#[derive(Debug, Clone, Serialize)]
pub struct SigningIdentityResponse {
    pub key_alias: Option<String>,
    pub key_password: Option<String>,
    pub store_file: Option<String>,
    pub store_password: Option<String>,
    pub usable: bool,
}

impl SigningIdentityResponse {
    pub fn new(identity: &SigningIdentity, show_secrets: bool) -> Self {
        let secret = |value: &Option<String>| {
            value.as_ref().map(|v| {
                if show_secrets {
                    v.clone()
                } else {
                    mask_secret(v)
                }
            })
        };

        Self {
            key_alias: identity.key_alias.clone(),
            key_password: secret(&identity.key_password),
            store_file: identity
                .store_file
                .as_ref()
                .map(|p| p.display().to_string()),
            store_password: secret(&identity.store_password),
            usable: identity.is_usable(),
        }
    }
}

/// Masks a secret for display; only its presence is revealed.
pub fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

/// Android keystore container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystoreType {
    Jks,
    Pkcs12,
}

impl KeystoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeystoreType::Jks => "jks",
            KeystoreType::Pkcs12 => "pkcs12",
        }
    }
}

impl fmt::Display for KeystoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How to treat a usable identity whose keystore file is missing on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeystorePolicy {
    /// Fail resolution.
    #[default]
    Require,
    /// Log a warning and keep the identity.
    Warn,
    /// Keep the identity without checking.
    Ignore,
}

impl KeystorePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeystorePolicy::Require => "require",
            KeystorePolicy::Warn => "warn",
            KeystorePolicy::Ignore => "ignore",
        }
    }
}

impl std::str::FromStr for KeystorePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "require" => Ok(KeystorePolicy::Require),
            "warn" => Ok(KeystorePolicy::Warn),
            "ignore" => Ok(KeystorePolicy::Ignore),
            _ => Err(format!("Unknown keystore policy: {}", s)),
        }
    }
}

impl fmt::Display for KeystorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(alias: Option<&str>, store: Option<&str>) -> SigningIdentity {
        SigningIdentity {
            key_alias: alias.map(String::from),
            key_password: Some("keypass".to_string()),
            store_file: store.map(PathBuf::from),
            store_password: Some("storepass".to_string()),
        }
    }

    #[test]
    fn test_usable_requires_alias_and_store_file() {
        assert!(identity(Some("upload"), Some("upload.jks")).is_usable());
        assert!(!identity(None, Some("upload.jks")).is_usable());
        assert!(!identity(Some("upload"), None).is_usable());
        assert!(!SigningIdentity::empty().is_usable());
    }

    #[test]
    fn test_missing_required_fields() {
        assert_eq!(
            identity(None, None).missing_required_fields(),
            vec![KEY_ALIAS, STORE_FILE]
        );
        assert!(identity(Some("a"), Some("b")).missing_required_fields().is_empty());
    }

    #[test]
    fn test_store_file_in() {
        let relative = identity(Some("a"), Some("keys/upload.jks"));
        assert_eq!(
            relative.store_file_in(Path::new("/project/android/app")),
            Some(PathBuf::from("/project/android/app/keys/upload.jks"))
        );

        let absolute = identity(Some("a"), Some("/secure/upload.jks"));
        assert_eq!(
            absolute.store_file_in(Path::new("/project/android/app")),
            Some(PathBuf::from("/secure/upload.jks"))
        );

        assert_eq!(SigningIdentity::empty().store_file_in(Path::new("/x")), None);
    }

    #[test]
    fn test_debug_masks_passwords() {
        let debug = format!("{:?}", identity(Some("upload"), Some("upload.jks")));
        assert!(debug.contains("upload"));
        assert!(!debug.contains("keypass"));
        assert!(!debug.contains("storepass"));
    }

    #[test]
    fn test_response_masks_unless_requested() {
        let id = identity(Some("upload"), Some("upload.jks"));

        let masked = SigningIdentityResponse::new(&id, false);
        assert_eq!(masked.key_password.as_deref(), Some("********"));
        assert!(masked.usable);

        let revealed = SigningIdentityResponse::new(&id, true);
        assert_eq!(revealed.store_password.as_deref(), Some("storepass"));
    }

    #[test]
    fn test_keystore_policy_from_str() {
        assert_eq!("require".parse::<KeystorePolicy>(), Ok(KeystorePolicy::Require));
        assert_eq!("WARN".parse::<KeystorePolicy>(), Ok(KeystorePolicy::Warn));
        assert_eq!("ignore".parse::<KeystorePolicy>(), Ok(KeystorePolicy::Ignore));
        assert!("strict".parse::<KeystorePolicy>().is_err());
        assert_eq!(KeystorePolicy::default(), KeystorePolicy::Require);
    }
}
