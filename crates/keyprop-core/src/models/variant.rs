//! Build variant models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{SigningIdentity, SigningIdentityResponse};

/// Flutter build mode, mapped onto an Android build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Debug,
    Profile,
    Release,
}

impl BuildType {
    pub const ALL: [BuildType; 3] = [BuildType::Debug, BuildType::Profile, BuildType::Release];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Profile => "profile",
            BuildType::Release => "release",
        }
    }

    /// Whether this build type is signed with the resolved release identity.
    ///
    /// Everything else uses the toolchain's default debug keystore.
    pub fn uses_release_signing(&self) -> bool {
        matches!(self, BuildType::Release)
    }
}

impl std::str::FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "profile" => Ok(BuildType::Profile),
            "release" => Ok(BuildType::Release),
            _ => Err(format!("Unknown build type: {}", s)),
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A build variant and the signing identity it is bound to.
///
/// `signing_config` is either a usable identity or `None`, in which case the
/// packaging stage falls back to the toolchain default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildVariant {
    pub build_type: BuildType,
    pub signing_config: Option<SigningIdentity>,
}

impl BuildVariant {
    pub fn name(&self) -> &'static str {
        self.build_type.as_str()
    }

    pub fn uses_default_signing(&self) -> bool {
        self.signing_config.is_none()
    }
}

/// Serializable view of a variant binding.
#[derive(Debug, Clone, Serialize)]
pub struct BuildVariantResponse {
    pub name: String,
    pub signing: Option<SigningIdentityResponse>,
    pub default_signing: bool,
}

impl BuildVariantResponse {
    pub fn new(variant: &BuildVariant, show_secrets: bool) -> Self {
        Self {
            name: variant.name().to_string(),
            signing: variant
                .signing_config
                .as_ref()
                .map(|id| SigningIdentityResponse::new(id, show_secrets)),
            default_signing: variant.uses_default_signing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_type_round_trip_names() {
        for build_type in BuildType::ALL {
            assert_eq!(build_type.as_str().parse::<BuildType>(), Ok(build_type));
        }
        assert!("staging".parse::<BuildType>().is_err());
    }

    #[test]
    fn test_only_release_uses_release_signing() {
        assert!(BuildType::Release.uses_release_signing());
        assert!(!BuildType::Debug.uses_release_signing());
        assert!(!BuildType::Profile.uses_release_signing());
    }
}
