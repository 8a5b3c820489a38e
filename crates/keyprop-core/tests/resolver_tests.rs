//! End-to-end resolution tests against on-disk Flutter project layouts.

use std::path::{Path, PathBuf};

use keyprop_core::models::{BuildType, KeystorePolicy, SigningIdentity};
use keyprop_core::project::FlutterProject;
use keyprop_core::signing::{bind_variants, check_keystore, resolve, select_signing_config};
use keyprop_core::KeypropError;

/// Creates `<root>/android/app` and returns the project.
fn create_project() -> (tempfile::TempDir, FlutterProject) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::create_dir_all(dir.path().join("android/app")).unwrap();
    let project = FlutterProject::new(dir.path());
    (dir, project)
}

fn write_key_properties(project: &FlutterProject, content: &str) -> PathBuf {
    let path = project.key_properties_path();
    std::fs::write(&path, content).unwrap();
    path
}

fn write_keystore(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), [0xFE, 0xED, 0xFE, 0xED, 0, 0, 0, 2]).unwrap();
}

// =============================================================================
// Absent configuration
// =============================================================================

mod absent {
    use super::*;

    #[test]
    fn missing_file_resolves_to_empty_identity() {
        let (_dir, project) = create_project();

        let identity = resolve(&project.key_properties_path()).unwrap();

        assert_eq!(identity.key_alias, None);
        assert_eq!(identity.key_password, None);
        assert_eq!(identity.store_file, None);
        assert_eq!(identity.store_password, None);
        assert_eq!(select_signing_config(identity), None);
    }

    #[test]
    fn missing_project_directory_is_not_an_error() {
        let project = FlutterProject::new("/definitely/not/a/project");
        let identity = resolve(&project.key_properties_path()).unwrap();
        assert!(identity.is_empty());
    }

    #[test]
    fn all_variants_use_default_signing() {
        let (_dir, project) = create_project();

        let identity = resolve(&project.key_properties_path()).unwrap();
        let selected = check_keystore(
            select_signing_config(identity),
            &project.app_dir(),
            KeystorePolicy::Require,
        )
        .unwrap();

        assert!(bind_variants(selected.as_ref())
            .iter()
            .all(|v| v.uses_default_signing()));
    }
}

// =============================================================================
// Complete and partial configuration
// =============================================================================

mod configured {
    use super::*;

    #[test]
    fn full_identity_is_selected_unchanged() {
        let (_dir, project) = create_project();
        let path = write_key_properties(
            &project,
            "storePassword=android\nkeyPassword=android\nkeyAlias=upload\nstoreFile=upload-keystore.jks\n",
        );

        let identity = resolve(&path).unwrap();
        assert_eq!(
            identity,
            SigningIdentity {
                key_alias: Some("upload".to_string()),
                key_password: Some("android".to_string()),
                store_file: Some(PathBuf::from("upload-keystore.jks")),
                store_password: Some("android".to_string()),
            }
        );
        assert_eq!(select_signing_config(identity.clone()), Some(identity));
    }

    #[test]
    fn missing_key_password_is_still_usable() {
        let (_dir, project) = create_project();
        let path = write_key_properties(
            &project,
            "keyAlias=foo\nstoreFile=release.keystore\nstorePassword=bar\n",
        );

        let selected = select_signing_config(resolve(&path).unwrap()).unwrap();

        assert_eq!(selected.key_alias.as_deref(), Some("foo"));
        assert_eq!(selected.store_file, Some(PathBuf::from("release.keystore")));
        assert_eq!(selected.key_password, None);
        assert_eq!(selected.store_password.as_deref(), Some("bar"));
    }

    #[test]
    fn missing_gating_field_is_never_selected() {
        let (_dir, project) = create_project();
        let cases = [
            "keyPassword=a\nstoreFile=x.jks\nstorePassword=b\n",
            "keyAlias=a\nkeyPassword=b\nstorePassword=c\n",
            "keyPassword=a\nstorePassword=b\n",
        ];

        for content in cases {
            let path = write_key_properties(&project, content);
            let identity = resolve(&path).unwrap();
            assert_eq!(select_signing_config(identity), None, "content: {content}");
        }
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let (_dir, project) = create_project();
        let path = write_key_properties(&project, "keyAlias=upload\nstoreFile=upload.jks\n");

        assert_eq!(resolve(&path).unwrap(), resolve(&path).unwrap());
    }

    #[test]
    fn release_variant_gets_verified_identity() {
        let (_dir, project) = create_project();
        write_keystore(&project.app_dir(), "upload.jks");
        let path = write_key_properties(&project, "keyAlias=upload\nstoreFile=upload.jks\n");

        let selected = check_keystore(
            select_signing_config(resolve(&path).unwrap()),
            &project.app_dir(),
            KeystorePolicy::Require,
        )
        .unwrap();

        let variants = bind_variants(selected.as_ref());
        let release = variants
            .iter()
            .find(|v| v.build_type == BuildType::Release)
            .unwrap();
        assert_eq!(release.signing_config, selected);
        assert!(release.signing_config.is_some());
    }

    #[test]
    fn missing_keystore_fails_under_require_policy() {
        let (_dir, project) = create_project();
        let path = write_key_properties(&project, "keyAlias=upload\nstoreFile=gone.jks\n");

        let result = check_keystore(
            select_signing_config(resolve(&path).unwrap()),
            &project.app_dir(),
            KeystorePolicy::Require,
        );

        assert!(matches!(result, Err(KeypropError::KeystoreNotFound(_))));
    }
}

// =============================================================================
// Broken environments
// =============================================================================

mod unreadable {
    use super::*;

    #[test]
    fn malformed_escape_is_reported() {
        let (_dir, project) = create_project();
        let path = write_key_properties(&project, "keyAlias=\\uXYZW\n");

        let err = resolve(&path).unwrap_err();
        assert!(matches!(err, KeypropError::MalformedProperties { line: 1, .. }));
        assert!(err.to_string().contains("key.properties"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, project) = create_project();
        let path = write_key_properties(&project, "keyAlias=upload\n");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root can read anything, so only assert when access is actually denied.
        if std::fs::read(&path).is_err() {
            let err = resolve(&path).unwrap_err();
            assert!(matches!(err, KeypropError::ConfigFileUnreadable { .. }));
        }
    }
}
