//! Local SSH key pairs

use crate::error::Result;
use rand::RngCore;
use ssh_key::{Algorithm, LineEnding, PrivateKey};
use std::fs;
use std::path::{Path, PathBuf};

/// Public half of a private key file (`<key>.pub`)
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut path = private_key.as_os_str().to_owned();
    path.push(".pub");
    PathBuf::from(path)
}

/// Random hexadecimal identifier used to name generated keys
pub fn random_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Key pair names may not contain dots
pub fn sanitize_key_pair_name(name: &str) -> String {
    name.replace('.', "_")
}

/// Generate an ed25519 key pair at `path` and `path.pub`
///
/// The parent directory is created with mode 0700 when missing.
pub fn generate_key_pair(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
            }
        }
    }

    let key = PrivateKey::random(&mut rand::rngs::OsRng, Algorithm::Ed25519)?;
    key.write_openssh_file(path, LineEnding::LF)?;

    let public = key.public_key().to_openssh()?;
    fs::write(public_key_path(path), format!("{}\n", public))?;

    tracing::debug!("Generated SSH key pair {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_key_pair_name() {
        assert_eq!(sanitize_key_pair_name("web.example.com-1a"), "web_example_com-1a");
        assert_eq!(sanitize_key_pair_name("plain"), "plain");
    }

    #[test]
    fn test_random_id() {
        let a = random_id();
        let b = random_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_key_pair() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("machines").join("web-01").join("key");

        generate_key_pair(&path).unwrap();

        assert!(path.exists());
        let public = fs::read_to_string(public_key_path(&path)).unwrap();
        assert!(public.starts_with("ssh-ed25519 "));

        let private = fs::read_to_string(&path).unwrap();
        assert!(private.contains("BEGIN OPENSSH PRIVATE KEY"));
    }
}
