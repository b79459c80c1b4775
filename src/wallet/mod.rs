use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use solana_sdk::signature::{keypair_from_seed, Keypair, Signer};
use thiserror::Error;

const KEYPAIR_LENGTH: usize = 64;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("keypair file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("keypair file {} is not a JSON byte array: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("keypair file {} is malformed: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
    #[error("{} already exists, pass --force to overwrite", .0.display())]
    Exists(PathBuf),
}

pub fn generate() -> Keypair {
    Keypair::new()
}

/// Read a keypair stored as a JSON array of 64 bytes: secret then public.
pub fn read_keypair(path: &Path) -> Result<Keypair, WalletError> {
    let text = fs::read_to_string(path).map_err(|source| WalletError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bytes: Vec<u8> = serde_json::from_str(&text).map_err(|source| WalletError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.len() != KEYPAIR_LENGTH {
        return Err(WalletError::Malformed {
            path: path.to_path_buf(),
            reason: format!("expected {KEYPAIR_LENGTH} bytes, got {}", bytes.len()),
        });
    }
    let keypair = keypair_from_seed(&bytes[..32]).map_err(|err| WalletError::Malformed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    if keypair.pubkey().as_ref() != &bytes[32..] {
        return Err(WalletError::Malformed {
            path: path.to_path_buf(),
            reason: "public key does not belong to the secret key".into(),
        });
    }
    Ok(keypair)
}

pub fn write_keypair(keypair: &Keypair, path: &Path, force: bool) -> Result<(), WalletError> {
    let io_err = |source: std::io::Error| WalletError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut file = options.open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::AlreadyExists {
            WalletError::Exists(path.to_path_buf())
        } else {
            io_err(source)
        }
    })?;
    let json = serde_json::to_string(&keypair.to_bytes().to_vec()).map_err(|source| {
        WalletError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    file.write_all(json.as_bytes()).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("id.json");
        let keypair = generate();
        write_keypair(&keypair, &path, false).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with('['));
        let loaded = read_keypair(&path).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn refuses_to_clobber_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");
        write_keypair(&generate(), &path, false).unwrap();
        assert!(matches!(
            write_keypair(&generate(), &path, false),
            Err(WalletError::Exists(_))
        ));
        let replacement = generate();
        write_keypair(&replacement, &path, true).unwrap();
        assert_eq!(read_keypair(&path).unwrap().pubkey(), replacement.pubkey());
    }

    #[test]
    fn rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let short = dir.path().join("short.json");
        fs::write(&short, "[1,2,3]").unwrap();
        assert!(matches!(
            read_keypair(&short),
            Err(WalletError::Malformed { .. })
        ));

        // public half that does not belong to the secret half
        let mut bytes = generate().to_bytes();
        bytes[40] ^= 0xff;
        let mismatched = dir.path().join("mismatched.json");
        fs::write(&mismatched, serde_json::to_string(&bytes.to_vec()).unwrap()).unwrap();
        assert!(matches!(
            read_keypair(&mismatched),
            Err(WalletError::Malformed { .. })
        ));

        let text = dir.path().join("text.json");
        fs::write(&text, "not json").unwrap();
        assert!(matches!(read_keypair(&text), Err(WalletError::Json { .. })));
    }
}
