use anyhow::Result;
use std::path::Path;
use uuid::Uuid;

/// Return the auth token for this daemon instance.
///
/// On first call, generates a random 32-character hex token and writes it to
/// `{data_dir}/auth_token` with user-only read/write permissions (mode 0600
/// on Unix). On subsequent calls, reads and returns the existing token.
///
/// The token file must be kept secret — it is the only credential protecting
/// the local WebSocket port from other processes on the same machine.
pub fn get_or_create_token(data_dir: &Path) -> Result<String> {
    let path = data_dir.join("auth_token");

    if path.exists() {
        let token = std::fs::read_to_string(&path)?.trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    // Generate a new token (UUID v4, hex without dashes = 32 chars)
    let token = Uuid::new_v4().to_string().replace('-', "");

    std::fs::create_dir_all(data_dir)?;
    std::fs::write(&path, &token)?;

    // Restrict to owner read/write only on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(token)
}

/// Read the auth token from the daemon's data directory.
///
/// Returns an error if the file does not exist (daemon not yet started).
pub fn read_token(data_dir: &Path) -> Result<String> {
    let path = data_dir.join("auth_token");
    let token = std::fs::read_to_string(&path).map_err(|e| {
        anyhow::anyhow!(
            "could not read auth token from {}: {e}\n  Is the daemon running? Start it with `taskd serve`.",
            path.display()
        )
    })?;
    Ok(token.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let first = get_or_create_token(dir.path()).unwrap();
        let second = get_or_create_token(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn read_token_fails_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_token(dir.path()).is_err());
    }
}
