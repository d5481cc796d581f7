use std::env;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;

use crate::types::WafTunnelResult;

/// Environment variable to override the path to the fio binary used to generate the write
/// workload.
pub const WAF_TUNNEL_FIO_PATH_ENV: &str = "WAF_TUNNEL_FIO_PATH";

/// Get the path to the fio binary.
///
/// If the [`WAF_TUNNEL_FIO_PATH_ENV`] environment variable is set, its value is used as the path
/// to the fio binary. If it is not set, the default value "fio" is used, which assumes that the
/// binary is available in the system's PATH.
pub fn fio_path() -> WafTunnelResult<PathBuf> {
    match env::var(WAF_TUNNEL_FIO_PATH_ENV).ok().as_deref() {
        Some("") => {
            bail!("'{WAF_TUNNEL_FIO_PATH_ENV}' set to empty string");
        }
        Some("fio") | None => which::which("fio").with_context(|| {
            format!(
                "fio binary not found in PATH. Please install fio or set '{WAF_TUNNEL_FIO_PATH_ENV}' to the correct path."
            )
        }),
        Some(path) => {
            let fio_path = PathBuf::from(path);
            if !fio_path.exists() {
                bail!(
                    "Path to fio binary overwritten with '{WAF_TUNNEL_FIO_PATH_ENV}={path}' but that path doesn't exist",
                    path = fio_path.display()
                );
            }
            Ok(fio_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    // These cases share the one environment variable, so they run as a single test rather than
    // racing each other across test threads.
    #[test]
    fn fio_path_follows_the_env_override() {
        env::set_var(WAF_TUNNEL_FIO_PATH_ENV, "/non/existent/path/to/fio");
        assert!(fio_path().is_err());

        let temp = NamedTempFile::new().expect("failed to create temp file");
        let test_path = temp.path().to_str().expect("failed to get temp file path");
        env::set_var(WAF_TUNNEL_FIO_PATH_ENV, test_path);
        let result = fio_path().expect("failed to get fio path");
        assert_eq!(result, PathBuf::from(test_path));

        env::set_var(WAF_TUNNEL_FIO_PATH_ENV, "");
        assert!(fio_path().is_err());

        env::remove_var(WAF_TUNNEL_FIO_PATH_ENV);
    }
}
