//! Data directory layout and protection files.
//!
//! The server may be deployed behind a web server whose document root
//! contains the data directory, so each directory gets a `.htaccess` deny
//! rule and a blank `index.html` against direct listing. Harmless when the
//! deployment never serves the directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Create the data directory tree and return the geo cache path.
pub fn prepare_data_dir(data_dir: &str) -> Result<PathBuf> {
    let root = Path::new(data_dir);
    let cache = root.join("cache");
    std::fs::create_dir_all(&cache)
        .with_context(|| format!("creating data directory {}", cache.display()))?;
    protect_dir(root)?;
    protect_dir(&cache)?;
    Ok(cache)
}

/// Drop protection files into `dir` if they are not already there.
/// Existing files are left alone so operator edits survive restarts.
fn protect_dir(dir: &Path) -> Result<()> {
    let htaccess = dir.join(".htaccess");
    if !htaccess.exists() {
        std::fs::write(&htaccess, "Deny from all\n")
            .with_context(|| format!("writing {}", htaccess.display()))?;
    }
    let index = dir.join("index.html");
    if !index.exists() {
        std::fs::write(&index, "")
            .with_context(|| format!("writing {}", index.display()))?;
    }
    Ok(())
}
