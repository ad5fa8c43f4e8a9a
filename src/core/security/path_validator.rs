use std::io;
use std::path::{Path, PathBuf};

use crate::core::config::Config;

/// Errors that can occur during path validation
#[derive(Debug, thiserror::Error)]
pub enum PathSecurityError {
    #[error("Path '{path}' is outside allowed root directory '{root}'")]
    OutsideRootDirectory { path: PathBuf, root: PathBuf },

    #[error("Symlink '{path}' is not allowed by configuration")]
    SymlinkNotAllowed { path: PathBuf },

    #[error("Cannot canonicalize path '{path}': {error}")]
    CannotCanonicalize { path: PathBuf, error: io::Error },

    #[error("Path does not exist: '{path}'")]
    PathNotFound { path: PathBuf },

    #[error("Output file already exists: '{path}' (set overwrite=true to replace it)")]
    AlreadyExists { path: PathBuf },

    #[error("Output path has no file name: '{path}'")]
    MissingFileName { path: PathBuf },

    #[error("IO error for path '{path}': {error}")]
    IoError { path: PathBuf, error: io::Error },
}

/// Validates that an existing input path is within the configured security boundaries.
///
/// 1. Canonicalizes the input path to resolve `.`, `..`, and symlinks
/// 2. If a root path is configured, ensures the canonical path is within that root
/// 3. Rejects symlinks when the configuration disallows them
///
/// # Examples
///
/// ```rust,ignore
/// let config = Config::from_env();
/// let safe_path = validate_path("/home/user/pictures/cat.jpg", &config)?;
/// ```
pub fn validate_path(input_path: &str, config: &Config) -> Result<PathBuf, PathSecurityError> {
    let path = Path::new(input_path);

    let Some(ref root) = config.security.root_path else {
        return canonicalize_path(path);
    };
    let canonical_root = canonical_root(root)?;

    if !path.exists() {
        return Err(PathSecurityError::PathNotFound {
            path: path.to_path_buf(),
        });
    }

    if path.is_symlink() && !config.security.allow_symlinks {
        return Err(PathSecurityError::SymlinkNotAllowed {
            path: path.to_path_buf(),
        });
    }

    let canonical_path = path.canonicalize().map_err(|e| PathSecurityError::CannotCanonicalize {
        path: path.to_path_buf(),
        error: e,
    })?;

    ensure_within_root(canonical_path, &canonical_root)
}

/// Validates a path a tool is about to write.
///
/// The file itself may not exist yet, so the parent directory is validated
/// instead and the file name re-attached. An existing file is only accepted
/// when `overwrite` is set.
pub fn validate_output_path(
    output_path: &str,
    config: &Config,
    overwrite: bool,
) -> Result<PathBuf, PathSecurityError> {
    let path = Path::new(output_path);

    let file_name = path
        .file_name()
        .ok_or_else(|| PathSecurityError::MissingFileName {
            path: path.to_path_buf(),
        })?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = canonicalize_path(parent)?;
    let target = match config.security.root_path {
        Some(ref root) => ensure_within_root(canonical_parent, &canonical_root(root)?)?,
        None => canonical_parent,
    }
    .join(file_name);

    if target.is_symlink() && !config.security.allow_symlinks {
        return Err(PathSecurityError::SymlinkNotAllowed { path: target });
    }

    if target.exists() && !overwrite {
        return Err(PathSecurityError::AlreadyExists { path: target });
    }

    Ok(target)
}

fn canonical_root(root: &Path) -> Result<PathBuf, PathSecurityError> {
    root.canonicalize().map_err(|e| PathSecurityError::IoError {
        path: root.to_path_buf(),
        error: e,
    })
}

fn ensure_within_root(path: PathBuf, root: &Path) -> Result<PathBuf, PathSecurityError> {
    if path.starts_with(root) {
        Ok(path)
    } else {
        Err(PathSecurityError::OutsideRootDirectory {
            path,
            root: root.to_path_buf(),
        })
    }
}

fn canonicalize_path(path: &Path) -> Result<PathBuf, PathSecurityError> {
    path.canonicalize().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            PathSecurityError::PathNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PathSecurityError::CannotCanonicalize {
                path: path.to_path_buf(),
                error: e,
            }
        }
    })
}
