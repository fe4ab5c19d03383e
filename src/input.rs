use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

/// Where one EDN document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Stdin => f.write_str("(stdin)"),
            Input::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Expand command-line paths and glob patterns into the inputs to read.
///
/// With neither, the only input is stdin. Directories are only accepted
/// with `recursive`, and contribute their `*.edn` files in name order.
pub fn collect(paths: &[PathBuf], globs: &[String], recursive: bool) -> Result<Vec<Input>> {
    if paths.is_empty() && globs.is_empty() {
        return Ok(vec![Input::Stdin]);
    }

    let mut inputs = Vec::new();
    for path in paths {
        if path.as_os_str() == "-" {
            inputs.push(Input::Stdin);
        } else if path.is_dir() {
            if !recursive {
                bail!("{} is a directory (use -r to read the .edn files in it)", path.display());
            }
            inputs.extend(walk(path)?);
        } else {
            inputs.push(Input::File(path.clone()));
        }
    }

    for pattern in globs {
        let entries = glob::glob(pattern)
            .with_context(|| format!("invalid glob pattern {:?}", pattern))?;
        for entry in entries {
            let path = entry?;
            if path.is_file() {
                inputs.push(Input::File(path));
            }
        }
    }
    Ok(inputs)
}

fn walk(dir: &Path) -> Result<Vec<Input>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("cannot walk {}", dir.display()))?;
        if entry.file_type().is_file() && is_edn(entry.path()) {
            found.push(Input::File(entry.into_path()));
        }
    }
    Ok(found)
}

fn is_edn(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "edn")
}
