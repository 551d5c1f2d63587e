//! Locating class artifacts under build output directories

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

const CLASS_GLOB: &str = "**/*.class";
const EXCLUDED_GLOBS: &[&str] = &["**/module-info.class"];

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("bad glob {pattern}"))?);
    }
    Ok(builder.build()?)
}

/// Every `*.class` file below the given roots, sorted and de-duplicated.
///
/// Ignore files are not honored: build output directories are usually
/// git-ignored themselves.
pub fn discover_class_files<P: AsRef<Path>>(roots: &[P]) -> Result<Vec<PathBuf>> {
    let include = build_globset(&[CLASS_GLOB])?;
    let exclude = build_globset(EXCLUDED_GLOBS)?;

    let mut files = Vec::new();
    for root in roots {
        let root = root.as_ref();
        let walker = WalkBuilder::new(root).standard_filters(false).build();
        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if include.is_match(path) && !exclude.is_match(path) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    tracing::debug!("Found {} class files under {} roots", files.len(), roots.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discovers_class_files_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("com/example/inner")).unwrap();
        fs::write(root.join("com/example/Foo.class"), b"").unwrap();
        fs::write(root.join("com/example/inner/Bar$1.class"), b"").unwrap();
        fs::write(root.join("com/example/notes.txt"), b"").unwrap();
        fs::write(root.join("module-info.class"), b"").unwrap();
        fs::write(root.join(".gitignore"), b"*.class\n").unwrap();

        let files = discover_class_files(&[root, root]).unwrap();
        let relative: Vec<PathBuf> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("com/example/Foo.class"),
                PathBuf::from("com/example/inner/Bar$1.class"),
            ]
        );
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(discover_class_files(&[dir.path().join("absent")]).is_err());
    }
}
