//! Submission directory materialisation.
//!
//! A submission is a directory named after the submission slug containing:
//!
//! ```text
//! <submissions_dir>/<name>/
//! ├── btcvol/            copy of the reference support library
//! ├── main.py            rewritten model code
//! └── requirements.txt   detected dependencies
//! ```
//!
//! Building is destructive: an existing directory with the same name is
//! removed first. A failure part-way leaves the directory as-is; re-running
//! overwrites it.

pub mod requirements;
pub mod source;

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::config::{ArtifactSettings, PathSettings};
use crate::error::{SubmitError, SubmitResult};
use crate::types::SubmissionName;

/// A submission directory written to disk.
#[derive(Debug, Clone)]
pub struct BuiltSubmission {
    /// Submission slug.
    pub name: SubmissionName,
    /// Submission directory.
    pub dir: PathBuf,
    /// Path of the generated entry-point file.
    pub entry_point: PathBuf,
    /// Pinned requirements written to the manifest.
    pub requirements: Vec<String>,
    /// Whether a previous submission with the same name was replaced.
    pub replaced: bool,
}

/// Writes submission directories.
#[derive(Debug, Clone)]
pub struct SubmissionBuilder {
    submissions_dir: PathBuf,
    support_library: PathBuf,
    artifact: ArtifactSettings,
}

impl SubmissionBuilder {
    /// Create a builder from the configured paths and artifact names.
    #[must_use]
    pub fn new(paths: &PathSettings, artifact: &ArtifactSettings) -> Self {
        Self {
            submissions_dir: paths.submissions_dir.clone(),
            support_library: paths.support_library.clone(),
            artifact: artifact.clone(),
        }
    }

    /// Directory a submission with this name is written to.
    #[must_use]
    pub fn submission_dir(&self, name: &SubmissionName) -> PathBuf {
        self.submissions_dir.join(name.as_str())
    }

    /// Build the submission directory for extracted model code.
    #[instrument(skip(self, code, name), fields(submission = %name))]
    pub fn build(&self, code: &str, name: &SubmissionName) -> SubmitResult<BuiltSubmission> {
        if !self.support_library.is_dir() {
            return Err(SubmitError::SupportLibraryMissing(
                self.support_library.clone(),
            ));
        }

        let dir = self.submission_dir(name);
        self.ensure_support_outside(&dir)?;

        let replaced = dir.exists();
        if replaced {
            warn!(path = %dir.display(), "submission already exists, overwriting");
            std::fs::remove_dir_all(&dir).map_err(|e| SubmitError::submission_io(&dir, e))?;
        }

        std::fs::create_dir_all(&dir).map_err(|e| SubmitError::submission_io(&dir, e))?;

        let support_dest = dir.join(&self.artifact.support_dir_name);
        copy_tree(&self.support_library, &support_dest)
            .map_err(|e| SubmitError::submission_io(&support_dest, e))?;
        info!(from = %self.support_library.display(), "copied support library");

        let entry_code = source::prepare_entry_point(code);
        let entry_point = dir.join(&self.artifact.entry_point);
        std::fs::write(&entry_point, &entry_code)
            .map_err(|e| SubmitError::submission_io(&entry_point, e))?;

        let deps = requirements::detect_requirements(&entry_code);
        let manifest = dir.join(&self.artifact.requirements);
        std::fs::write(&manifest, requirements::render(&deps))
            .map_err(|e| SubmitError::submission_io(&manifest, e))?;

        info!(
            path = %dir.display(),
            requirements = %deps.join(", "),
            "submission written"
        );

        Ok(BuiltSubmission {
            name: name.clone(),
            dir,
            entry_point,
            requirements: deps.into_iter().map(str::to_owned).collect(),
            replaced,
        })
    }

    /// Refuse to rebuild a directory that holds the support library itself.
    fn ensure_support_outside(&self, dir: &Path) -> SubmitResult<()> {
        if !dir.exists() {
            return Ok(());
        }

        let support = self
            .support_library
            .canonicalize()
            .map_err(|e| SubmitError::submission_io(&self.support_library, e))?;
        let target = dir
            .canonicalize()
            .map_err(|e| SubmitError::submission_io(dir, e))?;

        if support.starts_with(&target) {
            return Err(SubmitError::SupportLibraryInSubmission {
                submission: dir.to_owned(),
                support_library: self.support_library.clone(),
            });
        }
        Ok(())
    }
}

/// Recursively copy a directory tree. Symlinks are copied as the files they
/// point to.
fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        let target = dest.join(entry.file_name());

        if path.is_dir() {
            copy_tree(&path, &target)?;
        } else {
            std::fs::copy(&path, &target)?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> SubmissionBuilder {
        let support = dir.path().join("reference/btcvol");
        std::fs::create_dir_all(support.join("utils")).unwrap();
        std::fs::write(support.join("__init__.py"), "").unwrap();
        std::fs::write(support.join("tracker.py"), "class TrackerBase: ...\n").unwrap();
        std::fs::write(support.join("utils/io.py"), "def load(): ...\n").unwrap();

        let paths = PathSettings {
            submissions_dir: dir.path().join("submissions"),
            registry_file: dir.path().join("models.dev.yml"),
            support_library: support,
        };
        SubmissionBuilder::new(&paths, &ArtifactSettings::default())
    }

    #[test]
    fn builds_full_layout() {
        let dir = TempDir::new().unwrap();
        let builder = setup(&dir);
        let name = SubmissionName::slugify("garch").unwrap();

        let built = builder
            .build("import pandas as pd\nclass T(TrackerBase):\n    pass\n", &name)
            .unwrap();

        assert_eq!(built.dir, dir.path().join("submissions/garch"));
        assert!(!built.replaced);
        assert!(built.dir.join("btcvol/__init__.py").is_file());
        assert!(built.dir.join("btcvol/utils/io.py").is_file());

        let main = std::fs::read_to_string(built.dir.join("main.py")).unwrap();
        assert!(main.starts_with("from btcvol.tracker import TrackerBase\n\n\n"));

        let reqs = std::fs::read_to_string(built.dir.join("requirements.txt")).unwrap();
        assert_eq!(reqs, "pandas>=2.0.0\n");
        assert_eq!(built.requirements, vec!["pandas>=2.0.0".to_owned()]);
    }

    #[test]
    fn rebuilding_replaces_previous_run() {
        let dir = TempDir::new().unwrap();
        let builder = setup(&dir);
        let name = SubmissionName::slugify("garch").unwrap();

        let first = builder.build("first = 1\n", &name).unwrap();
        std::fs::write(first.dir.join("stale.txt"), "left over").unwrap();

        let second = builder.build("second = 2\n", &name).unwrap();
        assert!(second.replaced);
        assert!(!second.dir.join("stale.txt").exists());
        assert_eq!(
            std::fs::read_to_string(second.dir.join("main.py")).unwrap(),
            "second = 2\n"
        );

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("submissions"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_support_library_is_not_found() {
        let dir = TempDir::new().unwrap();
        let paths = PathSettings {
            submissions_dir: dir.path().join("submissions"),
            registry_file: dir.path().join("models.dev.yml"),
            support_library: dir.path().join("nope"),
        };
        let builder = SubmissionBuilder::new(&paths, &ArtifactSettings::default());
        let name = SubmissionName::slugify("garch").unwrap();

        let err = builder.build("x = 1", &name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!dir.path().join("submissions/garch").exists());
    }

    #[test]
    fn name_holding_support_library_is_rejected() {
        let dir = TempDir::new().unwrap();
        let submissions = dir.path().join("submissions");
        let support = submissions.join("model-1/btcvol");
        std::fs::create_dir_all(&support).unwrap();
        std::fs::write(support.join("tracker.py"), "class TrackerBase: ...\n").unwrap();

        let paths = PathSettings {
            submissions_dir: submissions.clone(),
            registry_file: dir.path().join("models.dev.yml"),
            support_library: support.clone(),
        };
        let builder = SubmissionBuilder::new(&paths, &ArtifactSettings::default());
        let name = SubmissionName::slugify("model-1").unwrap();

        let err = builder.build("x = 1", &name).unwrap_err();
        assert!(matches!(err, SubmitError::SupportLibraryInSubmission { .. }));
        assert!(support.join("tracker.py").is_file());
        assert!(!submissions.join("model-1/main.py").exists());

        let other = SubmissionName::slugify("model-2").unwrap();
        let built = builder.build("x = 1", &other).unwrap();
        assert!(built.dir.join("btcvol/tracker.py").is_file());
    }
}
