use crate::reconcile::{IndexState, IndexSummary};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::debug;
use verified_core::types::{ProgramDetails, VerifiableProgramRelease};

pub const LATEST_ALIAS: &str = "latest";

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to create directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("failed to serialize {0}: {1}")]
    Serialize(PathBuf, serde_json::Error),
}

pub fn release_checksum_path(checksum: &str) -> PathBuf {
    PathBuf::from("releases/by-checksum").join(format!("{}.json", checksum))
}

pub fn release_trimmed_checksum_path(checksum: &str) -> PathBuf {
    PathBuf::from("releases/by-trimmed-checksum").join(format!("{}.json", checksum))
}

/// `releases/by-name/@org/program@tag.json`
pub fn release_name_path(org: &str, program: &str, tag: &str) -> PathBuf {
    PathBuf::from("releases/by-name")
        .join(format!("@{}", org))
        .join(format!("{}@{}.json", program, tag))
}

pub fn artifact_path(checksum: &str) -> PathBuf {
    PathBuf::from("artifacts").join(format!("{}.json", checksum))
}

pub fn idl_path(address: &str) -> PathBuf {
    PathBuf::from("idls").join(format!("{}.json", address))
}

pub fn program_details_path(address: &str) -> PathBuf {
    PathBuf::from("programs").join(format!("{}.json", address))
}

/// Every index path a release is written to.
pub fn release_paths(release: &VerifiableProgramRelease, latest: bool) -> Vec<PathBuf> {
    let org = &release.program.github.organization;
    let name = &release.program.name;
    let mut paths = vec![
        release_checksum_path(&release.artifact.checksum),
        release_trimmed_checksum_path(&release.trimmed_artifact.checksum),
        release_name_path(org, name, &release.build.build.tag),
    ];
    if latest {
        paths.push(release_name_path(org, name, LATEST_ALIAS));
    }
    paths
}

/// Writes index records below a root directory. Parent directories are
/// created on first write into them.
#[derive(Debug, Clone)]
pub struct IndexWriter {
    root: PathBuf,
}

impl IndexWriter {
    pub fn new(root: impl Into<PathBuf>) -> IndexWriter {
        IndexWriter { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        relative: &Path,
        value: &T,
    ) -> Result<PathBuf, WriteError> {
        let path = self.root.join(relative);
        let content =
            serde_json::to_string(value).map_err(|err| WriteError::Serialize(path.clone(), err))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| WriteError::CreateDir(parent.to_path_buf(), err))?;
        }
        std::fs::write(&path, content).map_err(|err| WriteError::Write(path.clone(), err))?;
        debug!(path = %path.display(), "wrote");
        Ok(path)
    }

    pub fn write_release(
        &self,
        release: &VerifiableProgramRelease,
        latest: bool,
    ) -> Result<(), WriteError> {
        for relative in release_paths(release, latest) {
            self.write_json(&relative, release)?;
        }
        Ok(())
    }

    /// Writes the releases of one build concurrently. They target disjoint
    /// paths, so ordering between them does not matter.
    pub fn write_releases(
        &self,
        releases: &[VerifiableProgramRelease],
        latest: bool,
    ) -> Result<(), WriteError> {
        thread::scope(|scope| {
            let handles: Vec<_> = releases
                .iter()
                .map(|release| scope.spawn(move || self.write_release(release, latest)))
                .collect();
            let mut result = Ok(());
            for handle in handles {
                let outcome = match handle.join() {
                    Ok(outcome) => outcome,
                    Err(payload) => std::panic::resume_unwind(payload),
                };
                if result.is_ok() {
                    result = outcome;
                }
            }
            result
        })
    }

    pub fn write_idl(&self, address: &str, idl: &serde_json::Value) -> Result<(), WriteError> {
        self.write_json(&idl_path(address), idl)?;
        Ok(())
    }

    pub fn write_program_details(&self, details: &[ProgramDetails]) -> Result<(), WriteError> {
        for entry in details {
            self.write_json(&program_details_path(&entry.program.address), entry)?;
        }
        Ok(())
    }

    /// Writes per-artifact records, the aggregate lists and the summary.
    pub fn write_aggregates(
        &self,
        state: &IndexState,
        summary: &IndexSummary,
    ) -> Result<(), WriteError> {
        for artifact in state.artifacts.values() {
            if artifact.path.ends_with(crate::reconcile::BINARY_EXTENSION) {
                self.write_json(&artifact_path(&artifact.checksum), artifact)?;
            }
        }
        self.write_json(Path::new("programs.json"), &state.program_list())?;
        self.write_json(Path::new("builds.json"), &state.builds)?;
        self.write_json(Path::new("artifacts.json"), &state.artifacts)?;
        self.write_json(Path::new("summary.json"), summary)?;
        Ok(())
    }
}
