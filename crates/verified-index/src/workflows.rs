use crate::fetch::{FetchError, RemoteSource};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use verified_core::config::Config;
use verified_core::descriptor::{describe_build, BuildError};
use verified_core::programs::{declared_builds, ProgramSpec};
use verified_core::types::Build;
use verified_core::workflow::{
    anchor_package_for_version, make_workflow_yaml, manifest_anchor_version, workflow_file_name,
    WorkflowError, WorkflowParams, MANIFEST_FILE_NAME,
};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowsError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("failed to read cached manifest {0}: {1}")]
    ReadCache(PathBuf, std::io::Error),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

pub fn manifest_url(raw_base_url: &str, build: &Build) -> String {
    format!(
        "{}/{}/{}/{}",
        raw_base_url.trim_end_matches('/'),
        build.repo(),
        build.tag,
        MANIFEST_FILE_NAME
    )
}

pub fn cached_manifest_path(cache_dir: &Path, build: &Build) -> PathBuf {
    cache_dir.join(&build.slug).join(MANIFEST_FILE_NAME)
}

/// Returns the source repository's manifest for a build. A previously cached
/// copy is always reused; a fetched copy is cached for later runs.
pub fn fetch_cached_manifest(
    source: &dyn RemoteSource,
    raw_base_url: &str,
    cache_dir: &Path,
    build: &Build,
) -> Result<Option<String>, WorkflowsError> {
    let cached = cached_manifest_path(cache_dir, build);
    match std::fs::read_to_string(&cached) {
        Ok(content) => {
            debug!(path = %cached.display(), "using cached manifest");
            return Ok(Some(content));
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(WorkflowsError::ReadCache(cached, err)),
    }

    let Some(content) = source.get(&manifest_url(raw_base_url, build))? else {
        warn!(repo = %build.repo(), tag = %build.tag, "manifest not found");
        return Ok(None);
    };
    if let Some(parent) = cached.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| WorkflowsError::Write(parent.to_path_buf(), err))?;
    }
    std::fs::write(&cached, &content).map_err(|err| WorkflowsError::Write(cached.clone(), err))?;
    Ok(Some(content))
}

/// Writes one workflow per declared `(repo, tag)`. Without a source, manifest
/// lookups are skipped and the default toolchain is used.
pub fn generate_workflows(
    source: Option<&dyn RemoteSource>,
    config: &Config,
    root: &Path,
    programs: &ProgramSpec,
) -> Result<Vec<PathBuf>, WorkflowsError> {
    let workflows_dir = config.paths.workflows_dir(root);
    let cache_dir = config.paths.cache_dir(root);
    std::fs::create_dir_all(&workflows_dir)
        .map_err(|err| WorkflowsError::Write(workflows_dir.clone(), err))?;

    let mut written = Vec::new();
    for declared in declared_builds(programs) {
        let build = describe_build(&declared.repo, &declared.tag)?;
        let manifest = match source {
            Some(source) => {
                fetch_cached_manifest(source, &config.sources.raw_base_url, &cache_dir, &build)?
            }
            None => None,
        };
        let version = match manifest {
            Some(manifest) => manifest_anchor_version(&manifest)?,
            None => None,
        };
        let params = WorkflowParams {
            repo: declared.repo.clone(),
            tag: declared.tag.clone(),
            slug: build.slug.clone(),
            anchor_package: anchor_package_for_version(version.as_deref()).to_string(),
            artifacts_repo: config.artifacts.repo_slug(),
        };
        let yaml = make_workflow_yaml(&params)?;
        let path = workflows_dir.join(workflow_file_name(&build.slug));
        std::fs::write(&path, yaml).map_err(|err| WorkflowsError::Write(path.clone(), err))?;
        info!(
            repo = %declared.repo,
            tag = %declared.tag,
            anchor = %params.anchor_package,
            "wrote workflow"
        );
        written.push(path);
    }
    Ok(written)
}
