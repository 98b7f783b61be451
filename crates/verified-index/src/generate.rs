use crate::fetch::{ArtifactFetcher, FetchError, RemoteSource};
use crate::reconcile::{reconcile_build, FetchedBuild, IndexState, IndexSummary, ReconcileError};
use crate::writer::{IndexWriter, WriteError};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use verified_core::config::ArtifactsSection;
use verified_core::descriptor::{describe_build, BuildError};
use verified_core::programs::{declared_builds, Organizations, ProgramSpec};
use verified_core::types::Build;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Fetches everything published for a build. `None` when the required
/// addresses or checksums have not been published.
pub fn fetch_build(
    fetcher: &ArtifactFetcher<'_>,
    build: &Build,
) -> Result<Option<FetchedBuild>, FetchError> {
    let Some(addresses) = fetcher.fetch_build_addresses(build)? else {
        warn!(repo = %build.repo(), tag = %build.tag, "addresses not published, skipping build");
        return Ok(None);
    };
    let Some(checksums) = fetcher.fetch_build_checksums(build)? else {
        warn!(repo = %build.repo(), tag = %build.tag, "checksums not published, skipping build");
        return Ok(None);
    };
    let info = fetcher.fetch_build_info(build)?;
    if info.is_none() {
        warn!(repo = %build.repo(), tag = %build.tag, "build info not published");
    }
    let sizes = fetcher.fetch_sizes(build)?;
    if sizes.is_none() {
        warn!(repo = %build.repo(), tag = %build.tag, "artifact sizes not published");
    }
    Ok(Some(FetchedBuild {
        addresses,
        checksums,
        info,
        sizes,
    }))
}

/// Builds the full index for every declared `(repo, tag)` in declaration
/// order and writes it below the writer's root.
pub fn generate_index(
    source: &dyn RemoteSource,
    artifacts: &ArtifactsSection,
    programs: &ProgramSpec,
    organizations: &Organizations,
    writer: &IndexWriter,
    now: DateTime<Utc>,
) -> Result<IndexSummary, IndexError> {
    let fetcher = ArtifactFetcher::new(source, artifacts);
    let mut state = IndexState::default();

    for declared in declared_builds(programs) {
        let build = describe_build(&declared.repo, &declared.tag)?;
        info!(repo = %declared.repo, tag = %declared.tag, latest = declared.latest, "processing build");

        let Some(fetched) = fetch_build(&fetcher, &build)? else {
            continue;
        };
        let reconciled = reconcile_build(artifacts, organizations, &build, fetched)?;

        if declared.latest {
            for release in &reconciled.releases {
                match fetcher.fetch_idl(&build, &release.program.name)? {
                    Some(idl) => writer.write_idl(&release.program.address, &idl)?,
                    None => warn!(
                        repo = %declared.repo,
                        tag = %declared.tag,
                        program = %release.program.name,
                        "idl not published"
                    ),
                }
            }
        }

        writer.write_releases(&reconciled.releases, declared.latest)?;
        info!(
            repo = %declared.repo,
            tag = %declared.tag,
            programs = reconciled.releases.len(),
            "indexed build"
        );
        state.record(reconciled);
    }

    writer.write_program_details(&state.program_details())?;
    let summary = state.summary(now);
    writer.write_aggregates(&state, &summary)?;
    Ok(summary)
}
