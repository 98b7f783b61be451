use crate::fetch::raw_artifact_url;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use verified_core::config::ArtifactsSection;
use verified_core::label::make_program_label;
use verified_core::programs::Organizations;
use verified_core::types::{
    ArtifactInfo, Author, Build, BuildDetails, BuildInfo, GitHubInfo, ProgramDetails, ProgramInfo,
    VerifiableProgramRelease,
};

pub const OUTPUT_ROOT: &str = "artifacts/";
pub const VERIFIABLE_DIR: &str = "artifacts/verifiable/";
pub const TRIMMED_DIR: &str = "artifacts/verifiable-trimmed/";
pub const IDL_DIR: &str = "artifacts/idl/";
pub const BINARY_EXTENSION: &str = ".so";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("build {slug} has no trimmed artifact for program {program}")]
    MissingTrimmedArtifact { slug: String, program: String },
    #[error("build {slug} has no address for program {program}")]
    MissingAddress { slug: String, program: String },
    #[error("build {slug} publishes an unusable {kind} {value:?}")]
    UnsafeIdentifier {
        slug: String,
        kind: &'static str,
        value: String,
    },
}

/// Everything published for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedBuild {
    pub addresses: BTreeMap<String, String>,
    pub checksums: BTreeMap<String, String>,
    pub info: Option<BuildInfo>,
    pub sizes: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledBuild {
    pub details: BuildDetails,
    pub releases: Vec<VerifiableProgramRelease>,
}

/// Binary artifacts are served from the repository's raw endpoint, text
/// artifacts from the raw content host.
pub fn artifact_download_url(artifacts: &ArtifactsSection, build: &Build, path: &str) -> String {
    let file = path.strip_prefix(OUTPUT_ROOT).unwrap_or(path);
    if path.ends_with(BINARY_EXTENSION) {
        format!(
            "{}/raw/{}/{}",
            artifacts.repo_url.trim_end_matches('/'),
            build.branch(),
            file
        )
    } else {
        raw_artifact_url(artifacts, build, file)
    }
}

pub fn collect_artifacts(
    artifacts: &ArtifactsSection,
    build: &Build,
    checksums: &BTreeMap<String, String>,
    sizes: Option<&BTreeMap<String, u64>>,
) -> Vec<ArtifactInfo> {
    checksums
        .iter()
        .map(|(checksum, path)| ArtifactInfo {
            path: path.clone(),
            size: sizes.and_then(|sizes| sizes.get(path).copied()),
            checksum: checksum.clone(),
            download_url: artifact_download_url(artifacts, build, path),
        })
        .collect()
}

/// Returns the program name when `path` is a program binary directly under
/// the verifiable output directory.
pub fn program_binary_name(path: &str) -> Option<&str> {
    let name = path
        .strip_prefix(VERIFIABLE_DIR)?
        .strip_suffix(BINARY_EXTENSION)?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(name)
}

/// Checksums, addresses and program names become index file names, so they
/// are limited to ASCII alphanumerics, `_` and `-`.
pub fn is_safe_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn check_identifier(build: &Build, kind: &'static str, value: &str) -> Result<(), ReconcileError> {
    if is_safe_identifier(value) {
        return Ok(());
    }
    Err(ReconcileError::UnsafeIdentifier {
        slug: build.slug.clone(),
        kind,
        value: value.to_string(),
    })
}

/// Path-keyed view over a build's checksum-keyed artifacts.
struct ArtifactsByPath<'a> {
    by_path: HashMap<&'a str, &'a ArtifactInfo>,
}

impl<'a> ArtifactsByPath<'a> {
    fn new(artifacts: &'a [ArtifactInfo]) -> Self {
        ArtifactsByPath {
            by_path: artifacts
                .iter()
                .map(|artifact| (artifact.path.as_str(), artifact))
                .collect(),
        }
    }

    fn get(&self, path: &str) -> Option<&'a ArtifactInfo> {
        self.by_path.get(path).copied()
    }
}

pub fn reconcile_build(
    artifacts: &ArtifactsSection,
    organizations: &Organizations,
    build: &Build,
    fetched: FetchedBuild,
) -> Result<ReconciledBuild, ReconcileError> {
    for checksum in fetched.checksums.keys() {
        check_identifier(build, "checksum", checksum)?;
    }
    for address in fetched.addresses.values() {
        check_identifier(build, "address", address)?;
    }
    let author = Author {
        name: build.org.clone(),
        info: organizations.get(&build.org).cloned(),
    };
    let artifact_list = collect_artifacts(
        artifacts,
        build,
        &fetched.checksums,
        fetched.sizes.as_ref(),
    );
    let details = BuildDetails {
        build: build.clone(),
        addresses: fetched.addresses,
        info: fetched.info,
        artifacts: artifact_list,
        workspace_url: format!(
            "{}/tree/{}",
            artifacts.repo_url.trim_end_matches('/'),
            build.branch()
        ),
        author,
    };

    let mut releases = Vec::new();
    {
        let by_path = ArtifactsByPath::new(&details.artifacts);
        for artifact in &details.artifacts {
            let Some(name) = program_binary_name(&artifact.path) else {
                continue;
            };
            check_identifier(build, "program name", name)?;
            let trimmed = by_path
                .get(&format!("{}{}{}", TRIMMED_DIR, name, BINARY_EXTENSION))
                .ok_or_else(|| ReconcileError::MissingTrimmedArtifact {
                    slug: build.slug.clone(),
                    program: name.to_string(),
                })?;
            let idl = by_path.get(&format!("{}{}.json", IDL_DIR, name));
            let address =
                details
                    .addresses
                    .get(name)
                    .ok_or_else(|| ReconcileError::MissingAddress {
                        slug: build.slug.clone(),
                        program: name.to_string(),
                    })?;

            let program = ProgramInfo {
                id: format!("{}/{}/{}", build.org, build.repo_name, name),
                name: name.to_string(),
                author: details.author.clone(),
                label: make_program_label(&details.author, name),
                address: address.clone(),
                github: GitHubInfo {
                    organization: build.org.clone(),
                    repo: build.repo_name.clone(),
                },
            };
            releases.push(VerifiableProgramRelease {
                id: format!("@{}/{}@{}", build.org, name, build.tag),
                program,
                artifact: artifact.clone(),
                trimmed_artifact: trimmed.clone(),
                idl: idl.cloned(),
                build: details.clone(),
            });
        }
    }

    Ok(ReconciledBuild { details, releases })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    pub artifacts: usize,
    pub orgs: usize,
    pub repos: usize,
    pub programs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    pub last_updated: DateTime<Utc>,
    pub stats: IndexStats,
}

/// Accumulated output of an index run, owned by the driver.
#[derive(Debug, Clone, Default)]
pub struct IndexState {
    /// Keyed by program id; the first build that publishes a program defines it.
    pub programs: IndexMap<String, ProgramInfo>,
    pub builds: Vec<BuildDetails>,
    pub releases: Vec<VerifiableProgramRelease>,
    pub artifacts: BTreeMap<String, ArtifactInfo>,
}

impl IndexState {
    pub fn record(&mut self, reconciled: ReconciledBuild) {
        for artifact in &reconciled.details.artifacts {
            self.artifacts
                .entry(artifact.checksum.clone())
                .or_insert_with(|| artifact.clone());
        }
        for release in &reconciled.releases {
            self.programs
                .entry(release.program.id.clone())
                .or_insert_with(|| release.program.clone());
        }
        self.builds.push(reconciled.details);
        self.releases.extend(reconciled.releases);
    }

    /// Groups every release under its program, in first-seen order.
    pub fn program_details(&self) -> Vec<ProgramDetails> {
        let mut grouped: IndexMap<&str, Vec<VerifiableProgramRelease>> = IndexMap::new();
        for release in &self.releases {
            grouped
                .entry(release.program.id.as_str())
                .or_default()
                .push(release.clone());
        }
        grouped
            .into_iter()
            .filter_map(|(id, releases)| {
                self.programs.get(id).map(|program| ProgramDetails {
                    program: program.clone(),
                    releases,
                })
            })
            .collect()
    }

    pub fn program_list(&self) -> Vec<ProgramInfo> {
        self.programs.values().cloned().collect()
    }

    pub fn summary(&self, last_updated: DateTime<Utc>) -> IndexSummary {
        let orgs: BTreeSet<&str> = self
            .builds
            .iter()
            .map(|details| details.build.org.as_str())
            .collect();
        let repos: BTreeSet<String> = self
            .builds
            .iter()
            .map(|details| details.build.repo())
            .collect();
        IndexSummary {
            last_updated,
            stats: IndexStats {
                artifacts: self.artifacts.len(),
                orgs: orgs.len(),
                repos: repos.len(),
                programs: self.programs.len(),
            },
        }
    }
}
