use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a verified program build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub slug: String,
    pub org: String,
    pub repo_name: String,
    pub source: String,
    pub tag: String,
}

/// Miscellaneous information about a build, as published in `build-info.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub anchor_version: String,
    pub created_at: String,
    pub repo: String,
    pub tag: String,
    pub slug: String,
}

/// Information about an individual build artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactInfo {
    /// Path of the artifact relative to the build output tree.
    pub path: String,
    /// Size in bytes, when published.
    pub size: Option<u64>,
    pub checksum: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
}

/// A verified organization in `organizations.yml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedOrganization {
    pub name: String,
    pub github: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    /// GitHub user or organization name.
    pub name: String,
    pub info: Option<VerifiedOrganization>,
}

/// Full description of a verified program build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildDetails {
    pub build: Build,
    /// Program name to deployed address, for every program in the build.
    pub addresses: BTreeMap<String, String>,
    pub info: Option<BuildInfo>,
    pub artifacts: Vec<ArtifactInfo>,
    #[serde(rename = "workspaceURL")]
    pub workspace_url: String,
    pub author: Author,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitHubInfo {
    pub organization: String,
    pub repo: String,
}

/// Information about a program published to the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgramInfo {
    /// Stable identifier across releases: `org/repoName/programName`.
    pub id: String,
    /// Unscoped program name.
    pub name: String,
    pub author: Author,
    pub label: String,
    pub address: String,
    pub github: GitHubInfo,
}

/// One program at one tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableProgramRelease {
    /// `@org/programName@tag`
    pub id: String,
    pub program: ProgramInfo,
    pub artifact: ArtifactInfo,
    pub trimmed_artifact: ArtifactInfo,
    pub idl: Option<ArtifactInfo>,
    pub build: BuildDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgramDetails {
    pub program: ProgramInfo,
    pub releases: Vec<VerifiableProgramRelease>,
}
