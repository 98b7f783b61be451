use crate::types::VerifiedOrganization;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const PROGRAMS_FILE_NAME: &str = "programs.yml";
pub const ORGANIZATIONS_FILE_NAME: &str = "organizations.yml";

/// Source repository (`owner/name`) to its release tags, oldest first.
pub type ProgramSpec = IndexMap<String, Vec<String>>;

pub type Organizations = BTreeMap<String, VerifiedOrganization>;

#[derive(Debug, thiserror::Error)]
pub enum ProgramsError {
    #[error("failed to read {0}: {1}")]
    Read(String, std::io::Error),
    #[error("failed to parse yaml in {0}: {1}")]
    Parse(String, serde_yaml::Error),
    #[error("no tags declared for {0}")]
    NoTags(String),
}

#[derive(Debug, Deserialize)]
struct OrganizationEntry {
    name: String,
    #[serde(default)]
    website: Option<String>,
}

/// A single declared `(repo, tag)` pair together with whether it is the
/// latest release of its repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredBuild {
    pub repo: String,
    pub tag: String,
    pub latest: bool,
}

pub fn load_programs(path: &Path) -> Result<ProgramSpec, ProgramsError> {
    let label = path.display().to_string();
    let content =
        std::fs::read_to_string(path).map_err(|err| ProgramsError::Read(label.clone(), err))?;
    parse_programs(&content).map_err(|err| match err {
        ProgramsError::Parse(_, err) => ProgramsError::Parse(label, err),
        other => other,
    })
}

pub fn parse_programs(content: &str) -> Result<ProgramSpec, ProgramsError> {
    if content.trim().is_empty() {
        return Ok(ProgramSpec::new());
    }
    let programs: ProgramSpec = serde_yaml::from_str(content)
        .map_err(|err| ProgramsError::Parse(PROGRAMS_FILE_NAME.to_string(), err))?;
    for (repo, tags) in &programs {
        if tags.is_empty() {
            return Err(ProgramsError::NoTags(repo.clone()));
        }
    }
    Ok(programs)
}

pub fn load_organizations(path: &Path) -> Result<Organizations, ProgramsError> {
    let label = path.display().to_string();
    let content =
        std::fs::read_to_string(path).map_err(|err| ProgramsError::Read(label.clone(), err))?;
    parse_organizations(&content).map_err(|err| match err {
        ProgramsError::Parse(_, err) => ProgramsError::Parse(label, err),
        other => other,
    })
}

/// The mapping key is the organization's GitHub name and is copied into the
/// `github` field of each entry.
pub fn parse_organizations(content: &str) -> Result<Organizations, ProgramsError> {
    if content.trim().is_empty() {
        return Ok(Organizations::new());
    }
    let entries: BTreeMap<String, OrganizationEntry> = serde_yaml::from_str(content)
        .map_err(|err| ProgramsError::Parse(ORGANIZATIONS_FILE_NAME.to_string(), err))?;
    Ok(entries
        .into_iter()
        .map(|(github, entry)| {
            let org = VerifiedOrganization {
                name: entry.name,
                github: github.clone(),
                website: entry.website,
            };
            (github, org)
        })
        .collect())
}

/// Flattens the declared programs into `(repo, tag)` pairs in declaration order. The last
/// declared tag of each repository is its latest release.
pub fn declared_builds(programs: &ProgramSpec) -> Vec<DeclaredBuild> {
    let mut builds = Vec::new();
    for (repo, tags) in programs {
        let last = tags.len().saturating_sub(1);
        for (position, tag) in tags.iter().enumerate() {
            builds.push(DeclaredBuild {
                repo: repo.clone(),
                tag: tag.clone(),
                latest: position == last,
            });
        }
    }
    builds
}
