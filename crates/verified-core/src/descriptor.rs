use crate::types::Build;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid repository format {0:?}, expected owner/name")]
    InvalidRepoFormat(String),
}

/// Derives the build identity for a `(repo, tag)` pair.
///
/// The slug addresses the build in the artifact store: `owner__name-tag`.
pub fn describe_build(repo: &str, tag: &str) -> Result<Build, BuildError> {
    let (org, repo_name) = repo
        .split_once('/')
        .filter(|(org, name)| !org.is_empty() && !name.is_empty() && !name.contains('/'))
        .ok_or_else(|| BuildError::InvalidRepoFormat(repo.to_string()))?;
    Ok(Build {
        slug: format!("{}__{}-{}", org, repo_name, tag),
        org: org.to_string(),
        repo_name: repo_name.to_string(),
        source: format!("https://github.com/{}/{}/tree/{}", org, repo_name, tag),
        tag: tag.to_string(),
    })
}

impl Build {
    pub fn repo(&self) -> String {
        format!("{}/{}", self.org, self.repo_name)
    }

    /// Branch of the artifact repository the build was published to.
    pub fn branch(&self) -> String {
        format!("verify-{}", self.slug)
    }
}
