use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use verified_core::config::ArtifactsSection;
use verified_core::types::{Build, BuildInfo};

pub const ADDRESSES_FILE: &str = "addresses.json";
pub const CHECKSUMS_FILE: &str = "checksums.json";
pub const BUILD_INFO_FILE: &str = "build-info.json";
pub const SIZES_FILE: &str = "sizes.json";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request to {url} failed ({status})")]
    Status { url: String, status: StatusCode },
    #[error("malformed document at {url}: {source}")]
    Malformed {
        url: String,
        source: serde_json::Error,
    },
    #[error("invalid size for {path} in {url}: {value}")]
    InvalidSize {
        url: String,
        path: String,
        value: String,
    },
}

/// A read-only remote document store. `Ok(None)` means the document does not
/// exist (HTTP 404); every other failure is an error.
pub trait RemoteSource {
    fn get(&self, url: &str) -> Result<Option<String>, FetchError>;
}

pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<HttpSource, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpSource { client })
    }
}

impl RemoteSource for HttpSource {
    fn get(&self, url: &str) -> Result<Option<String>, FetchError> {
        debug!(url, "GET");
        let response = self.client.get(url).send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(Some(response.text()?))
    }
}

/// URL of a file on the branch a build was published to.
pub fn raw_artifact_url(artifacts: &ArtifactsSection, build: &Build, file: &str) -> String {
    format!(
        "{}/{}/{}",
        artifacts.raw_base_url.trim_end_matches('/'),
        build.branch(),
        file
    )
}

/// Fetches the published documents of builds from the artifact store.
pub struct ArtifactFetcher<'a> {
    source: &'a dyn RemoteSource,
    artifacts: &'a ArtifactsSection,
}

impl<'a> ArtifactFetcher<'a> {
    pub fn new(source: &'a dyn RemoteSource, artifacts: &'a ArtifactsSection) -> Self {
        ArtifactFetcher { source, artifacts }
    }

    fn fetch_json<T: DeserializeOwned>(
        &self,
        build: &Build,
        file: &str,
    ) -> Result<Option<T>, FetchError> {
        let url = raw_artifact_url(self.artifacts, build, file);
        let Some(body) = self.source.get(&url)? else {
            return Ok(None);
        };
        let value =
            serde_json::from_str(&body).map_err(|source| FetchError::Malformed { url, source })?;
        Ok(Some(value))
    }

    /// Program name to deployed address.
    pub fn fetch_build_addresses(
        &self,
        build: &Build,
    ) -> Result<Option<BTreeMap<String, String>>, FetchError> {
        self.fetch_json(build, ADDRESSES_FILE)
    }

    /// Checksum to artifact path.
    pub fn fetch_build_checksums(
        &self,
        build: &Build,
    ) -> Result<Option<BTreeMap<String, String>>, FetchError> {
        self.fetch_json(build, CHECKSUMS_FILE)
    }

    pub fn fetch_build_info(&self, build: &Build) -> Result<Option<BuildInfo>, FetchError> {
        self.fetch_json(build, BUILD_INFO_FILE)
    }

    /// Artifact path to size in bytes. Sizes are published as strings.
    pub fn fetch_sizes(&self, build: &Build) -> Result<Option<BTreeMap<String, u64>>, FetchError> {
        let Some(raw) = self.fetch_json::<BTreeMap<String, serde_json::Value>>(build, SIZES_FILE)?
        else {
            return Ok(None);
        };
        let mut sizes = BTreeMap::new();
        for (path, value) in raw {
            let size = match &value {
                serde_json::Value::String(text) => text.trim().parse::<u64>().ok(),
                serde_json::Value::Number(number) => number.as_u64(),
                _ => None,
            };
            let Some(size) = size else {
                return Err(FetchError::InvalidSize {
                    url: raw_artifact_url(self.artifacts, build, SIZES_FILE),
                    path,
                    value: value.to_string(),
                });
            };
            sizes.insert(path, size);
        }
        Ok(Some(sizes))
    }

    /// Interface description of one program in the build.
    pub fn fetch_idl(
        &self,
        build: &Build,
        program_name: &str,
    ) -> Result<Option<serde_json::Value>, FetchError> {
        self.fetch_json(build, &format!("idl/{}.json", program_name))
    }
}

#[cfg(test)]
mod tests {
    use crate::fetch::{raw_artifact_url, ArtifactFetcher, FetchError};
    use crate::test_support::MemorySource;
    use reqwest::StatusCode;
    use verified_core::config::ArtifactsSection;
    use verified_core::descriptor::describe_build;

    const BRANCH_URL: &str =
        "https://raw.githubusercontent.com/DeployDAO/verified-program-artifacts/verify-acme__swap-v1.0.0";

    #[test]
    fn raw_url_addresses_build_branch() {
        let build = describe_build("acme/swap", "v1.0.0").expect("describe failed");
        assert_eq!(
            raw_artifact_url(&ArtifactsSection::default(), &build, "addresses.json"),
            format!("{BRANCH_URL}/addresses.json")
        );
    }

    #[test]
    fn missing_documents_are_absent() {
        let source = MemorySource::default();
        let artifacts = ArtifactsSection::default();
        let fetcher = ArtifactFetcher::new(&source, &artifacts);
        let build = describe_build("acme/swap", "v1.0.0").expect("describe failed");

        assert!(fetcher.fetch_build_addresses(&build).expect("fetch failed").is_none());
        assert!(fetcher.fetch_build_info(&build).expect("fetch failed").is_none());
        assert!(fetcher.fetch_sizes(&build).expect("fetch failed").is_none());
    }

    #[test]
    fn server_errors_propagate() {
        let source = MemorySource::default().with_status(
            &format!("{BRANCH_URL}/checksums.json"),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
        let artifacts = ArtifactsSection::default();
        let fetcher = ArtifactFetcher::new(&source, &artifacts);
        let build = describe_build("acme/swap", "v1.0.0").expect("describe failed");

        let err = fetcher.fetch_build_checksums(&build).expect_err("expected failure");
        assert!(matches!(
            err,
            FetchError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[test]
    fn unexpected_shape_is_malformed() {
        let source = MemorySource::default()
            .with_body(&format!("{BRANCH_URL}/addresses.json"), r#"["swap"]"#);
        let artifacts = ArtifactsSection::default();
        let fetcher = ArtifactFetcher::new(&source, &artifacts);
        let build = describe_build("acme/swap", "v1.0.0").expect("describe failed");

        let err = fetcher.fetch_build_addresses(&build).expect_err("expected failure");
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[test]
    fn sizes_are_parsed_from_strings() {
        let source = MemorySource::default().with_body(
            &format!("{BRANCH_URL}/sizes.json"),
            r#"{"artifacts/verifiable/swap.so":"1024","artifacts/idl/swap.json":77}"#,
        );
        let artifacts = ArtifactsSection::default();
        let fetcher = ArtifactFetcher::new(&source, &artifacts);
        let build = describe_build("acme/swap", "v1.0.0").expect("describe failed");

        let sizes = fetcher
            .fetch_sizes(&build)
            .expect("fetch failed")
            .expect("sizes missing");
        assert_eq!(sizes["artifacts/verifiable/swap.so"], 1024);
        assert_eq!(sizes["artifacts/idl/swap.json"], 77);
    }

    #[test]
    fn unparsable_size_is_rejected() {
        let source = MemorySource::default().with_body(
            &format!("{BRANCH_URL}/sizes.json"),
            r#"{"artifacts/verifiable/swap.so":"large"}"#,
        );
        let artifacts = ArtifactsSection::default();
        let fetcher = ArtifactFetcher::new(&source, &artifacts);
        let build = describe_build("acme/swap", "v1.0.0").expect("describe failed");

        let err = fetcher.fetch_sizes(&build).expect_err("expected failure");
        assert!(matches!(err, FetchError::InvalidSize { path, .. } if path == "artifacts/verifiable/swap.so"));
    }
}
