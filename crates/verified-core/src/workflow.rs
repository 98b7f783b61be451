use serde::Deserialize;
use serde_yaml::{Mapping, Value};

pub const JOB_TEMPLATE: &str = include_str!("../templates/verify-job.yml");

pub const MANIFEST_FILE_NAME: &str = "Anchor.toml";

/// Known toolchain releases and the nix package that provides each, oldest
/// first. The last entry is used when a manifest does not pin a known version.
pub const ANCHOR_PACKAGES: &[(&str, &str)] = &[
    ("0.18.0", "anchor-0_18_0"),
    ("0.18.2", "anchor-0_18_2"),
    ("0.19.0", "anchor-0_19_0"),
    ("0.20.1", "anchor-0_20_1"),
    ("0.21.0", "anchor-0_21_0"),
    ("0.22.0", "anchor-0_22_0"),
];

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("failed to parse manifest: {0}")]
    Manifest(toml::de::Error),
    #[error("failed to parse workflow template: {0}")]
    Template(serde_yaml::Error),
    #[error("workflow template has no jobs")]
    TemplateMissingJobs,
    #[error("failed to serialize workflow: {0}")]
    Serialize(serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowParams {
    pub repo: String,
    pub tag: String,
    pub slug: String,
    pub anchor_package: String,
    /// `owner/name` of the repository the artifacts are published to.
    pub artifacts_repo: String,
}

#[derive(Debug, Deserialize, Default)]
struct AnchorManifest {
    #[serde(default)]
    anchor_version: Option<String>,
    #[serde(default)]
    toolchain: Option<ToolchainSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ToolchainSection {
    #[serde(default)]
    anchor_version: Option<String>,
}

pub fn workflow_file_name(slug: &str) -> String {
    format!("verify-{}.yml", slug)
}

/// Reads the pinned toolchain version out of an `Anchor.toml` manifest.
pub fn manifest_anchor_version(manifest: &str) -> Result<Option<String>, WorkflowError> {
    let parsed: AnchorManifest = toml::from_str(manifest).map_err(WorkflowError::Manifest)?;
    Ok(parsed
        .toolchain
        .and_then(|toolchain| toolchain.anchor_version)
        .or(parsed.anchor_version)
        .map(|version| version.trim().to_string())
        .filter(|version| !version.is_empty()))
}

pub fn default_anchor_package() -> &'static str {
    ANCHOR_PACKAGES
        .last()
        .map(|(_, package)| *package)
        .unwrap_or("anchor")
}

pub fn anchor_package_for_version(version: Option<&str>) -> &'static str {
    let Some(version) = version else {
        return default_anchor_package();
    };
    let version = version.trim_start_matches('v');
    ANCHOR_PACKAGES
        .iter()
        .find(|(known, _)| *known == version)
        .map(|(_, package)| *package)
        .unwrap_or_else(default_anchor_package)
}

/// Expands the job template for one build into a complete workflow document.
pub fn make_workflow_yaml(params: &WorkflowParams) -> Result<String, WorkflowError> {
    let template: Mapping = serde_yaml::from_str(JOB_TEMPLATE).map_err(WorkflowError::Template)?;
    let jobs = template
        .get("jobs")
        .cloned()
        .ok_or(WorkflowError::TemplateMissingJobs)?;

    let mut push = Mapping::new();
    push.insert(
        Value::from("paths"),
        Value::Sequence(vec![Value::from(format!(
            ".github/workflows/{}",
            workflow_file_name(&params.slug)
        ))]),
    );
    let mut on = Mapping::new();
    on.insert(Value::from("push"), Value::Mapping(push));

    let mut env = Mapping::new();
    env.insert(Value::from("REPO"), Value::from(params.repo.as_str()));
    env.insert(Value::from("TAG"), Value::from(params.tag.as_str()));
    env.insert(Value::from("SLUG"), Value::from(params.slug.as_str()));
    env.insert(
        Value::from("ANCHOR_PACKAGE"),
        Value::from(params.anchor_package.as_str()),
    );
    env.insert(
        Value::from("ARTIFACTS_REPO"),
        Value::from(params.artifacts_repo.as_str()),
    );

    let mut document = Mapping::new();
    document.insert(
        Value::from("name"),
        Value::from(format!("Verify {} {}", params.repo, params.tag)),
    );
    document.insert(Value::from("on"), Value::Mapping(on));
    document.insert(Value::from("env"), Value::Mapping(env));
    document.insert(Value::from("jobs"), jobs);

    serde_yaml::to_string(&document).map_err(WorkflowError::Serialize)
}

#[cfg(test)]
mod tests {
    use crate::workflow::{
        anchor_package_for_version, make_workflow_yaml, manifest_anchor_version,
        workflow_file_name, WorkflowParams,
    };
    use serde_yaml::Value;

    fn params() -> WorkflowParams {
        WorkflowParams {
            repo: "acme/swap-program".to_string(),
            tag: "v1.2.0".to_string(),
            slug: "acme__swap-program-v1.2.0".to_string(),
            anchor_package: "anchor-0_20_1".to_string(),
            artifacts_repo: "DeployDAO/verified-program-artifacts".to_string(),
        }
    }

    #[test]
    fn manifest_version_from_top_level_or_toolchain() {
        assert_eq!(
            manifest_anchor_version("anchor_version = \"0.20.1\"\n").expect("parse failed"),
            Some("0.20.1".to_string())
        );
        assert_eq!(
            manifest_anchor_version("[toolchain]\nanchor_version = \"0.21.0\"\n")
                .expect("parse failed"),
            Some("0.21.0".to_string())
        );
        assert_eq!(
            manifest_anchor_version("[programs.mainnet]\nswap = \"Swap111\"\n")
                .expect("parse failed"),
            None
        );
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        assert!(manifest_anchor_version("[programs\n").is_err());
    }

    #[test]
    fn package_lookup_defaults_to_newest() {
        assert_eq!(anchor_package_for_version(Some("0.19.0")), "anchor-0_19_0");
        assert_eq!(anchor_package_for_version(Some("v0.18.2")), "anchor-0_18_2");
        assert_eq!(anchor_package_for_version(Some("0.99.0")), "anchor-0_22_0");
        assert_eq!(anchor_package_for_version(None), "anchor-0_22_0");
    }

    #[test]
    fn workflow_carries_header_and_template_jobs() {
        let yaml = make_workflow_yaml(&params()).expect("render failed");
        let doc: Value = serde_yaml::from_str(&yaml).expect("parse failed");

        assert_eq!(doc["name"], Value::from("Verify acme/swap-program v1.2.0"));
        assert_eq!(
            doc["on"]["push"]["paths"][0],
            Value::from(".github/workflows/verify-acme__swap-program-v1.2.0.yml")
        );
        assert_eq!(doc["env"]["SLUG"], Value::from("acme__swap-program-v1.2.0"));
        assert_eq!(doc["env"]["ANCHOR_PACKAGE"], Value::from("anchor-0_20_1"));
        let steps = doc["jobs"]["release-binaries"]["steps"]
            .as_sequence()
            .expect("steps missing");
        let names: Vec<&str> = steps.iter().filter_map(|step| step["name"].as_str()).collect();
        let login = names
            .iter()
            .position(|name| *name == "Login to Anchor")
            .expect("login step missing");
        let build = names
            .iter()
            .position(|name| *name == "Perform verifiable build")
            .expect("build step missing");
        let publish = names
            .iter()
            .position(|name| *name == "Publish build to Anchor Registry")
            .expect("publish step missing");
        assert!(login < build && build < publish);

        let runs: Vec<&str> = steps.iter().filter_map(|step| step["run"].as_str()).collect();
        assert!(runs
            .iter()
            .any(|run| run.contains("anchor login ${{ secrets.ANCHOR_AUTH_TOKEN }}")));
        assert!(runs.iter().any(|run| run.contains("$ANCHOR_PACKAGE --command anchor publish")));
        assert!(runs.iter().any(|run| run.contains("> artifacts/README.md")));
    }

    #[test]
    fn workflow_file_name_uses_slug() {
        assert_eq!(
            workflow_file_name("acme__swap-program-v1.2.0"),
            "verify-acme__swap-program-v1.2.0.yml"
        );
    }
}
