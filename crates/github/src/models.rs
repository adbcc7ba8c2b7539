use schemars::JsonSchema;
use serde::Deserialize;

use tileboard_core::{TypedParams, ValidationError};

fn required(param: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingParam(param.to_string()));
    }
    Ok(())
}

/// Params of a `GITHUB-COUNT` tile
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct CountParams {
    /// GitHub search query, e.g. `is:pr is:open author:me`
    pub query: String,
}

impl TypedParams for CountParams {
    fn validate(&self) -> Result<(), ValidationError> {
        required("query", &self.query)
    }
}

/// Params of a `GITHUB-CHECKS` tile
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct ChecksParams {
    pub owner: String,
    pub repository: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
}

impl ChecksParams {
    pub fn slug(&self) -> String {
        format!("{}/{}@{}", self.owner, self.repository, self.git_ref)
    }
}

impl TypedParams for ChecksParams {
    fn validate(&self) -> Result<(), ValidationError> {
        required("owner", &self.owner)?;
        required("repository", &self.repository)?;
        required("ref", &self.git_ref)
    }
}
