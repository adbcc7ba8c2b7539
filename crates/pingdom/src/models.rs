use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use tileboard_core::params::from_str_or_value;
use tileboard_core::{TileStatus, TypedParams, ValidationError};

/// A Pingdom uptime check as returned by the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub id: u64,
    pub name: String,
    /// Raw Pingdom status: up, down, unconfirmed_down, paused, unknown
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Check {
    pub fn tile_status(&self) -> TileStatus {
        match self.status.as_str() {
            "up" => TileStatus::Success,
            "down" => TileStatus::Failure,
            "unconfirmed_down" => TileStatus::Warning,
            "paused" => TileStatus::Disabled,
            _ => TileStatus::Unknown,
        }
    }

    pub fn has_any_tag(&self, tags: &[&str]) -> bool {
        tags.iter().any(|tag| self.tags.iter().any(|t| t == tag))
    }
}

/// Params of a `PINGDOM-CHECK` tile
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct CheckParams {
    #[serde(deserialize_with = "from_str_or_value")]
    #[schemars(with = "u64")]
    pub id: u64,
}

impl TypedParams for CheckParams {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.id == 0 {
            return Err(ValidationError::InvalidParam {
                param: "id".to_string(),
                reason: "must be a Pingdom check id".to_string(),
            });
        }
        Ok(())
    }
}

/// Params of a `PINGDOM-CHECKS` tile
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChecksParams {
    /// Comma-separated tag filter
    #[serde(default)]
    pub tags: Option<String>,
    /// Only `name` is supported
    #[serde(default)]
    pub sort_by: Option<String>,
}

impl ChecksParams {
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TypedParams for ChecksParams {
    fn validate(&self) -> Result<(), ValidationError> {
        match self.sort_by.as_deref() {
            None | Some("name") => Ok(()),
            Some(other) => Err(ValidationError::InvalidParam {
                param: "sortBy".to_string(),
                reason: format!("unsupported sort '{}', expected 'name'", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileboard_core::{ParamsSchema, ParamsValidator, TileParams};

    #[test]
    fn test_check_status_mapping() {
        let mut check = Check {
            id: 1,
            name: "api".to_string(),
            status: "up".to_string(),
            tags: vec![],
        };
        assert_eq!(check.tile_status(), TileStatus::Success);
        check.status = "unconfirmed_down".to_string();
        assert_eq!(check.tile_status(), TileStatus::Warning);
        check.status = "whatever".to_string();
        assert_eq!(check.tile_status(), TileStatus::Unknown);
    }

    #[test]
    fn test_checks_params_validation() {
        let validator = ParamsSchema::<ChecksParams>::new();
        assert!(validator.validate(&TileParams::new()).is_ok());
        assert!(validator
            .validate(&TileParams::new().with("sortBy", "name"))
            .is_ok());
        assert!(validator
            .validate(&TileParams::new().with("sortBy", "status"))
            .is_err());
    }

    #[test]
    fn test_tag_list() {
        let params = ChecksParams {
            tags: Some("prod, eu,,".to_string()),
            sort_by: None,
        };
        assert_eq!(params.tag_list(), vec!["prod", "eu"]);
    }
}
