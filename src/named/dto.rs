use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    named::repo_types::{NamedPatch, NewNamed},
    validation::require_non_blank,
};

/// Request body for creating a role or status.
#[derive(Debug, Deserialize)]
pub struct CreateNamedRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CreateNamedRequest {
    pub fn validate(self) -> ApiResult<NewNamed> {
        let mut errors = Vec::new();
        if self.name.is_none() {
            errors.push("name is required".to_string());
        }
        if self.description.is_none() {
            errors.push("description is required".to_string());
        }
        require_non_blank(&mut errors, "name", self.name.as_deref());
        require_non_blank(&mut errors, "description", self.description.as_deref());
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(NewNamed {
            name: self.name.unwrap_or_default().trim().to_string(),
            description: self.description.unwrap_or_default(),
        })
    }
}

/// Request body for updating a role or status.
#[derive(Debug, Deserialize)]
pub struct UpdateNamedRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl UpdateNamedRequest {
    pub fn validate(self) -> ApiResult<NamedPatch> {
        let patch = NamedPatch {
            name: self.name.map(|n| n.trim().to_string()),
            description: self.description,
        };
        if patch.is_empty() {
            return Err(ApiError::validation("At least one field must be updated"));
        }
        let mut errors = Vec::new();
        require_non_blank(&mut errors, "name", patch.name.as_deref());
        require_non_blank(&mut errors, "description", patch.description.as_deref());
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(patch)
    }
}
