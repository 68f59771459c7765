use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    named::LookupKey,
    user_roles::DEFAULT_ROLE,
    user_statuses::DEFAULT_STATUS,
    validation::{is_valid_email, normalize_email, require_non_blank},
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Request body for `POST /users`. Role and status are each addressed by
/// id or by name.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
}

#[derive(Debug)]
pub struct ValidCreate {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: LookupKey,
    pub status: LookupKey,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
}

#[derive(Debug)]
pub struct ValidUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<LookupKey>,
    pub status: Option<LookupKey>,
}

fn check_email(errors: &mut Vec<String>, email: &str) {
    if !is_valid_email(email) {
        errors.push("Invalid email".to_string());
    }
}

fn check_password(errors: &mut Vec<String>, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
}

impl CreateUserRequest {
    pub fn validate(self) -> ApiResult<ValidCreate> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("password", &self.password),
        ] {
            if value.is_none() {
                errors.push(format!("{field} is required"));
            }
        }
        require_non_blank(&mut errors, "name", self.name.as_deref());

        let email = self.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            check_email(&mut errors, email);
        }
        if let Some(password) = &self.password {
            check_password(&mut errors, password);
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let role = LookupKey::from_parts(self.role_id, self.role_name)?
            .unwrap_or_else(|| LookupKey::Name(DEFAULT_ROLE.into()));
        let status = LookupKey::from_parts(self.status_id, self.status_name)?
            .unwrap_or_else(|| LookupKey::Name(DEFAULT_STATUS.into()));

        Ok(ValidCreate {
            name: self.name.unwrap_or_default().trim().to_string(),
            email: email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            role,
            status,
        })
    }
}

impl UpdateUserRequest {
    pub fn validate(self) -> ApiResult<ValidUpdate> {
        let role = LookupKey::from_parts(self.role_id, self.role_name)?;
        let status = LookupKey::from_parts(self.status_id, self.status_name)?;
        let update = ValidUpdate {
            name: self.name.map(|n| n.trim().to_string()),
            email: self.email.as_deref().map(normalize_email),
            password: self.password,
            role,
            status,
        };
        if update.name.is_none()
            && update.email.is_none()
            && update.password.is_none()
            && update.role.is_none()
            && update.status.is_none()
        {
            return Err(ApiError::validation("At least one field must be updated"));
        }

        let mut errors = Vec::new();
        require_non_blank(&mut errors, "name", update.name.as_deref());
        if let Some(email) = &update.email {
            check_email(&mut errors, email);
        }
        if let Some(password) = &update.password {
            check_password(&mut errors, password);
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(update)
    }
}
