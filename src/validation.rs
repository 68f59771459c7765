use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_LIMIT: i64 = 20;
pub const DEFAULT_OFFSET: i64 = 0;
const MAX_EMAIL_LEN: usize = 254;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@([A-Za-z0-9-]+\.)+[A-Za-z]{2,}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validated `limit`/`offset` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

/// Query string of every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub filter: Option<String>,
    pub expand: Option<String>,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl ListQuery {
    pub fn page(&self) -> ApiResult<Page> {
        let mut errors = Vec::new();
        if self.limit < 1 {
            errors.push("limit must be greater than or equal to 1".to_string());
        }
        if self.offset < 0 {
            errors.push("offset must be greater than or equal to 0".to_string());
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(Page {
            limit: self.limit,
            offset: self.offset,
        })
    }

    /// Blank filters match everything.
    pub fn name_filter(&self) -> Option<String> {
        self.filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
    }

    pub fn expand(&self) -> bool {
        parse_expand(self.expand.as_deref())
    }
}

/// Query string of single-record endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ExpandQuery {
    pub expand: Option<String>,
}

impl ExpandQuery {
    pub fn expand(&self) -> bool {
        parse_expand(self.expand.as_deref())
    }
}

/// `true`/`1` enable expansion, `false`/`0` and an absent or empty value
/// disable it. Any other non-empty value enables it.
pub fn parse_expand(raw: Option<&str>) -> bool {
    let Some(raw) = raw else {
        return false;
    };
    !matches!(raw.trim().to_ascii_lowercase().as_str(), "" | "false" | "0")
}

pub fn positive_id(id: i64) -> ApiResult<i64> {
    if id < 1 {
        return Err(ApiError::validation("id must be a positive integer"));
    }
    Ok(id)
}

/// Pushes an error when a supplied string field is blank.
pub fn require_non_blank(errors: &mut Vec<String>, field: &str, value: Option<&str>) {
    if let Some(v) = value {
        if v.trim().is_empty() {
            errors.push(format!("{field} must not be empty"));
        }
    }
}
