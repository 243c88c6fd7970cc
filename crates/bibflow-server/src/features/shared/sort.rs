//! Sort parameter validation
//!
//! Each list endpoint declares an allow-list of sortable fields; anything
//! outside the list is a client error, not a silently ignored parameter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Error)]
pub enum SortValidationError {
    #[error("The specified query parameter is not valid: sortBy={0}")]
    UnknownField(String),

    #[error("The specified sort order is not valid: order={0}")]
    UnknownOrder(String),
}

impl std::str::FromStr for SortOrder {
    type Err = SortValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(SortValidationError::UnknownOrder(other.to_string())),
        }
    }
}

/// Check a requested sort field against an endpoint's allow-list
pub fn validate_sort_field<'a>(
    field: &'a str,
    allowed: &[&str],
) -> Result<&'a str, SortValidationError> {
    if allowed.contains(&field) {
        Ok(field)
    } else {
        Err(SortValidationError::UnknownField(field.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_field() {
        assert!(validate_sort_field("completed_date", &["completed_date"]).is_ok());
        assert!(validate_sort_field("title; DROP TABLE", &["completed_date"]).is_err());
    }

    #[test]
    fn parses_order() {
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
