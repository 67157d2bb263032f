// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Claim that an identity on an external service (`value@service`) belongs to a user.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Assertion {
    value: String,
    service: String,
}

impl Assertion {
    pub fn new(value: &str, service: &str) -> Result<Self, AssertionError> {
        if value.is_empty() {
            return Err(AssertionError::MissingValue(format!("{value}@{service}")));
        }

        if service.is_empty() {
            return Err(AssertionError::MissingService(format!("{value}@{service}")));
        }

        if service == "keybase" {
            return Err(AssertionError::NotSocial(value.to_string()));
        }

        Ok(Self {
            value: value.to_lowercase(),
            service: service.to_lowercase(),
        })
    }

    /// Identity on the external service.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Name of the external service.
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl FromStr for Assertion {
    type Err = AssertionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // Values may contain '@' themselves (email addresses), the service is always last.
        let (name, service) = value
            .rsplit_once('@')
            .ok_or_else(|| AssertionError::MissingService(value.to_string()))?;
        Self::new(name, service)
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value, self.service)
    }
}

#[derive(Error, Debug)]
pub enum AssertionError {
    #[error("assertion \"{0}\" does not name a service")]
    MissingService(String),

    #[error("assertion \"{0}\" does not name an identity")]
    MissingValue(String),

    #[error("\"{0}@keybase\" is not a social assertion")]
    NotSocial(String),
}
