//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Resource addresses and variant selection."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::fmt;

use dslo_common::DataSourceKind;
use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::Result;

const SUBSYSTEM: &str = "subsystem";
const DATASOURCES: &str = "datasources";

/// One `type=value` step of a resource address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathElement {
    pub key: String,
    pub value: String,
}

impl PathElement {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Location of a resource in the configuration tree, e.g.
/// `subsystem=datasources/data-source=ds1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceAddress {
    elements: Vec<PathElement>,
}

impl ResourceAddress {
    pub fn new(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    /// Address of a datasource of the given variant in the datasources subsystem.
    pub fn data_source(kind: DataSourceKind, name: impl Into<String>) -> Self {
        Self::new(vec![
            PathElement::new(SUBSYSTEM, DATASOURCES),
            PathElement::new(kind.resource_type(), name),
        ])
    }

    /// Parse the `key=value/key=value` form. A leading `/` is accepted.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(invalid(input, "address is empty"));
        }
        let mut elements = Vec::new();
        for step in trimmed.split('/') {
            let (key, value) = step
                .split_once('=')
                .ok_or_else(|| invalid(input, format!("element '{step}' is not key=value")))?;
            if key.is_empty() || value.is_empty() {
                return Err(invalid(input, format!("element '{step}' has an empty side")));
            }
            elements.push(PathElement::new(key, value));
        }
        Ok(Self { elements })
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Name of the addressed resource (value of the last element).
    pub fn resource_name(&self) -> Result<&str> {
        self.last()
            .map(|element| element.value.as_str())
            .ok_or_else(|| invalid(&self.to_string(), "address is empty"))
    }

    /// Variant selected by the type of the last element.
    pub fn kind(&self) -> Result<DataSourceKind> {
        let last = self
            .last()
            .ok_or_else(|| invalid(&self.to_string(), "address is empty"))?;
        DataSourceKind::from_resource_type(&last.key).ok_or_else(|| {
            invalid(
                &self.to_string(),
                format!("'{}' is not a datasource resource type", last.key),
            )
        })
    }
}

fn invalid(address: &str, reason: impl Into<String>) -> LifecycleError {
    LifecycleError::InvalidAddress {
        address: address.to_owned(),
        reason: reason.into(),
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, element) in self.elements.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}
