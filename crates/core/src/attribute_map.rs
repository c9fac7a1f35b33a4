//! Static attribute-name table between an external SAML vocabulary and the
//! proxy's local attribute names.
//!
//! The map file format:
//!
//! ```toml
//! identifier = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri"
//!
//! [fro]
//! "https://aws.amazon.com/SAML/Attributes/Role" = "RoleEntitlement"
//!
//! [to]
//! RoleEntitlement = "https://aws.amazon.com/SAML/Attributes/Role"
//! ```
//!
//! `fro` translates external names to local ones, `to` the other way. The
//! two tables must be exact inverses of each other.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::AttributeMapError;

/// Name format declared by the built-in table.
pub const URI_NAME_FORMAT: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";

/// Attribute namespace of the built-in AWS table.
pub const AWS_ATTRIBUTE_PREFIX: &str = "https://aws.amazon.com/SAML/Attributes/";

/// Local attribute that carries the subject identifier.
pub const SUBJECT_ATTRIBUTE: &str = "userPrincipalName";

/// Attribute values keyed by attribute name.
pub type Attributes = BTreeMap<String, Vec<String>>;

/// Bidirectional attribute-name table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMap {
    /// Name-format tag of the external vocabulary.
    pub identifier: String,
    /// External name -> local name.
    #[serde(default)]
    pub fro: BTreeMap<String, String>,
    /// Local name -> external name.
    #[serde(default)]
    pub to: BTreeMap<String, String>,
}

impl AttributeMap {
    /// The table for AWS SAML federation.
    pub fn aws() -> Self {
        let mut map = Self {
            identifier: URI_NAME_FORMAT.to_string(),
            fro: BTreeMap::new(),
            to: BTreeMap::new(),
        };
        for (suffix, local) in [
            ("Role", "RoleEntitlement"),
            ("RoleSessionName", "RoleSessionName"),
            ("SessionDuration", "SessionDuration"),
            ("TransitiveTagKeys", "TransitiveTagKeys"),
        ] {
            map.insert(&format!("{}{}", AWS_ATTRIBUTE_PREFIX, suffix), local);
        }
        map.insert(SUBJECT_ATTRIBUTE, SUBJECT_ATTRIBUTE);
        map
    }

    /// Add a pair to both directions.
    pub fn insert(&mut self, external: &str, local: &str) {
        self.fro.insert(external.to_string(), local.to_string());
        self.to.insert(local.to_string(), external.to_string());
    }

    /// Parse and validate a map from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, AttributeMapError> {
        let map: AttributeMap =
            toml::from_str(contents).map_err(|e| AttributeMapError::ParseError(e.to_string()))?;
        map.validate()?;
        Ok(map)
    }

    /// Load and validate a map file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AttributeMapError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading attribute map");

        if !path.exists() {
            return Err(AttributeMapError::MapFileError {
                path: path.display().to_string(),
                detail: "file not found".into(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let map = Self::from_toml_str(&contents)?;

        debug!(
            identifier = %map.identifier,
            count = map.fro.len(),
            "loaded attribute map"
        );
        Ok(map)
    }

    /// Write the map to disk in TOML format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AttributeMapError> {
        let path = path.as_ref();
        info!(path = %path.display(), "saving attribute map");

        let toml_str =
            toml::to_string_pretty(self).map_err(|e| AttributeMapError::ParseError(e.to_string()))?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Check that `fro` and `to` are exact inverses.
    pub fn validate(&self) -> Result<(), AttributeMapError> {
        if self.identifier.trim().is_empty() {
            return Err(AttributeMapError::Inconsistent {
                name: "identifier".into(),
                detail: "name format must not be empty".into(),
            });
        }

        for (external, local) in &self.fro {
            match self.to.get(local) {
                Some(back) if back == external => {}
                Some(back) => {
                    return Err(AttributeMapError::Inconsistent {
                        name: local.clone(),
                        detail: format!(
                            "fro maps '{}' to it but to maps it to '{}'",
                            external, back
                        ),
                    })
                }
                None => {
                    return Err(AttributeMapError::Inconsistent {
                        name: local.clone(),
                        detail: format!("fro maps '{}' to it but to has no entry", external),
                    })
                }
            }
        }

        if let Some((local, external)) = self
            .to
            .iter()
            .find(|(local, external)| self.fro.get(*external) != Some(*local))
        {
            return Err(AttributeMapError::Inconsistent {
                name: local.clone(),
                detail: format!("to maps it to '{}' but fro has no matching entry", external),
            });
        }

        Ok(())
    }

    /// Local name for an external attribute name.
    pub fn to_internal(&self, external: &str) -> Option<&str> {
        self.fro.get(external).map(String::as_str)
    }

    /// External name for a local attribute name.
    pub fn to_external(&self, local: &str) -> Option<&str> {
        self.to.get(local).map(String::as_str)
    }

    /// Whether the table agrees with the normalizer on the subject attribute.
    pub fn carries_subject_attribute(&self) -> bool {
        self.to.contains_key(SUBJECT_ATTRIBUTE)
    }

    /// Rename external attributes to local names. Unmapped names are dropped.
    pub fn internal_attributes(&self, external: &Attributes) -> Attributes {
        translate(external, &self.fro)
    }

    /// Rename local attributes to external names. Unmapped names are dropped.
    pub fn external_attributes(&self, internal: &Attributes) -> Attributes {
        translate(internal, &self.to)
    }
}

fn translate(attributes: &Attributes, table: &BTreeMap<String, String>) -> Attributes {
    let mut out = Attributes::new();
    for (name, values) in attributes {
        match table.get(name) {
            Some(mapped) => out
                .entry(mapped.clone())
                .or_default()
                .extend(values.iter().cloned()),
            None => debug!(attribute = %name, "no mapping for attribute, dropping"),
        }
    }
    out
}
