//! OS signature catalog and brand fingerprinting.
//!
//! A signature describes one switch operating system: regex patterns that
//! recognize its model strings and its version banner, plus the commands used
//! to disable pagination and to dump the MAC address table. Fingerprinting is
//! a plain search over free-text command output; the first signature in table
//! order that satisfies both criteria wins.

use std::path::Path;

use log::trace;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConnectError;

/// One record of the signature catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OsSignature {
    /// Brand name cached on a session once matched.
    pub name: String,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
    /// Patterns searched in model evidence.
    #[serde(default)]
    pub models: Vec<String>,
    /// Patterns searched in version evidence.
    #[serde(default)]
    pub versions: Vec<String>,
    /// Command disabling output pagination.
    #[serde(default)]
    pub pager: String,
    /// Command dumping the MAC address table.
    #[serde(default, rename = "mac-addr-list")]
    pub mac_addr_list: String,
}

struct CompiledSignature {
    signature: OsSignature,
    models: Vec<Regex>,
    versions: Vec<Regex>,
}

impl CompiledSignature {
    fn compile(signature: OsSignature) -> Result<Self, ConnectError> {
        let models = signature
            .models
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let versions = signature
            .versions
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            signature,
            models,
            versions,
        })
    }

    fn model_matches(&self, text: &str) -> bool {
        self.models.iter().any(|re| re.is_match(text))
    }

    fn version_matches(&self, text: &str) -> bool {
        self.versions.iter().any(|re| re.is_match(text))
    }
}

/// Ordered, read-only table of OS signatures with precompiled patterns.
#[derive(Default)]
pub struct SignatureCatalog {
    entries: Vec<CompiledSignature>,
}

impl std::fmt::Debug for SignatureCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.signature.name))
            .finish()
    }
}

impl SignatureCatalog {
    /// Builds a catalog, compiling every pattern. Order is preserved.
    pub fn new(signatures: Vec<OsSignature>) -> Result<Self, ConnectError> {
        let entries = signatures
            .into_iter()
            .map(CompiledSignature::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Parses a JSON array of signatures.
    pub fn from_json_str(json: &str) -> Result<Self, ConnectError> {
        let signatures: Vec<OsSignature> = serde_json::from_str(json)?;
        Self::new(signatures)
    }

    /// Loads a JSON catalog file such as `devices.json`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConnectError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn signatures(&self) -> impl Iterator<Item = &OsSignature> {
        self.entries.iter().map(|e| &e.signature)
    }

    /// Returns the first signature whose model patterns match `model_text`
    /// and whose version patterns match `version_text`.
    pub fn verify_model_and_version(
        &self,
        model_text: &str,
        version_text: &str,
    ) -> Option<&OsSignature> {
        self.entries
            .iter()
            .find(|entry| {
                let matched =
                    entry.model_matches(model_text) && entry.version_matches(version_text);
                trace!("signature {} matched={}", entry.signature.name, matched);
                matched
            })
            .map(|entry| &entry.signature)
    }

    /// Exploratory lookup: the first signature whose model OR version
    /// patterns match `text`. Never used for the brand cached on a session.
    pub fn find_by_model_or_version(&self, text: &str) -> Option<&OsSignature> {
        self.entries
            .iter()
            .find(|entry| entry.model_matches(text) || entry.version_matches(text))
            .map(|entry| &entry.signature)
    }

    /// Looks a signature up by its brand name.
    pub fn by_name(&self, name: &str) -> Option<&OsSignature> {
        self.signatures().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::{OsSignature, SignatureCatalog};
    use crate::error::ConnectError;

    const CATALOG: &str = r#"[
        {
            "name": "cisco_ios",
            "description": "Cisco IOS",
            "models": ["WS-C\\d+", "C2960"],
            "versions": ["Cisco IOS"],
            "pager": "terminal length 0",
            "mac-addr-list": "show mac address-table"
        },
        {
            "name": "huawei_vrp",
            "description": "Huawei VRP",
            "models": ["S5700", "S6720"],
            "versions": ["VRP \\(R\\) software"],
            "pager": "screen-length 0 temporary",
            "mac-addr-list": "display mac-address"
        },
        {
            "name": "catch_all_ios",
            "models": ["C2960"],
            "versions": ["IOS"]
        }
    ]"#;

    fn catalog() -> SignatureCatalog {
        SignatureCatalog::from_json_str(CATALOG).expect("valid catalog")
    }

    #[test]
    fn cisco_ios_banner_matches_cisco_signature() {
        let text = "Cisco IOS Software, C2960 Software (C2960-LANBASEK9-M), Version 15.0(2)SE";
        let catalog = catalog();

        let found = catalog
            .verify_model_and_version(text, text)
            .expect("should match");

        assert_eq!(found.name, "cisco_ios");
        assert_eq!(found.mac_addr_list, "show mac address-table");
    }

    #[test]
    fn first_matching_entry_wins() {
        // Both cisco_ios and catch_all_ios accept this text.
        let text = "C2960 running Cisco IOS";
        assert_eq!(
            catalog().verify_model_and_version(text, text).map(|s| s.name.as_str()),
            Some("cisco_ios")
        );
    }

    #[test]
    fn unmatched_text_returns_none() {
        let text = "Linux debian 6.1.0 x86_64";
        assert!(catalog().verify_model_and_version(text, text).is_none());
    }

    #[test]
    fn both_criteria_are_required() {
        // Version matches huawei, model does not.
        assert!(
            catalog()
                .verify_model_and_version("CE12800", "VRP (R) software, Version 8.180")
                .is_none()
        );
    }

    #[test]
    fn single_criterion_lookup_accepts_version_only() {
        let catalog = catalog();
        let found = catalog
            .find_by_model_or_version("Huawei Versatile Routing Platform VRP (R) software")
            .expect("version alone suffices");

        assert_eq!(found.name, "huawei_vrp");
    }

    #[test]
    fn lookup_by_name() {
        let catalog = catalog();
        assert_eq!(
            catalog.by_name("huawei_vrp").map(|s| s.pager.as_str()),
            Some("screen-length 0 temporary")
        );
        assert!(catalog.by_name("juniper").is_none());
    }

    #[test]
    fn invalid_pattern_fails_catalog_load() {
        let err = SignatureCatalog::new(vec![OsSignature {
            name: "broken".to_string(),
            models: vec!["(unclosed".to_string()],
            ..Default::default()
        }])
        .expect_err("pattern must not compile");

        assert!(matches!(err, ConnectError::InvalidPattern(_)));
    }
}
