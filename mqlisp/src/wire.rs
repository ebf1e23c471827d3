//! Versioned JSON document format for expressions.
//!
//! An expression travels inside an [`ExpressionDocument`] that records the
//! format version it was written with. Decoding refuses any version outside
//! [`COMPATIBLE_VERSIONS`].
use std::sync::LazyLock;

use log::{debug, warn};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::{
    expression::Expression,
    utils::{Error, Result},
};

/// Format version written by this crate.
pub const EXPRESSION_FORMAT_VERSION: &str = "0.1.0";

/// Range of format versions this crate can read.
pub const COMPATIBLE_VERSIONS: &str = ">=0.1.0, <0.2.0";

static CURRENT_VERSION: LazyLock<Version> = LazyLock::new(|| {
    Version::parse(EXPRESSION_FORMAT_VERSION).unwrap_or_else(|_| Version::new(0, 1, 0))
});

static COMPATIBLE_REQ: LazyLock<VersionReq> =
    LazyLock::new(|| VersionReq::parse(COMPATIBLE_VERSIONS).unwrap_or(VersionReq::STAR));

/// Current format version.
pub fn current_version() -> Version {
    CURRENT_VERSION.clone()
}

/// Check that `version` can be read by this crate.
pub fn check_compatibility(version: &Version) -> Result<()> {
    if COMPATIBLE_REQ.matches(version) {
        Ok(())
    } else {
        warn!(
            "Rejecting expression document version {} (supported: {})",
            version, *COMPATIBLE_REQ
        );
        Err(Error::IncompatibleVersion {
            version: version.clone(),
            required: COMPATIBLE_REQ.clone(),
        })
    }
}

/// An expression together with the metadata needed to read it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionDocument {
    /// Free-form text the expression was produced from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub version: Version,
    pub expression: Expression,
}

impl ExpressionDocument {
    pub fn new(expression: Expression) -> Self {
        Self {
            source: None,
            version: current_version(),
            expression,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode a document and verify its version.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: ExpressionDocument =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        check_compatibility(&document.version)?;
        debug!(
            "Decoded expression document v{} ({} nodes)",
            document.version,
            document.expression.node_count()
        );
        Ok(document)
    }
}
