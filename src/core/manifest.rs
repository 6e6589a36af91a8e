//! Route manifest document model.
//!
//! The manifest is an OpenAPI-like YAML (or JSON) document. Only the parts
//! the gateway acts on are modelled; unknown keys are ignored so ordinary
//! OpenAPI documents with extra sections still load.
use std::{collections::BTreeMap, fmt};

use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, Visitor},
};

use crate::core::{error::ManifestError, method::HttpMethod};

/// The parsed external document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteManifest {
    pub openapi: String,
    pub info: ManifestInfo,
    #[serde(default)]
    pub tags: Vec<ManifestTag>,
    pub paths: BTreeMap<String, PathItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestInfo {
    pub title: String,
    pub version: String,
}

/// A named default upstream target that operations can refer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestTag {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "x-target", default)]
    pub target: String,
}

/// The operations declared for one listening path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
        }
    }

    /// Declared operations in method order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(|method| self.operation(method).map(|op| (method, op)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub summary: String,
    #[serde(rename = "x-target", default)]
    pub target: String,
    #[serde(rename = "x-tag", default)]
    pub tag: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub responses: BTreeMap<StatusKey, ResponseSpec>,
}

impl Operation {
    /// Operations without a summary are not routed.
    pub fn is_defined(&self) -> bool {
        !self.summary.trim().is_empty()
    }

    pub fn explicit_target(&self) -> Option<&str> {
        non_blank(&self.target)
    }

    pub fn tag_ref(&self) -> Option<&str> {
        non_blank(&self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub schema: ParameterSchema,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseSpec {
    #[serde(default)]
    pub description: String,
}

/// Response map key. YAML authors write `200:` as often as `"200":`, so
/// integer keys are accepted and kept in their textual form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StatusKey(pub String);

impl<'de> Deserialize<'de> for StatusKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatusKeyVisitor;

        impl Visitor<'_> for StatusKeyVisitor {
            type Value = StatusKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a response status code or name")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(StatusKey(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(StatusKey(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(StatusKey(v.to_string()))
            }
        }

        deserializer.deserialize_any(StatusKeyVisitor)
    }
}

impl RouteManifest {
    /// Parse a manifest from YAML or JSON text.
    pub fn from_yaml(input: &str) -> Result<Self, ManifestError> {
        let manifest: RouteManifest = serde_yaml::from_str(input)
            .map_err(|e| ManifestError::InvalidManifestFormat(e.to_string()))?;
        manifest.check_header()?;
        Ok(manifest)
    }

    /// Parse a manifest from raw bytes, e.g. an uploaded file.
    pub fn from_slice(input: &[u8]) -> Result<Self, ManifestError> {
        let text = std::str::from_utf8(input).map_err(|e| {
            ManifestError::InvalidManifestFormat(format!("manifest is not valid UTF-8: {e}"))
        })?;
        Self::from_yaml(text)
    }

    fn check_header(&self) -> Result<(), ManifestError> {
        let missing = [
            ("openapi", &self.openapi),
            ("info.title", &self.info.title),
            ("info.version", &self.info.version),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());

        match missing {
            Some((field, _)) => Err(ManifestError::InvalidManifestFormat(format!(
                "'{field}' must not be empty"
            ))),
            None => Ok(()),
        }
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
