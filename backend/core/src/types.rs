use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cloud provider with its own rule catalog and policy document shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
}

/// Provider prefixes whose resources never touch a cloud control plane
/// (random values, local files, generated keys, ...).
pub const UTILITY_PREFIXES: &[&str] = &[
    "random", "null", "local", "tls", "time", "archive", "template", "external", "terraform",
];

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Aws, Provider::Gcp, Provider::Azure];

    /// The resource type prefix used by the provider's Terraform plugin.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "google",
            Self::Azure => "azurerm",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "aws" => Some(Self::Aws),
            "google" | "google-beta" => Some(Self::Gcp),
            "azurerm" => Some(Self::Azure),
            _ => None,
        }
    }

    /// Service namespace of an action, used to group statements.
    ///
    /// `s3:GetObject` → `s3`, `storage.buckets.get` → `storage`,
    /// `Microsoft.Storage/storageAccounts/read` → `Microsoft.Storage`.
    pub fn service_of(self, action: &str) -> &str {
        let sep = match self {
            Self::Aws => ':',
            Self::Gcp => '.',
            Self::Azure => '/',
        };
        action.split(sep).next().unwrap_or(action)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
            Self::Azure => "azure",
        };
        f.write_str(name)
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            "gcp" | "google" => Ok(Self::Gcp),
            "azure" | "azurerm" => Ok(Self::Azure),
            other => Err(format!("unknown provider '{other}' (expected aws, gcp or azure)")),
        }
    }
}

/// Whether a declaration is a managed resource or a read-only data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "resource")]
    Resource,
    #[serde(rename = "data")]
    DataSource,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource => f.write_str("resource"),
            Self::DataSource => f.write_str("data"),
        }
    }
}

/// One declared infrastructure object, as produced by a source parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Provider prefix (`aws`, `google`, `azurerm`, ...). Inferred from the
    /// type name when empty.
    #[serde(default)]
    pub provider: String,
    pub type_name: String,
    pub logical_name: String,
    pub kind: ResourceKind,
    /// Configured attributes exactly as declared.
    #[serde(default)]
    pub attributes: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl ResourceRecord {
    pub fn new(
        type_name: impl Into<String>,
        logical_name: impl Into<String>,
        kind: ResourceKind,
        attributes: Value,
    ) -> Self {
        let type_name = type_name.into();
        Self {
            provider: provider_prefix(&type_name).to_string(),
            type_name,
            logical_name: logical_name.into(),
            kind,
            attributes,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Fill in `provider` from the type name if the producer left it empty.
    pub fn with_inferred_provider(mut self) -> Self {
        if self.provider.is_empty() {
            self.provider = provider_prefix(&self.type_name).to_string();
        }
        self
    }

    /// Terraform-style address: `aws_s3_bucket.logs` or `data.aws_iam_role.ci`.
    pub fn address(&self) -> String {
        match self.kind {
            ResourceKind::Resource => format!("{}.{}", self.type_name, self.logical_name),
            ResourceKind::DataSource => format!("data.{}.{}", self.type_name, self.logical_name),
        }
    }

    pub fn attribute(&self, path: &str) -> Option<&Value> {
        lookup(&self.attributes, path)
    }
}

/// The provider prefix of a resource type name (`aws_s3_bucket` → `aws`).
pub fn provider_prefix(type_name: &str) -> &str {
    type_name.split('_').next().unwrap_or(type_name)
}

/// Exact-path lookup into an attribute tree.
///
/// Segments are separated by `.`. Numeric segments index lists. A named
/// segment applied to a single-element list descends into that element, since
/// nested blocks are rendered as one-element lists by most parsers. `null`
/// counts as unset.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    if !path.is_empty() {
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => match segment.parse::<usize>() {
                    Ok(index) => items.get(index)?,
                    Err(_) if items.len() == 1 => items[0].get(segment)?,
                    Err(_) => return None,
                },
                _ => return None,
            };
        }
    }
    (!current.is_null()).then_some(current)
}
