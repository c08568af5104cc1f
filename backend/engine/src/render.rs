//! Render canonical policies into provider-native documents, a stable text
//! listing, or a Terraform resource wrapping the document.
//!
//! Rendering is deterministic: the same policy always produces the same bytes.

use std::fmt;
use std::str::FromStr;

use hcl::expr::{FuncCall, Traversal, Variable};
use hcl::{Block, Body, Identifier};
use policyforge_core::{CanonicalPolicy, Effect, PolicyError, Provider};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::DEFAULT_SCOPE;

pub const AWS_POLICY_VERSION: &str = "2012-10-17";
pub const DEFAULT_POLICY_NAME: &str = "terraform_policyforge";
const DESCRIPTION: &str = "Least-privilege policy generated by policyforge";

/// Output format of a rendered policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Provider-native JSON document.
    #[default]
    Json,
    /// One action per line under a provider header.
    Text,
    /// HCL resource that provisions the policy.
    Terraform,
}

impl RenderFormat {
    pub const NAMES: [&'static str; 3] = ["json", "text", "terraform"];
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Terraform => "terraform",
        })
    }
}

impl FromStr for RenderFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            "terraform" | "tf" | "hcl" => Ok(Self::Terraform),
            other => Err(format!(
                "unknown output format '{other}' (expected {})",
                Self::NAMES.join(", ")
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider-native document shapes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AwsDocument<'a> {
    #[serde(rename = "Version")]
    version: &'static str,
    #[serde(rename = "Statement")]
    statement: Vec<AwsStatement<'a>>,
}

#[derive(Serialize)]
struct AwsStatement<'a> {
    #[serde(rename = "Sid", skip_serializing_if = "Option::is_none")]
    sid: Option<&'a str>,
    #[serde(rename = "Effect")]
    effect: Effect,
    #[serde(rename = "Action")]
    action: &'a [String],
    #[serde(rename = "Resource")]
    resource: Scope<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Scope<'a> {
    One(&'a str),
    Many(&'a [String]),
}

impl<'a> Scope<'a> {
    fn of(resources: &'a [String]) -> Self {
        match resources {
            [single] => Scope::One(single),
            _ => Scope::Many(resources),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GcpRole<'a> {
    title: &'a str,
    description: &'static str,
    stage: &'static str,
    included_permissions: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AzureRole<'a> {
    name: &'a str,
    is_custom: bool,
    description: &'static str,
    actions: Vec<String>,
    not_actions: Vec<String>,
    assignable_scopes: Vec<String>,
}

/// Azure scopes are paths; the wildcard becomes the root scope.
fn azure_scopes(policy: &CanonicalPolicy) -> Vec<String> {
    let resources = policy.resources();
    if resources.is_empty() {
        return vec!["/".to_string()];
    }
    resources
        .into_iter()
        .map(|r| if r == DEFAULT_SCOPE { "/".to_string() } else { r })
        .collect()
}

#[derive(Serialize)]
#[serde(untagged)]
enum NativeDocument<'a> {
    Aws(AwsDocument<'a>),
    Gcp(GcpRole<'a>),
    Azure(AzureRole<'a>),
}

impl<'a> NativeDocument<'a> {
    fn of(policy: &'a CanonicalPolicy, name: &'a str) -> Self {
        match policy.provider {
            Provider::Aws => NativeDocument::Aws(AwsDocument {
                version: AWS_POLICY_VERSION,
                statement: policy
                    .statements
                    .iter()
                    .map(|s| AwsStatement {
                        sid: s.sid.as_deref(),
                        effect: s.effect,
                        action: &s.actions,
                        resource: Scope::of(&s.resources),
                    })
                    .collect(),
            }),
            Provider::Gcp => NativeDocument::Gcp(GcpRole {
                title: name,
                description: DESCRIPTION,
                stage: "GA",
                included_permissions: policy.actions().into_iter().collect(),
            }),
            Provider::Azure => NativeDocument::Azure(AzureRole {
                name,
                is_custom: true,
                description: DESCRIPTION,
                actions: policy.actions().into_iter().collect(),
                not_actions: Vec::new(),
                assignable_scopes: azure_scopes(policy),
            }),
        }
    }

    /// Pretty JSON in declaration order (`Version` before `Statement`).
    fn to_pretty(&self) -> Result<String, PolicyError> {
        serde_json::to_string_pretty(self).map_err(|e| PolicyError::Render(e.to_string()))
    }
}

/// The provider-native document for `policy` as a JSON value.
pub fn to_document(policy: &CanonicalPolicy, name: &str) -> Result<Value, PolicyError> {
    serde_json::to_value(NativeDocument::of(policy, name)).map_err(|e| PolicyError::Render(e.to_string()))
}

/// Render `policy` in `format`. The output always ends with a newline.
pub fn render(policy: &CanonicalPolicy, format: RenderFormat, name: &str) -> Result<String, PolicyError> {
    let mut out = match format {
        RenderFormat::Json => NativeDocument::of(policy, name).to_pretty()?,
        RenderFormat::Text => render_text(policy),
        RenderFormat::Terraform => render_terraform(policy, name)?,
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn render_text(policy: &CanonicalPolicy) -> String {
    let mut out = format!("# {}\n", policy.provider);
    let resources = policy.resources();
    if !resources.is_empty() && resources != [DEFAULT_SCOPE] {
        out.push_str(&format!("# resources: {}\n", resources.join(", ")));
    }
    for action in policy.actions() {
        out.push_str(&action);
        out.push('\n');
    }
    out
}

/// Terraform resource labels are identifiers; the verbatim name still lands
/// in the string attributes, escaped by the HCL serializer.
fn resource_label(name: &str) -> String {
    Identifier::sanitized(name).into_inner()
}

fn hcl_error(err: hcl::Error) -> PolicyError {
    PolicyError::Render(err.to_string())
}

fn render_terraform(policy: &CanonicalPolicy, name: &str) -> Result<String, PolicyError> {
    let label = resource_label(name);
    let block = match policy.provider {
        Provider::Aws => {
            let document = hcl::to_expression(NativeDocument::of(policy, name)).map_err(hcl_error)?;
            Block::builder("resource")
                .add_label("aws_iam_policy")
                .add_label(label)
                .add_attribute(("name_prefix", name))
                .add_attribute(("path", "/"))
                .add_attribute(("description", DESCRIPTION))
                .add_attribute(("policy", FuncCall::builder("jsonencode").arg(document).build()))
                .build()
        }
        Provider::Gcp => {
            let permissions: Vec<String> = policy.actions().into_iter().collect();
            let project = Traversal::builder(Variable::sanitized("var")).attr("project_id").build();
            Block::builder("resource")
                .add_label("google_project_iam_custom_role")
                .add_label(label)
                .add_attribute(("project", project))
                .add_attribute(("role_id", name))
                .add_attribute(("title", name))
                .add_attribute(("description", DESCRIPTION))
                .add_attribute(("permissions", permissions))
                .build()
        }
        Provider::Azure => {
            let actions: Vec<String> = policy.actions().into_iter().collect();
            let scopes = azure_scopes(policy);
            let scope = scopes.first().cloned().unwrap_or_else(|| "/".to_string());
            Block::builder("resource")
                .add_label("azurerm_role_definition")
                .add_label(label)
                .add_attribute(("name", name))
                .add_attribute(("scope", scope))
                .add_attribute(("description", DESCRIPTION))
                .add_block(
                    Block::builder("permissions")
                        .add_attribute(("actions", actions))
                        .add_attribute(("not_actions", Vec::<String>::new()))
                        .build(),
                )
                .add_attribute(("assignable_scopes", scopes))
                .build()
        }
    };
    hcl::to_string(&Body::builder().add_block(block).build()).map_err(hcl_error)
}
