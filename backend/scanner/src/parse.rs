//! Turn Terraform sources (native HCL or JSON syntax) into resource records.
//!
//! Both syntaxes are first brought into the same generic tree:
//!
//! ```text
//! { "resource": { "<type>": { "<name>": { ...attributes } } },
//!   "data":     { "<type>": { "<name>": { ...attributes } } } }
//! ```
//!
//! Terraform's JSON syntax allows a list wherever a single object is expected
//! (repeated blocks); those lists are flattened.

use std::path::Path;

use policyforge_core::{ResourceKind, ResourceRecord};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::ScanError;

/// Source syntax, decided by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Hcl,
    Json,
}

impl SourceFormat {
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".tf.json") {
            Some(Self::Json)
        } else if name.ends_with(".tf") {
            Some(Self::Hcl)
        } else {
            None
        }
    }
}

/// Parse one source file. Records come back sorted by kind, type and name.
pub fn parse_source(path: &Path, text: &str) -> Result<Vec<ResourceRecord>, ScanError> {
    let format = SourceFormat::of(path).ok_or_else(|| ScanError::UnsupportedFile(path.to_path_buf()))?;
    let tree: Value = match format {
        SourceFormat::Hcl => hcl::from_str(text).map_err(|e| ScanError::Hcl {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?,
        SourceFormat::Json => serde_json::from_str(text).map_err(|source| ScanError::Json {
            path: path.to_path_buf(),
            source,
        })?,
    };
    records_from_tree(&tree, path)
}

/// Extract `resource` and `data` declarations from a generic tree.
pub fn records_from_tree(tree: &Value, path: &Path) -> Result<Vec<ResourceRecord>, ScanError> {
    let mut records = Vec::new();
    for (block, kind) in [("resource", ResourceKind::Resource), ("data", ResourceKind::DataSource)] {
        let Some(section) = tree.get(block) else {
            continue;
        };
        for by_type in objects(section, path, block)? {
            for (type_name, by_name) in by_type {
                for named in objects(by_name, path, block)? {
                    for (logical_name, body) in named {
                        for attributes in objects(body, path, block)? {
                            records.push(
                                ResourceRecord::new(
                                    type_name.as_str(),
                                    logical_name.as_str(),
                                    kind,
                                    Value::Object(attributes.clone()),
                                )
                                .with_source(path),
                            );
                        }
                    }
                }
            }
        }
    }

    records.sort_by(|a, b| {
        (a.kind, &a.type_name, &a.logical_name).cmp(&(b.kind, &b.type_name, &b.logical_name))
    });
    trace!(path = %path.display(), records = records.len(), "Parsed source");
    Ok(records)
}

/// An object, or every object of a list of objects.
fn objects<'v>(
    value: &'v Value,
    path: &Path,
    block: &'static str,
) -> Result<Vec<&'v Map<String, Value>>, ScanError> {
    match value {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_object().ok_or_else(|| layout(path, block, item))
            })
            .collect(),
        other => Err(layout(path, block, other)),
    }
}

fn layout(path: &Path, block: &'static str, found: &Value) -> ScanError {
    let kind = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    };
    ScanError::Layout {
        path: path.to_path_buf(),
        block,
        reason: format!("expected an object, found {kind}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const MAIN_TF: &str = r#"
terraform {
  required_providers {
    aws = { source = "hashicorp/aws" }
  }
}

variable "name" {
  type = string
}

resource "aws_s3_bucket" "logs" {
  bucket        = var.name
  force_destroy = true

  tags = {
    Team = "platform"
  }
}

resource "aws_s3_object" "readme" {
  bucket = aws_s3_bucket.logs.id
  key    = "README.md"
}

resource "aws_security_group" "web" {
  name = "web"

  ingress {
    from_port = 443
    to_port   = 443
  }

  ingress {
    from_port = 80
    to_port   = 80
  }
}

data "aws_caller_identity" "current" {}
"#;

    fn addresses(records: &[ResourceRecord]) -> Vec<String> {
        records.iter().map(ResourceRecord::address).collect()
    }

    #[test]
    fn detects_format_by_name() {
        assert_eq!(SourceFormat::of(Path::new("a/main.tf")), Some(SourceFormat::Hcl));
        assert_eq!(SourceFormat::of(Path::new("x.tf.json")), Some(SourceFormat::Json));
        assert_eq!(SourceFormat::of(Path::new("terraform.tfvars")), None);
    }

    #[test]
    fn parses_hcl_resources_and_data() {
        let records = parse_source(Path::new("main.tf"), MAIN_TF).unwrap();
        assert_eq!(
            addresses(&records),
            vec![
                "aws_s3_bucket.logs",
                "aws_s3_object.readme",
                "aws_security_group.web",
                "data.aws_caller_identity.current",
            ]
        );

        let bucket = &records[0];
        assert_eq!(bucket.provider, "aws");
        assert_eq!(bucket.attribute("force_destroy"), Some(&json!(true)));
        assert_eq!(bucket.attribute("tags.Team"), Some(&json!("platform")));
        assert!(bucket.attribute("bucket").unwrap().as_str().unwrap().contains("var.name"));
        assert_eq!(bucket.source.as_deref(), Some(Path::new("main.tf")));

        let sg = &records[2];
        assert!(sg.attribute("ingress").is_some());
        assert_eq!(records[3].kind, ResourceKind::DataSource);
    }

    #[test]
    fn parses_json_syntax_with_lists() {
        let text = json!({
            "resource": [
                { "aws_sqs_queue": { "jobs": { "name": "jobs" } } },
                { "aws_sns_topic": [{ "alerts": { "name": "alerts" } }] }
            ],
            "data": { "aws_region": { "current": {} } }
        })
        .to_string();
        let records = parse_source(Path::new("main.tf.json"), &text).unwrap();
        assert_eq!(
            addresses(&records),
            vec!["aws_sns_topic.alerts", "aws_sqs_queue.jobs", "data.aws_region.current"]
        );
        assert_eq!(records[1].attribute("name"), Some(&json!("jobs")));
    }

    #[test]
    fn source_without_declarations_is_empty() {
        let records = parse_source(Path::new("vars.tf"), "variable \"x\" {}\n").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn reports_syntax_and_layout_errors() {
        let err = parse_source(Path::new("bad.tf"), "resource \"aws_s3_bucket\" {").unwrap_err();
        assert!(matches!(err, ScanError::Hcl { .. }));

        let err = parse_source(Path::new("bad.tf.json"), "{ nope").unwrap_err();
        assert!(matches!(err, ScanError::Json { .. }));

        let err = parse_source(Path::new("odd.tf.json"), r#"{"resource": {"aws_s3_bucket": 3}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("expected an object, found a number"), "{err}");

        let err = parse_source(Path::new("notes.txt"), "").unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedFile(_)));
    }
}
