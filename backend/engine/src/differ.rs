//! Structural comparison of policy documents.
//!
//! Both sides are parsed into generic JSON and compared as values, so key
//! order and whitespace never matter. Array order does: feed this canonical
//! (or [`normalize_document`]-ed) documents.
//!
//! The annotated output reprints the first document with a marker column:
//! `-` for content only on the left, `+` for content only on the right and a
//! space for shared content. Array elements carry their index (`2: ...`).

use policyforge_core::{DiffResult, LivePolicy, PolicyError};
use serde_json::{Map, Value};
use tracing::debug;

/// Policy-document keys whose arrays hold unordered action names.
const ACTION_KEYS: &[&str] = &["Action", "NotAction", "Actions", "NotActions", "includedPermissions"];

/// Compare two serialized documents.
pub fn compare(a: &str, b: &str) -> Result<DiffResult, PolicyError> {
    compare_labeled(a, "left", b, "right")
}

/// Compare two serialized documents, naming each side in parse errors.
pub fn compare_labeled(
    a: &str,
    a_side: &str,
    b: &str,
    b_side: &str,
) -> Result<DiffResult, PolicyError> {
    let left = parse(a, a_side)?;
    let right = parse(b, b_side)?;
    Ok(compare_values(&left, &right))
}

/// Compare two serialized documents after [`normalize_document`]-ing both,
/// so action order and duplicates never count as changes.
pub fn compare_normalized(a: &str, b: &str) -> Result<DiffResult, PolicyError> {
    let left = normalize_document(parse(a, "left")?);
    let right = normalize_document(parse(b, "right")?);
    Ok(compare_values(&left, &right))
}

/// Compare a deployed policy (left) with a freshly generated one (right).
///
/// `-` lines are permissions only the live policy grants, `+` lines are
/// permissions it is missing. With `normalize`, action arrays on both sides
/// are sorted and deduplicated first.
pub fn compare_live(
    live: &LivePolicy,
    generated: &str,
    normalize: bool,
) -> Result<DiffResult, PolicyError> {
    let mut left = parse(&live.document, "live")?;
    let mut right = parse(generated, "generated")?;
    if normalize {
        left = normalize_document(left);
        right = normalize_document(right);
    }
    let result = compare_values(&left, &right);
    debug!(
        version = live.version.as_deref().unwrap_or("unknown"),
        changed = result.changed,
        "Compared live policy"
    );
    Ok(result)
}

/// Compare two already-parsed documents.
pub fn compare_values(a: &Value, b: &Value) -> DiffResult {
    if a == b {
        return DiffResult::unchanged();
    }
    let mut lines = Vec::new();
    diff_value(a, b, 0, "", &mut lines);
    let mut annotated = lines.join("\n");
    annotated.push('\n');
    DiffResult { changed: true, annotated }
}

/// Read a live policy file: either a bare policy document or the
/// `{"PolicyVersion": {"Document": ..., "VersionId": ...}}` envelope returned
/// by IAM `get-policy-version`. The envelope's document may be an object or a
/// JSON string.
pub fn parse_live_policy(text: &str) -> Result<LivePolicy, PolicyError> {
    let value = parse(text, "live")?;
    let Some(envelope) = value.get("PolicyVersion") else {
        return Ok(LivePolicy { document: text.to_string(), version: None });
    };

    let version = envelope
        .get("VersionId")
        .and_then(Value::as_str)
        .map(str::to_string);
    let document = match envelope.get("Document") {
        Some(Value::String(raw)) => raw.clone(),
        Some(doc @ Value::Object(_)) => {
            serde_json::to_string(doc).map_err(|e| PolicyError::malformed_document("live", e))?
        }
        _ => {
            return Err(PolicyError::malformed_document(
                "live",
                "PolicyVersion has no Document",
            ))
        }
    };
    Ok(LivePolicy { document, version })
}

/// Sort and deduplicate every action array, wrapping a bare action string in
/// a one-element array.
pub fn normalize_document(doc: Value) -> Value {
    match doc {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let value = if ACTION_KEYS.contains(&key.as_str()) {
                        normalize_actions(value)
                    } else {
                        normalize_document(value)
                    };
                    (key, value)
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_document).collect()),
        other => other,
    }
}

fn normalize_actions(value: Value) -> Value {
    match value {
        Value::String(single) => Value::Array(vec![Value::String(single)]),
        Value::Array(items) if items.iter().all(Value::is_string) => {
            let mut names: Vec<String> = items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            names.sort();
            names.dedup();
            Value::Array(names.into_iter().map(Value::String).collect())
        }
        other => other,
    }
}

fn parse(text: &str, side: &str) -> Result<Value, PolicyError> {
    serde_json::from_str(text).map_err(|e| PolicyError::malformed_document(side, e))
}

// ---------------------------------------------------------------------------
// Annotated rendering
// ---------------------------------------------------------------------------

fn push(out: &mut Vec<String>, marker: char, depth: usize, label: &str, text: &str) {
    out.push(format!("{marker}{}{label}{text}", "  ".repeat(depth + 1)));
}

/// Reprint `value` with every line under `marker`.
fn emit(value: &Value, marker: char, depth: usize, label: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            push(out, marker, depth, label, "{");
            for (key, child) in map {
                emit(child, marker, depth + 1, &key_label(key), out);
            }
            push(out, marker, depth, "", "}");
        }
        Value::Array(items) if !items.is_empty() => {
            push(out, marker, depth, label, "[");
            for (index, child) in items.iter().enumerate() {
                emit(child, marker, depth + 1, &format!("{index}: "), out);
            }
            push(out, marker, depth, "", "]");
        }
        scalar => push(out, marker, depth, label, &scalar.to_string()),
    }
}

fn key_label(key: &str) -> String {
    format!("{}: ", Value::String(key.to_string()))
}

fn diff_value(a: &Value, b: &Value, depth: usize, label: &str, out: &mut Vec<String>) {
    if a == b {
        emit(a, ' ', depth, label, out);
        return;
    }
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => {
            push(out, ' ', depth, label, "{");
            let mut keys: Vec<&String> = left.keys().chain(right.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child_label = key_label(key);
                match (left.get(key), right.get(key)) {
                    (Some(l), Some(r)) => diff_value(l, r, depth + 1, &child_label, out),
                    (Some(l), None) => emit(l, '-', depth + 1, &child_label, out),
                    (None, Some(r)) => emit(r, '+', depth + 1, &child_label, out),
                    (None, None) => {}
                }
            }
            push(out, ' ', depth, "", "}");
        }
        (Value::Array(left), Value::Array(right)) => {
            push(out, ' ', depth, label, "[");
            diff_array(left, right, depth + 1, out);
            push(out, ' ', depth, "", "]");
        }
        _ => {
            emit(a, '-', depth, label, out);
            emit(b, '+', depth, label, out);
        }
    }
}

enum Edit {
    Keep(usize),
    Delete(usize),
    Insert(usize),
}

/// Longest-common-subsequence alignment of two arrays.
fn align(left: &[Value], right: &[Value]) -> Vec<Edit> {
    let (n, m) = (left.len(), right.len());
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if left[i] == right[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut edits = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if left[i] == right[j] {
            edits.push(Edit::Keep(j));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            edits.push(Edit::Delete(i));
            i += 1;
        } else {
            edits.push(Edit::Insert(j));
            j += 1;
        }
    }
    edits.extend((i..n).map(Edit::Delete));
    edits.extend((j..m).map(Edit::Insert));
    edits
}

fn same_container(a: &Value, b: &Value) -> bool {
    matches!((a, b), (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)))
}

fn diff_array(left: &[Value], right: &[Value], depth: usize, out: &mut Vec<String>) {
    let edits = align(left, right);
    let mut deleted: Vec<usize> = Vec::new();
    let mut inserted: Vec<usize> = Vec::new();

    let flush = |deleted: &mut Vec<usize>, inserted: &mut Vec<usize>, out: &mut Vec<String>| {
        // A replaced container is diffed in place rather than reprinted whole.
        let paired = deleted.len().min(inserted.len());
        for k in 0..paired {
            let (i, j) = (deleted[k], inserted[k]);
            if same_container(&left[i], &right[j]) {
                diff_value(&left[i], &right[j], depth, &format!("{j}: "), out);
            } else {
                emit(&left[i], '-', depth, &format!("{i}: "), out);
                emit(&right[j], '+', depth, &format!("{j}: "), out);
            }
        }
        for &i in &deleted[paired..] {
            emit(&left[i], '-', depth, &format!("{i}: "), out);
        }
        for &j in &inserted[paired..] {
            emit(&right[j], '+', depth, &format!("{j}: "), out);
        }
        deleted.clear();
        inserted.clear();
    };

    for edit in edits {
        match edit {
            Edit::Keep(j) => {
                flush(&mut deleted, &mut inserted, out);
                emit(&right[j], ' ', depth, &format!("{j}: "), out);
            }
            Edit::Delete(i) => deleted.push(i),
            Edit::Insert(j) => inserted.push(j),
        }
    }
    flush(&mut deleted, &mut inserted, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const POLICY: &str = r#"{
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "VisualEditor0",
            "Effect": "Allow",
            "Action": ["s3:CreateBucket", "s3:DeleteBucket", "s3:GetObject"],
            "Resource": "*"
        }]
    }"#;

    #[test]
    fn identical_documents_are_unchanged() {
        let result = compare(POLICY, POLICY).unwrap();
        assert_eq!(result, DiffResult::unchanged());
    }

    #[test]
    fn key_order_and_whitespace_do_not_matter() {
        let compact = r#"{"Statement":[{"Resource":"*","Action":["s3:CreateBucket","s3:DeleteBucket","s3:GetObject"],"Effect":"Allow","Sid":"VisualEditor0"}],"Version":"2012-10-17"}"#;
        assert!(!compare(POLICY, compact).unwrap().changed);
    }

    #[test]
    fn changed_action_is_named_in_annotation() {
        let edited = POLICY.replace("s3:DeleteBucket", "s3:DeleteObject");
        let result = compare(POLICY, &edited).unwrap();
        assert!(result.changed);
        let removed: Vec<&str> = result.annotated.lines().filter(|l| l.starts_with('-')).collect();
        let added: Vec<&str> = result.annotated.lines().filter(|l| l.starts_with('+')).collect();
        assert_eq!(removed, vec!["-          1: \"s3:DeleteBucket\""]);
        assert_eq!(added, vec!["+          1: \"s3:DeleteObject\""]);
    }

    #[test]
    fn annotation_layout() {
        let a = json!({ "Action": ["a", "b"], "Effect": "Allow" });
        let b = json!({ "Action": ["a", "c", "b"], "Effect": "Allow" });
        let result = compare_values(&a, &b);
        assert_eq!(
            result.annotated,
            concat!(
                "   {\n",
                "     \"Action\": [\n",
                "       0: \"a\"\n",
                "+      1: \"c\"\n",
                "       2: \"b\"\n",
                "     ]\n",
                "     \"Effect\": \"Allow\"\n",
                "   }\n",
            )
        );
    }

    #[test]
    fn array_order_is_significant() {
        let a = json!({ "Action": ["s3:GetObject", "s3:PutObject"] });
        let b = json!({ "Action": ["s3:PutObject", "s3:GetObject"] });
        assert!(compare_values(&a, &b).changed);
        assert!(!compare_values(&normalize_document(a), &normalize_document(b)).changed);
    }

    #[test]
    fn malformed_side_is_named() {
        let err = compare(POLICY, "{ not json").unwrap_err();
        assert!(matches!(err, PolicyError::MalformedDocument { ref side, .. } if side == "right"));
        let err = compare_labeled("", "live", POLICY, "generated").unwrap_err();
        assert!(err.to_string().starts_with("malformed live document"), "{err}");
    }

    #[test]
    fn normalized_compare_ignores_action_order() {
        let a = r#"{"Statement":[{"Action":["b","a"],"Resource":"*"}]}"#;
        let b = r#"{"Statement":[{"Action":["a","b","a"],"Resource":"*"}]}"#;
        assert!(compare(a, b).unwrap().changed);
        assert!(!compare_normalized(a, b).unwrap().changed);

        let c = r#"{"Statement":[{"Action":["a","c"],"Resource":"*"}]}"#;
        let result = compare_normalized(a, c).unwrap();
        assert!(result.changed);
        assert!(result.annotated.contains("\"b\""), "{}", result.annotated);
    }

    #[test]
    fn normalized_compare_names_the_malformed_side() {
        let err = compare_normalized("nope", "{}").unwrap_err();
        assert!(matches!(&err, PolicyError::MalformedDocument { side, .. } if side == "left"), "{err}");
        let err = compare_normalized("{}", "{ nope").unwrap_err();
        assert!(matches!(&err, PolicyError::MalformedDocument { side, .. } if side == "right"), "{err}");
    }

    #[test]
    fn normalize_sorts_dedups_and_wraps_actions() {
        let doc = json!({
            "Statement": [
                { "Action": ["s3:PutObject", "s3:GetObject", "s3:PutObject"], "Resource": ["b", "a"] },
                { "NotAction": "iam:*" }
            ],
            "includedPermissions": ["storage.objects.get", "storage.buckets.get"]
        });
        assert_eq!(
            normalize_document(doc),
            json!({
                "Statement": [
                    { "Action": ["s3:GetObject", "s3:PutObject"], "Resource": ["b", "a"] },
                    { "NotAction": ["iam:*"] }
                ],
                "includedPermissions": ["storage.buckets.get", "storage.objects.get"]
            })
        );
    }

    #[test]
    fn live_envelope_is_unwrapped() {
        let envelope = json!({
            "PolicyVersion": {
                "Document": serde_json::from_str::<Value>(POLICY).unwrap(),
                "VersionId": "v3",
                "IsDefaultVersion": true
            }
        })
        .to_string();
        let live = parse_live_policy(&envelope).unwrap();
        assert_eq!(live.version.as_deref(), Some("v3"));
        assert!(!compare_live(&live, POLICY, false).unwrap().changed);

        let bare = parse_live_policy(POLICY).unwrap();
        assert_eq!(bare.version, None);
        assert_eq!(bare.document, POLICY);
    }

    #[test]
    fn live_comparison_marks_extra_grants_as_removals() {
        let live = LivePolicy { document: POLICY.to_string(), version: None };
        let generated = POLICY.replace(", \"s3:GetObject\"", "");
        let result = compare_live(&live, &generated, true).unwrap();
        assert!(result.changed);
        assert!(result
            .annotated
            .lines()
            .any(|l| l.starts_with('-') && l.contains("s3:GetObject")));
    }
}
