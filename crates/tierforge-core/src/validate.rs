//! Schema validation of model output
//!
//! The document is walked field by field and every violation is collected
//! before anything is reported, so one failed generation tells the whole
//! story instead of only its first problem. Typed deserialization happens
//! only once the walk comes back clean.
//!
//! Any change to the content schema must be mirrored in
//! [`crate::fallback`], whose output is required to pass this validator.

use serde_json::{Map, Value};

use crate::error::{SchemaValidationError, Violation, ViolationKind};
use crate::types::{ContentSet, Tier};

type Object = Map<String, Value>;

/// Parse and validate a sanitized JSON document into a [`ContentSet`]
pub fn validate(json_text: &str) -> Result<ContentSet, SchemaValidationError> {
    let document: Value =
        serde_json::from_str(json_text).map_err(|e| SchemaValidationError::invalid_json(&e))?;
    validate_value(document)
}

/// Validate an already-parsed JSON document
pub fn validate_value(document: Value) -> Result<ContentSet, SchemaValidationError> {
    let mut checker = SchemaChecker::default();
    checker.content_set(&document);

    if !checker.violations.is_empty() {
        return Err(SchemaValidationError::new(checker.violations));
    }

    // The walk mirrors the typed model, so this only fails if the two drift apart
    serde_json::from_value(document).map_err(|e| SchemaValidationError::invalid_json(&e))
}

#[derive(Default)]
struct SchemaChecker {
    violations: Vec<Violation>,
}

impl SchemaChecker {
    fn content_set(&mut self, document: &Value) {
        let Some(root) = self.expect_object(document, "") else {
            return;
        };

        for tier in Tier::ALL {
            if let Some(value) = self.required(root, "", tier.key()) {
                self.variant(value, tier.key());
            }
        }

        for key in root.keys() {
            if Tier::from_key(key).is_none() {
                self.report(key.clone(), ViolationKind::UnexpectedKey);
            }
        }
    }

    fn variant(&mut self, value: &Value, path: &str) {
        let Some(variant) = self.expect_object(value, path) else {
            return;
        };

        if let Some(label) = self.string(variant, path, "tier_label", true) {
            if Tier::from_label(label).is_none() {
                self.report(
                    join(path, "tier_label"),
                    ViolationKind::UnknownTierLabel(label.to_string()),
                );
            }
        }
        self.string_list(variant, path, "assumptions", false);
        self.string(variant, path, "executive_summary", false);

        if let Some(lesson) = self.required(variant, path, "lesson") {
            self.lesson(lesson, &join(path, "lesson"));
        }
    }

    fn lesson(&mut self, value: &Value, path: &str) {
        let Some(lesson) = self.expect_object(value, path) else {
            return;
        };

        self.object_list(lesson, path, "script", true, Self::script_step);

        if let Some(lab) = self.required(lesson, path, "lab_ngc") {
            self.lab_exercise(lab, &join(path, "lab_ngc"));
        }
        if let Some(project) = self.required(lesson, path, "project") {
            self.project(project, &join(path, "project"));
        }

        self.positive_integer(lesson, path, "estimated_duration_minutes");
    }

    fn script_step(&mut self, step: &Object, path: &str) {
        self.string(step, path, "segment_name", false);
        self.string(step, path, "narration", true);
        self.optional_string(step, path, "code");
        self.string(step, path, "video_reference", false);
    }

    fn lab_exercise(&mut self, value: &Value, path: &str) {
        let Some(lab) = self.expect_object(value, path) else {
            return;
        };

        self.string(lab, path, "title", false);
        self.string(lab, path, "instructions", false);
        self.string_list(lab, path, "steps", true);
        self.string(lab, path, "starter_code", false);
        self.string(lab, path, "solution_code", false);
    }

    fn project(&mut self, value: &Value, path: &str) {
        let Some(project) = self.expect_object(value, path) else {
            return;
        };

        self.string(project, path, "title", false);
        self.string(project, path, "brief", false);
        self.string_list(project, path, "criteria", true);
        self.string_list(project, path, "steps", true);
        self.object_list(project, path, "line_explanations", false, |checker, item, path| {
            checker.string(item, path, "line", false);
            checker.string(item, path, "explanation", false);
        });
        self.string(project, path, "sample_code", false);
    }

    // --- field helpers -------------------------------------------------

    fn report(&mut self, path: impl Into<String>, kind: ViolationKind) {
        self.violations.push(Violation::new(path, kind));
    }

    fn expect_object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Object> {
        match value.as_object() {
            Some(object) => Some(object),
            None => {
                self.wrong_type(path, "object", value);
                None
            }
        }
    }

    fn wrong_type(&mut self, path: &str, expected: &'static str, found: &Value) {
        self.report(
            path,
            ViolationKind::WrongType {
                expected,
                found: type_name(found),
            },
        );
    }

    fn required<'v>(&mut self, object: &'v Object, parent: &str, key: &str) -> Option<&'v Value> {
        let value = object.get(key);
        if value.is_none() {
            self.report(join(parent, key), ViolationKind::Missing);
        }
        value
    }

    fn string<'v>(
        &mut self,
        object: &'v Object,
        parent: &str,
        key: &str,
        non_empty: bool,
    ) -> Option<&'v str> {
        let value = self.required(object, parent, key)?;
        let path = join(parent, key);
        match value.as_str() {
            Some(text) if non_empty && text.trim().is_empty() => {
                self.report(path, ViolationKind::EmptyString);
                None
            }
            Some(text) => Some(text),
            None => {
                self.wrong_type(&path, "string", value);
                None
            }
        }
    }

    fn optional_string(&mut self, object: &Object, parent: &str, key: &str) {
        match object.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => self.wrong_type(&join(parent, key), "string or null", other),
        }
    }

    fn array<'v>(
        &mut self,
        object: &'v Object,
        parent: &str,
        key: &str,
        non_empty: bool,
    ) -> Option<&'v Vec<Value>> {
        let value = self.required(object, parent, key)?;
        let path = join(parent, key);
        match value.as_array() {
            Some(items) => {
                if non_empty && items.is_empty() {
                    self.report(path, ViolationKind::EmptySequence);
                }
                Some(items)
            }
            None => {
                self.wrong_type(&path, "array", value);
                None
            }
        }
    }

    fn string_list(&mut self, object: &Object, parent: &str, key: &str, non_empty: bool) {
        let Some(items) = self.array(object, parent, key, non_empty) else {
            return;
        };
        let path = join(parent, key);
        for (i, item) in items.iter().enumerate() {
            if !item.is_string() {
                self.wrong_type(&index(&path, i), "string", item);
            }
        }
    }

    fn object_list(
        &mut self,
        object: &Object,
        parent: &str,
        key: &str,
        non_empty: bool,
        mut check_item: impl FnMut(&mut Self, &Object, &str),
    ) {
        let Some(items) = self.array(object, parent, key, non_empty) else {
            return;
        };
        let path = join(parent, key);
        for (i, item) in items.iter().enumerate() {
            let item_path = index(&path, i);
            if let Some(item) = self.expect_object(item, &item_path) {
                check_item(self, item, &item_path);
            }
        }
    }

    fn positive_integer(&mut self, object: &Object, parent: &str, key: &str) {
        let Some(value) = self.required(object, parent, key) else {
            return;
        };
        let path = join(parent, key);
        if !value.is_number() {
            self.wrong_type(&path, "integer", value);
            return;
        }
        match value.as_u64() {
            Some(n) if n > 0 && n <= u64::from(u32::MAX) => {}
            _ => self.report(path, ViolationKind::NonPositive),
        }
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn index(path: &str, i: usize) -> String {
    format!("{}[{}]", path, i)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variant(label: &str, minutes: u64) -> Value {
        json!({
            "tier_label": label,
            "assumptions": ["Learner can open a terminal"],
            "executive_summary": "A short tour of the topic.",
            "lesson": {
                "script": [{
                    "segment_name": "Opening",
                    "narration": "Welcome to the lesson.",
                    "code": null,
                    "video_reference": "intro.mp4"
                }],
                "lab_ngc": {
                    "title": "First lab",
                    "instructions": "Follow the steps.",
                    "steps": ["Create a file"],
                    "starter_code": "",
                    "solution_code": "done"
                },
                "project": {
                    "title": "Capstone",
                    "brief": "Build something small.",
                    "criteria": ["It works"],
                    "steps": ["Plan", "Build"],
                    "line_explanations": [{"line": "done", "explanation": "Finishes the task"}],
                    "sample_code": "done"
                },
                "estimated_duration_minutes": minutes
            }
        })
    }

    fn document() -> Value {
        json!({
            "basic": variant("Basic", 180),
            "intermediate": variant("Intermediate", 360),
            "creative": variant("Creative", 600),
        })
    }

    fn violations(document: Value) -> SchemaValidationError {
        validate_value(document).expect_err("document should be rejected")
    }

    #[test]
    fn test_valid_document() {
        let set = validate(&document().to_string()).unwrap();
        assert_eq!(set[Tier::Creative].tier_label, "Creative");
        assert_eq!(set[Tier::Intermediate].lesson.estimated_duration_minutes, 360);
        assert_eq!(set[Tier::Basic].lesson.script[0].code, None);
    }

    #[test]
    fn test_invalid_json_is_single_root_violation() {
        let err = validate("{\"basic\": ").unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(matches!(err.violations[0].kind, ViolationKind::InvalidJson(_)));
    }

    #[test]
    fn test_reports_all_violations_not_just_first() {
        let mut doc = document();
        doc["basic"]["lesson"]
            .as_object_mut()
            .unwrap()
            .remove("script");
        doc["basic"]["lesson"]["project"]
            .as_object_mut()
            .unwrap()
            .remove("criteria");

        let err = violations(doc);
        assert!(err.has_violation_at("basic.lesson.script"));
        assert!(err.has_violation_at("basic.lesson.project.criteria"));
        assert_eq!(err.violations.len(), 2);
    }

    #[test]
    fn test_missing_tier_and_extra_key() {
        let mut doc = document();
        let root = doc.as_object_mut().unwrap();
        root.remove("creative");
        root.insert("advanced".to_string(), variant("Advanced", 900));

        let err = violations(doc);
        assert!(err.has_violation_at("creative"));
        assert!(err.has_violation_at("advanced"));
    }

    #[test]
    fn test_missing_lab_is_reported() {
        let mut doc = document();
        doc["intermediate"]["lesson"]
            .as_object_mut()
            .unwrap()
            .remove("lab_ngc");

        let err = violations(doc);
        assert_eq!(
            err.violations,
            vec![Violation::new("intermediate.lesson.lab_ngc", ViolationKind::Missing)]
        );
    }

    #[test]
    fn test_empty_sequences_and_narration() {
        let mut doc = document();
        doc["basic"]["lesson"]["script"] = json!([]);
        doc["creative"]["lesson"]["lab_ngc"]["steps"] = json!([]);
        doc["intermediate"]["lesson"]["script"][0]["narration"] = json!("  ");

        let err = violations(doc);
        assert!(err.has_violation_at("basic.lesson.script"));
        assert!(err.has_violation_at("creative.lesson.lab_ngc.steps"));
        assert!(err.has_violation_at("intermediate.lesson.script[0].narration"));
    }

    #[test]
    fn test_wrong_types() {
        let mut doc = document();
        doc["basic"]["assumptions"] = json!("none");
        doc["basic"]["lesson"]["project"]["steps"] = json!(["Plan", 2]);
        doc["basic"]["lesson"]["script"][0]["code"] = json!(42);
        doc["creative"] = json!([]);

        let err = violations(doc);
        let kinds: Vec<(&str, &ViolationKind)> = err
            .violations
            .iter()
            .map(|v| (v.path.as_str(), &v.kind))
            .collect();

        assert!(kinds.contains(&(
            "basic.assumptions",
            &ViolationKind::WrongType {
                expected: "array",
                found: "string"
            }
        )));
        assert!(err.has_violation_at("basic.lesson.project.steps[1]"));
        assert!(err.has_violation_at("basic.lesson.script[0].code"));
        assert!(err.has_violation_at("creative"));
    }

    #[test]
    fn test_duration_must_be_positive_integer() {
        let mut doc = document();
        doc["basic"]["lesson"]["estimated_duration_minutes"] = json!(0);
        doc["intermediate"]["lesson"]["estimated_duration_minutes"] = json!(-5);
        doc["creative"]["lesson"]["estimated_duration_minutes"] = json!("600");

        let err = violations(doc);
        assert_eq!(err.violations.len(), 3);
        assert_eq!(err.violations[0].kind, ViolationKind::NonPositive);
        assert_eq!(err.violations[1].kind, ViolationKind::NonPositive);
        assert!(matches!(
            err.violations[2].kind,
            ViolationKind::WrongType { expected: "integer", .. }
        ));
    }

    #[test]
    fn test_unknown_tier_label() {
        let mut doc = document();
        doc["creative"]["tier_label"] = json!("Expert");

        let err = violations(doc);
        assert_eq!(
            err.violations[0].kind,
            ViolationKind::UnknownTierLabel("Expert".to_string())
        );
    }

    #[test]
    fn test_code_may_be_omitted() {
        let mut doc = document();
        doc["basic"]["lesson"]["script"][0]
            .as_object_mut()
            .unwrap()
            .remove("code");
        assert!(validate_value(doc).is_ok());
    }

    #[test]
    fn test_root_must_be_object() {
        let err = validate("[1, 2, 3]").unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::new(
                "",
                ViolationKind::WrongType {
                    expected: "object",
                    found: "array"
                }
            )]
        );
    }
}
