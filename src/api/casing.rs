// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key-casing conversion between the client (camelCase) and the wire
//! (snake_case).
//!
//! Only object keys are rewritten. Values, array order and nesting are
//! preserved, and purely numeric keys are left alone.

use serde_json::{Map, Value};

/// Recursively convert object keys to camelCase.
pub fn camelize_keys(value: Value) -> Value {
    rewrite_keys(value, &camelize)
}

/// Recursively convert object keys to snake_case.
pub fn decamelize_keys(value: Value) -> Value {
    rewrite_keys(value, &decamelize)
}

fn rewrite_keys(value: Value, convert: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (convert(&key), rewrite_keys(value, convert)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rewrite_keys(item, convert))
                .collect(),
        ),
        other => other,
    }
}

/// `first_name` → `firstName`, `course-id` → `courseId`.
pub fn camelize(key: &str) -> String {
    if is_numeric(key) {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if matches!(ch, '_' | '-') || ch.is_whitespace() {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }

    lowercase_first(&out)
}

/// `courseId` → `course_id`, `FirstName` → `first_name`.
pub fn decamelize(key: &str) -> String {
    if is_numeric(key) {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
    }
    out
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_numeric(key: &str) -> bool {
    !key.is_empty() && key.trim().parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camelize_handles_separators() {
        assert_eq!(camelize("first_name"), "firstName");
        assert_eq!(camelize("course-id"), "courseId");
        assert_eq!(camelize("date of birth"), "dateOfBirth");
        assert_eq!(camelize("_private"), "private");
        assert_eq!(camelize("already"), "already");
        assert_eq!(camelize("Title"), "title");
    }

    #[test]
    fn decamelize_inserts_underscores() {
        assert_eq!(decamelize("courseId"), "course_id");
        assert_eq!(decamelize("firstName"), "first_name");
        assert_eq!(decamelize("FirstName"), "first_name");
        assert_eq!(decamelize("student_class"), "student_class");
        assert_eq!(decamelize("page"), "page");
    }

    #[test]
    fn numeric_keys_are_untouched() {
        assert_eq!(camelize("2024"), "2024");
        assert_eq!(decamelize("1.5"), "1.5");
    }

    #[test]
    fn request_body_goes_out_snake_cased() {
        let body = decamelize_keys(json!({ "courseId": 5, "firstName": "A" }));
        assert_eq!(body, json!({ "course_id": 5, "first_name": "A" }));
    }

    #[test]
    fn response_body_comes_back_camel_cased() {
        let body = camelize_keys(json!({ "first_name": "A" }));
        assert_eq!(body, json!({ "firstName": "A" }));
    }

    #[test]
    fn nested_objects_and_arrays_are_rewritten() {
        let body = camelize_keys(json!({
            "count": 1,
            "results": [
                { "first_name": "A", "profile": { "student_class": "9B" }, "tags": ["keep_me"] }
            ]
        }));
        assert_eq!(
            body,
            json!({
                "count": 1,
                "results": [
                    { "firstName": "A", "profile": { "studentClass": "9B" }, "tags": ["keep_me"] }
                ]
            })
        );
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(camelize_keys(json!("snake_value")), json!("snake_value"));
        assert_eq!(decamelize_keys(Value::Null), Value::Null);
    }
}
