//! Option Resolver.
//!
//! Interprets the raw option overlays carried by file, message and field
//! descriptors. Each scope is resolved independently; combining them (file
//! default vs. message override) is the caller's job. An absent overlay is
//! `Ok(None)`, meaning "use defaults".
//!
//! Keys are accepted in protojson camelCase or proto snake_case, and 64-bit
//! counts may be written as decimal strings, as protojson does for `int64`.
//! Zero and empty values mean "unset".

use crate::{FieldDescriptor, FileDescriptor, MessageDescriptor, SynthResult, SynthesisError};
use regex::Regex;
use schemars::JsonSchema;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// File-level generation control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileSchemaOptions {
    /// Generate schemas for every message in the file unless a message opts out
    #[serde(default)]
    pub generate: bool,
}

/// Message-level generation control; overrides the file default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MessageSchemaOptions {
    #[serde(default)]
    pub generate: bool,
}

/// Field-level overrides and validation constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldSchemaOptions {
    /// Leave the field out of the schema entirely
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore: bool,
    /// Replaces the comment-derived title
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Replaces the comment-derived description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pattern: String,
    #[serde(default, deserialize_with = "number", skip_serializing_if = "is_zero")]
    pub minimum: f64,
    #[serde(default, deserialize_with = "number", skip_serializing_if = "is_zero")]
    pub maximum: f64,
    #[serde(default, alias = "exclusive_minimum", skip_serializing_if = "is_false")]
    pub exclusive_minimum: bool,
    #[serde(default, alias = "exclusive_maximum", skip_serializing_if = "is_false")]
    pub exclusive_maximum: bool,
    #[serde(default, alias = "min_length", deserialize_with = "count", skip_serializing_if = "is_unset")]
    pub min_length: u64,
    #[serde(default, alias = "max_length", deserialize_with = "count", skip_serializing_if = "is_unset")]
    pub max_length: u64,
    #[serde(default, alias = "min_items", deserialize_with = "count", skip_serializing_if = "is_unset")]
    pub min_items: u64,
    #[serde(default, alias = "max_items", deserialize_with = "count", skip_serializing_if = "is_unset")]
    pub max_items: u64,
    #[serde(default, alias = "unique_items", skip_serializing_if = "is_false")]
    pub unique_items: bool,
    #[serde(default, alias = "min_properties", deserialize_with = "count", skip_serializing_if = "is_unset")]
    pub min_properties: u64,
    #[serde(default, alias = "max_properties", deserialize_with = "count", skip_serializing_if = "is_unset")]
    pub max_properties: u64,
    /// Defaults to `base64` for bytes fields
    #[serde(default, alias = "content_encoding", skip_serializing_if = "String::is_empty")]
    pub content_encoding: String,
    #[serde(default, alias = "content_media_type", skip_serializing_if = "String::is_empty")]
    pub content_media_type: String,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &f64) -> bool {
    *n == 0.0
}

fn is_unset(n: &u64) -> bool {
    *n == 0
}

fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(D::Error::custom(format!(
            "expected a finite number, found {value}"
        ))),
    }
}

fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(d)?;
    let parsed = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        D::Error::custom(format!("expected a non-negative integer, found {value}"))
    })
}

impl FieldSchemaOptions {
    /// Check cross-field consistency. `scope` names the field for errors.
    fn check(&self, scope: &str) -> SynthResult<()> {
        if !self.pattern.is_empty() {
            Regex::new(&self.pattern).map_err(|e| {
                SynthesisError::malformed(scope, format!("pattern does not compile: {e}"))
            })?;
        }
        let bounds = [
            ("minLength", self.min_length, "maxLength", self.max_length),
            ("minItems", self.min_items, "maxItems", self.max_items),
            (
                "minProperties",
                self.min_properties,
                "maxProperties",
                self.max_properties,
            ),
        ];
        for (lo_name, lo, hi_name, hi) in bounds {
            if lo != 0 && hi != 0 && lo > hi {
                return Err(SynthesisError::malformed(
                    scope,
                    format!("{lo_name} ({lo}) exceeds {hi_name} ({hi})"),
                ));
            }
        }
        if self.minimum != 0.0 && self.maximum != 0.0 && self.minimum > self.maximum {
            return Err(SynthesisError::malformed(
                scope,
                format!(
                    "minimum ({}) exceeds maximum ({})",
                    self.minimum, self.maximum
                ),
            ));
        }
        Ok(())
    }
}

fn parse_overlay<T: DeserializeOwned>(raw: Option<&Value>, scope: &str) -> SynthResult<Option<T>> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| SynthesisError::malformed(scope, e.to_string())),
    }
}

/// Options attached to a file.
pub fn file_options(file: &FileDescriptor) -> SynthResult<Option<FileSchemaOptions>> {
    parse_overlay(file.options.as_ref(), &format!("file {}", file.path))
}

/// Options attached to a message.
pub fn message_options(message: &MessageDescriptor) -> SynthResult<Option<MessageSchemaOptions>> {
    parse_overlay(
        message.options.as_ref(),
        &format!("message {}", message.full_name),
    )
}

/// Options attached to a field of `owner`.
pub fn field_options(
    owner: &MessageDescriptor,
    field: &FieldDescriptor,
) -> SynthResult<Option<FieldSchemaOptions>> {
    let scope = format!("field {}.{}", owner.full_name, field.name);
    let opts: Option<FieldSchemaOptions> = parse_overlay(field.options.as_ref(), &scope)?;
    if let Some(o) = &opts {
        o.check(&scope)?;
    }
    Ok(opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::fixtures::*;
    use crate::FieldKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn with_options(options: Value) -> (MessageDescriptor, FieldDescriptor) {
        let mut f = field("name", 1, FieldKind::String);
        f.options = Some(options);
        (message("test.v1.User", vec![f.clone()]), f)
    }

    #[test]
    fn test_absent_options_are_none() {
        let msg = message("test.v1.User", vec![]);
        assert!(message_options(&msg).unwrap().is_none());
        assert!(file_options(&file(vec![])).unwrap().is_none());
        let f = field("x", 1, FieldKind::Bool);
        assert!(field_options(&msg, &f).unwrap().is_none());
    }

    #[test]
    fn test_generate_flags() {
        let mut f = file(vec![]);
        f.options = Some(json!({"generate": true}));
        assert_eq!(
            file_options(&f).unwrap(),
            Some(FileSchemaOptions { generate: true })
        );

        let mut msg = message("test.v1.User", vec![]);
        msg.options = Some(json!({}));
        assert_eq!(
            message_options(&msg).unwrap(),
            Some(MessageSchemaOptions { generate: false })
        );
    }

    #[test]
    fn test_field_options_accept_both_casings_and_string_counts() {
        let (msg, f) = with_options(json!({
            "title": "Name",
            "minLength": "2",
            "max_length": 64,
            "pattern": "^[a-z]+$",
            "minimum": "1.5",
        }));
        let opts = field_options(&msg, &f).unwrap().unwrap();
        assert_eq!(opts.title, "Name");
        assert_eq!(opts.min_length, 2);
        assert_eq!(opts.max_length, 64);
        assert_eq!(opts.minimum, 1.5);
    }

    #[test]
    fn test_non_numeric_bound_is_malformed() {
        let (msg, f) = with_options(json!({"maxLength": "lots"}));
        let err = field_options(&msg, &f).unwrap_err();
        match err {
            SynthesisError::MalformedOption { scope, message } => {
                assert_eq!(scope, "field test.v1.User.name");
                assert!(message.contains("non-negative integer"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_count_is_malformed() {
        let (msg, f) = with_options(json!({"minItems": -1}));
        assert!(matches!(
            field_options(&msg, &f),
            Err(SynthesisError::MalformedOption { .. })
        ));
    }

    #[test]
    fn test_unknown_key_is_malformed() {
        let (msg, f) = with_options(json!({"maxLenght": 3}));
        assert!(matches!(
            field_options(&msg, &f),
            Err(SynthesisError::MalformedOption { .. })
        ));
    }

    #[test]
    fn test_inverted_bounds_are_malformed() {
        let (msg, f) = with_options(json!({"minLength": 10, "maxLength": 2}));
        let err = field_options(&msg, &f).unwrap_err().to_string();
        assert!(err.contains("minLength (10) exceeds maxLength (2)"), "{err}");
    }

    #[test]
    fn test_bad_pattern_is_malformed() {
        let (msg, f) = with_options(json!({"pattern": "(unclosed"}));
        assert!(matches!(
            field_options(&msg, &f),
            Err(SynthesisError::MalformedOption { .. })
        ));
    }

    #[test]
    fn test_serialization_skips_unset_values() {
        let opts = FieldSchemaOptions {
            title: "T".to_string(),
            max_items: 3,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            json!({"title": "T", "maxItems": 3})
        );
    }
}
