//! Error messages extracted from response bodies.
//!
//! Shopify reports failures in several shapes:
//!
//! - REST `{"errors": "Not Found"}`: a single message, filed under `resource`
//! - REST `{"errors": {"title": ["can't be blank"]}}`: field to message(s)
//! - GraphQL `{"errors": [{"message": "...", "path": [...]}]}`
//! - GraphQL mutations `{"data": {"x": {"userErrors": [{"field": [...], "message": "..."}]}}}`
//!
//! Each shape is flattened into a [`ResponseErrors`] list of
//! [`FieldError`]s rendered as `"<message> [<field>]"`, which callers can
//! test against [`MessagePattern`]s.

use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Maximum nesting depth searched for a `userErrors` key.
const USER_ERRORS_MAX_DEPTH: usize = 32;

/// A single message attached to a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    /// The field the message refers to, e.g. `title`, `input.handle` or `.`.
    pub field: String,
    /// The human readable message.
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.message, self.field)
    }
}

/// A literal or regular expression to match rendered error messages against.
///
/// Literals must equal the whole rendered message (`"<message> [<field>]"`);
/// regular expressions match anywhere in it.
///
/// # Example
///
/// ```rust
/// use shopify_client::clients::MessagePattern;
///
/// let literal = MessagePattern::from("has already been taken [handle]");
/// assert!(literal.is_match("has already been taken [handle]"));
///
/// let regex = MessagePattern::regex("(?i)already been taken").unwrap();
/// assert!(regex.is_match("Has already been taken [handle]"));
/// ```
#[derive(Clone, Debug)]
pub enum MessagePattern {
    /// Exact match on the rendered message.
    Literal(String),
    /// Regular expression search in the rendered message.
    Regex(Regex),
}

impl MessagePattern {
    /// Compiles a regular expression pattern.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if the expression is invalid.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Regex)
    }

    /// Returns `true` if `message` matches this pattern.
    #[must_use]
    pub fn is_match(&self, message: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == message,
            Self::Regex(regex) => regex.is_match(message),
        }
    }
}

impl From<&str> for MessagePattern {
    fn from(literal: &str) -> Self {
        Self::Literal(literal.to_string())
    }
}

impl From<String> for MessagePattern {
    fn from(literal: String) -> Self {
        Self::Literal(literal)
    }
}

impl From<Regex> for MessagePattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}

/// An ordered collection of [`FieldError`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseErrors {
    errors: Vec<FieldError>,
}

impl ResponseErrors {
    /// Extracts the top-level `errors` of a response body.
    ///
    /// ```rust
    /// use shopify_client::clients::ResponseErrors;
    /// use serde_json::json;
    ///
    /// let errors = ResponseErrors::from_body(&json!({"errors": "Not Found"}));
    /// assert_eq!(errors.messages(), vec!["Not Found [resource]"]);
    /// ```
    #[must_use]
    pub fn from_body(body: &Value) -> Self {
        let errors = match body.get("errors") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(message)) => vec![FieldError::new("resource", message.as_str())],
            Some(Value::Object(fields)) => fields
                .iter()
                .flat_map(|(field, messages)| match messages {
                    Value::Array(messages) => messages
                        .iter()
                        .map(|message| FieldError::new(field.as_str(), value_text(message)))
                        .collect(),
                    message => vec![FieldError::new(field.as_str(), value_text(message))],
                })
                .collect(),
            Some(Value::Array(entries)) => entries
                .iter()
                .map(|entry| {
                    let message = entry.get("message").map_or_else(|| value_text(entry), value_text);
                    FieldError::new(join_field_path(entry.get("path")), message)
                })
                .collect(),
            Some(other) => vec![FieldError::new("resource", value_text(other))],
        };

        Self { errors }
    }

    /// Extracts the first `userErrors` list found in a response body.
    ///
    /// The body is searched depth first through nested objects (not arrays),
    /// up to a fixed depth. Keys are visited in map order, which for
    /// `serde_json` is sorted order.
    ///
    /// ```rust
    /// use shopify_client::clients::ResponseErrors;
    /// use serde_json::json;
    ///
    /// let body = json!({"data": {"productCreate": {"userErrors": [
    ///     {"field": ["input", "title"], "message": "can't be blank"},
    ///     {"field": null, "message": "invalid"}
    /// ]}}});
    /// let errors = ResponseErrors::user_errors_from_body(&body);
    /// assert_eq!(
    ///     errors.messages(),
    ///     vec!["can't be blank [input.title]", "invalid [.]"]
    /// );
    /// ```
    #[must_use]
    pub fn user_errors_from_body(body: &Value) -> Self {
        let errors = find_user_errors(body, USER_ERRORS_MAX_DEPTH)
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| {
                        FieldError::new(
                            join_field_path(entry.get("field")),
                            entry.get("message").map(value_text).unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { errors }
    }

    /// Returns `true` if there are no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterates over the errors in response order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Returns every error rendered as `"<message> [<field>]"`.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Returns the first rendered message, if any.
    #[must_use]
    pub fn first_message(&self) -> Option<String> {
        self.errors.first().map(ToString::to_string)
    }

    /// Returns `true` if any rendered message matches any of `patterns`.
    #[must_use]
    pub fn matches(&self, patterns: &[MessagePattern]) -> bool {
        self.errors.iter().any(|error| {
            let message = error.to_string();
            patterns.iter().any(|pattern| pattern.is_match(&message))
        })
    }
}

impl<'a> IntoIterator for &'a ResponseErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

fn find_user_errors(value: &Value, depth: usize) -> Option<&Value> {
    if depth == 0 {
        return None;
    }

    let object = value.as_object()?;
    for (key, value) in object {
        if key == "userErrors" {
            return Some(value);
        }
        if value.is_object() {
            if let Some(found) = find_user_errors(value, depth - 1) {
                return Some(found);
            }
        }
    }

    None
}

fn join_field_path(path: Option<&Value>) -> String {
    match path {
        Some(Value::Array(parts)) if !parts.is_empty() => parts
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join("."),
        Some(Value::String(field)) => field.clone(),
        _ => ".".to_string(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
