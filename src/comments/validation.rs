// Request bodies and the rules they must satisfy before reaching the service.
use serde::{Deserialize, Serialize};

/// A single rejected field, reported back as one entry of `{"errors": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub msg: String,
    pub param: String,
    pub location: String,
}

impl FieldError {
    pub fn body(param: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            param: param.into(),
            location: "body".to_string(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

fn is_empty(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateCommentRequest {
    pub text: Option<String>,
    pub post: Option<String>,
}

impl Validate for CreateCommentRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if is_empty(&self.text) {
            errors.push(FieldError::body("text", "Text is required"));
        }
        if is_empty(&self.post) {
            errors.push(FieldError::body("post", "Post is required"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Update only requires that `text` is present; an empty string is accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCommentRequest {
    pub text: Option<String>,
}

impl Validate for UpdateCommentRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        match self.text {
            Some(_) => Ok(()),
            None => Err(vec![FieldError::body("text", "Text is required")]),
        }
    }
}
