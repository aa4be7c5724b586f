use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};

use super::repo_types::{RestrictionStatus, User};
use crate::error::FieldErrors;

// Validation messages are part of the public response contract.

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default, deserialize_with = "text")]
    #[validate(
        required(message = "The name field is required."),
        length(max = 20, message = "The name field must not be greater than 20 characters.")
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(
        required(message = "The lastname field is required."),
        length(max = 20, message = "The lastname field must not be greater than 20 characters.")
    )]
    pub lastname: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email field must be a valid email address.")
    )]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(
        required(message = "The phone field is required."),
        custom(function = "ten_digits")
    )]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "secret")]
    #[validate(
        required(message = "The password field is required."),
        length(min = 6, message = "The password field must be at least 6 characters.")
    )]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(required(message = "The created by field is required."))]
    pub created_by: Option<String>,
}

/// Body of `PUT /users/{id}`: every attribute is required again.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "text")]
    #[validate(
        required(message = "The name field is required."),
        length(max = 20, message = "The name field must not be greater than 20 characters.")
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(
        required(message = "The lastname field is required."),
        length(max = 20, message = "The lastname field must not be greater than 20 characters.")
    )]
    pub lastname: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email field must be a valid email address.")
    )]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(
        required(message = "The phone field is required."),
        custom(function = "ten_digits")
    )]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "secret")]
    #[validate(
        required(message = "The password field is required."),
        length(min = 6, message = "The password field must be at least 6 characters.")
    )]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(custom(function = "assignable_status"))]
    pub is_restricted: Option<String>,
}

/// Body of `PATCH /users/{id}`: only supplied attributes are validated and applied.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PatchUserRequest {
    #[serde(default, deserialize_with = "text")]
    #[validate(length(max = 20, message = "The name field must not be greater than 20 characters."))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(length(
        max = 20,
        message = "The lastname field must not be greater than 20 characters."
    ))]
    pub lastname: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(email(message = "The email field must be a valid email address."))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(custom(function = "ten_digits"))]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "secret")]
    #[validate(length(min = 6, message = "The password field must be at least 6 characters."))]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "text")]
    #[validate(custom(function = "assignable_status"))]
    pub is_restricted: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(default, deserialize_with = "secret")]
    pub current_password: Option<String>,
    #[serde(default, deserialize_with = "secret")]
    #[validate(
        required(message = "The new password field is required."),
        length(min = 6, message = "The new password field must be at least 6 characters.")
    )]
    pub new_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub per_page: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub current_page: i64,
    pub last_page: i64,
    pub per_page: i64,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

#[derive(Debug)]
pub struct UserPage {
    pub data: Vec<User>,
    pub pagination: Pagination,
}

/// Flattens validator output into `{field: [message, ..]}`.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, list)| {
            let messages = list
                .iter()
                .map(|e| match &e.message {
                    Some(m) => m.to_string(),
                    None => format!("The {} field is invalid.", field.replace('_', " ")),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

pub(crate) fn parse_assignable(raw: &str) -> Option<RestrictionStatus> {
    raw.parse::<RestrictionStatus>()
        .ok()
        .filter(|s| s.assignable())
}

fn ten_digits(phone: &str) -> Result<(), ValidationError> {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
    }
    if PHONE_RE.is_match(phone) {
        return Ok(());
    }
    Err(ValidationError::new("digits")
        .with_message(Cow::from("The phone field must be 10 digits.")))
}

fn assignable_status(raw: &str) -> Result<(), ValidationError> {
    match parse_assignable(raw) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("in")
            .with_message(Cow::from("The selected is restricted is invalid."))),
    }
}

/// Scalar text field: trimmed, blank becomes absent, numbers are accepted as text.
fn text<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar(de)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Like [`text`] but never trims, so surrounding whitespace stays part of a password.
fn secret<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar(de)?.filter(|s| !s.is_empty()))
}

fn scalar<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(de)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {other}"
        ))),
    }
}
