// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use roster_app::{RoleFilter, is_valid_page_size};
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";
pub const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidUsername,
    InvalidEmail,
    InvalidRoles,
    InvalidPageSize,
    InvalidDate,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUsername => f.write_str("invalid username"),
            Self::InvalidEmail => f.write_str("invalid email address"),
            Self::InvalidRoles => f.write_str("invalid role list"),
            Self::InvalidPageSize => f.write_str("invalid page size"),
            Self::InvalidDate => f.write_str("invalid date value"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Lowercases and checks `[a-z][a-z0-9._-]*`, at most 64 characters.
pub fn parse_username(input: &str) -> ValidationResult<String> {
    let username = input.trim().to_ascii_lowercase();
    let mut bytes = username.bytes();
    let starts_with_letter = bytes.next().is_some_and(|byte| byte.is_ascii_lowercase());
    if !starts_with_letter
        || username.len() > MAX_USERNAME_LEN
        || !bytes.all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-'))
    {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(username)
}

pub fn parse_email(input: &str) -> ValidationResult<String> {
    let email = input.trim().to_ascii_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email)
}

/// Normalizes a space-separated role list. Empty input means `system_user`.
pub fn parse_roles(input: &str) -> ValidationResult<String> {
    let mut roles = Vec::new();
    for raw in input.split_whitespace() {
        let role = RoleFilter::parse(raw).ok_or(ValidationError::InvalidRoles)?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    if roles.is_empty() {
        return Ok(RoleFilter::SystemUser.as_str().to_owned());
    }
    Ok(roles
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(" "))
}

pub fn parse_page_size(input: &str) -> ValidationResult<usize> {
    let size = input
        .trim()
        .parse::<usize>()
        .map_err(|_| ValidationError::InvalidPageSize)?;
    if !is_valid_page_size(size) {
        return Err(ValidationError::InvalidPageSize);
    }
    Ok(size)
}

pub fn parse_required_date(input: &str) -> ValidationResult<Date> {
    Date::parse(input.trim(), &format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::InvalidDate)
}

/// Midnight UTC of `date`, in unix milliseconds.
pub fn date_start_millis(date: Date) -> i64 {
    let at = date.with_time(Time::MIDNIGHT).assume_utc();
    roster_app::unix_millis(at)
}

pub fn format_timestamp(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|at| {
            at.format(&format_description!("[year]-[month]-[day]"))
                .ok()
        })
        .unwrap_or_default()
}

pub fn format_optional_timestamp(millis: Option<i64>) -> String {
    millis.map_or_else(String::new, format_timestamp)
}
