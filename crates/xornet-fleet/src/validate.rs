//! Field validators applied before any storage call.
//!
//! Validators either accept a value (returning it normalised where the
//! stored form differs from the input) or fail with
//! [`FleetError::InvalidInput`].

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FleetError, Result};
use crate::storage::LabelIcon;

#[allow(clippy::expect_used)]
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,32}$").expect("static regex is valid"));

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("static regex is valid")
});

#[allow(clippy::expect_used)]
static HOSTNAME_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("static regex is valid")
});

#[allow(clippy::expect_used)]
static LABEL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]{3,16}$").expect("static regex is valid"));

#[allow(clippy::expect_used)]
static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#?([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").expect("static regex is valid")
});

pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_HOSTNAME_LEN: usize = 253;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_DESCRIPTION_LEN: usize = 300;

pub fn uuid(field: &str, value: &str) -> Result<()> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| FleetError::invalid(format!("{field} must be a UUID")))
}

pub fn hostname(value: &str) -> Result<()> {
    if value.is_empty() || value.len() > MAX_HOSTNAME_LEN {
        return Err(FleetError::invalid(format!(
            "hostname must be 1-{MAX_HOSTNAME_LEN} characters"
        )));
    }
    if !value.split('.').all(|label| HOSTNAME_LABEL_RE.is_match(label)) {
        return Err(FleetError::invalid("hostname is malformed"));
    }
    Ok(())
}

pub fn username(value: &str) -> Result<()> {
    if USERNAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(FleetError::invalid(
            "username must be 3-32 letters, digits, '_' or '-'",
        ))
    }
}

pub fn email(value: &str) -> Result<()> {
    if value.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(value) {
        Ok(())
    } else {
        Err(FleetError::invalid("email is malformed"))
    }
}

pub fn password(value: &str) -> Result<()> {
    let len = value.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(FleetError::invalid(format!(
            "password must be {MIN_PASSWORD_LEN}-{MAX_PASSWORD_LEN} characters"
        )))
    }
}

/// Normalise a label name: lowercase, whitespace and underscores become
/// dashes, dash runs collapse, leading/trailing dashes go. The result must be
/// 3-16 of `[a-z0-9-]`.
pub fn label_name(value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    for c in value.trim().chars() {
        let c = if c.is_whitespace() || c == '_' { '-' } else { c.to_ascii_lowercase() };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with('-') {
        out.pop();
    }

    if LABEL_NAME_RE.is_match(&out) {
        Ok(out)
    } else {
        Err(FleetError::invalid(
            "label name must be 3-16 lowercase letters, digits or dashes",
        ))
    }
}

/// Accept `#rgb` / `#rrggbb` (hash optional), return lowercase `#rrggbb`.
pub fn color(value: &str) -> Result<String> {
    let value = value.trim();
    if !COLOR_RE.is_match(value) {
        return Err(FleetError::invalid("color must be a hex color"));
    }
    let hex = value.trim_start_matches('#').to_ascii_lowercase();
    if hex.len() == 3 {
        Ok(hex.chars().fold(String::from("#"), |mut acc, c| {
            acc.push(c);
            acc.push(c);
            acc
        }))
    } else {
        Ok(format!("#{hex}"))
    }
}

pub fn icon(value: &str) -> Result<LabelIcon> {
    value.trim().parse().map_err(FleetError::InvalidInput)
}

pub fn description(value: &str) -> Result<()> {
    if value.chars().count() <= MAX_DESCRIPTION_LEN {
        Ok(())
    } else {
        Err(FleetError::invalid(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )))
    }
}
