//! Card and e-mail payload validation
//!
//! Two reporting modes are offered because callers differ: [`validate_card`]
//! collects every violation in a fixed order, [`ensure_valid_card`] stops at
//! the first one.

use crate::cards::types::CardDraft;
use crate::error::{CardError, FieldError, Result};
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Whether `cardType` is required and must be a known type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Strict,
    Lenient,
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(#([0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})|[a-zA-Z]{1,30})$")
            .expect("valid color regex")
    })
}

fn font_family_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9 ,\-]{1,100}$").expect("valid font regex"))
}

fn font_size_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,2})?(px|pt|em|rem|%)$").expect("valid font size regex")
    })
}

/// `local@domain.tld` syntax check; the address must also be one SMTP can carry
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email) && email.parse::<lettre::Address>().is_ok()
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Validate a candidate card, returning every violation in order
pub fn validate_card(draft: &CardDraft<'_>, mode: ValidationMode) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if is_blank(draft.recipient_name) {
        errors.push(FieldError::new("recipientName", "Recipient name is required"));
    }

    match draft.recipient_email {
        Some(email) if !email.trim().is_empty() => {
            if !is_valid_email(email) {
                errors.push(FieldError::new(
                    "recipientEmail",
                    "Please enter a valid email address",
                ));
            }
        }
        _ => errors.push(FieldError::new("recipientEmail", "Recipient email is required")),
    }

    if is_blank(draft.sender_name) {
        errors.push(FieldError::new("senderName", "Sender name is required"));
    }

    match draft.message {
        Some(message) if !message.trim().is_empty() => {
            if message.chars().count() > MAX_MESSAGE_CHARS {
                errors.push(FieldError::new(
                    "message",
                    "Message must be 1000 characters or fewer",
                ));
            }
        }
        _ => errors.push(FieldError::new("message", "Message is required")),
    }

    if mode == ValidationMode::Strict {
        match draft.card_type {
            None => errors.push(FieldError::new("cardType", "Card type is required")),
            Some(card_type) if !card_type.is_known() => {
                errors.push(FieldError::new("cardType", "Unknown card type"))
            }
            Some(_) => {}
        }
    }

    validate_presentation(draft, &mut errors);

    errors
}

/// Style values are interpolated into markup unescaped, so they are held to
/// a narrow syntax here
fn validate_presentation(draft: &CardDraft<'_>, errors: &mut Vec<FieldError>) {
    for (field, value) in [
        ("backgroundColor", draft.background_color),
        ("textColor", draft.text_color),
        ("borderColor", draft.border_color),
    ] {
        if let Some(value) = value {
            if !color_regex().is_match(value) {
                errors.push(FieldError::new(field, "Invalid color value"));
            }
        }
    }

    if let Some(font) = draft.font_family {
        if !font_family_regex().is_match(font) {
            errors.push(FieldError::new("fontFamily", "Invalid font family"));
        }
    }

    if let Some(size) = draft.font_size {
        if !font_size_regex().is_match(size) {
            errors.push(FieldError::new("fontSize", "Invalid font size"));
        }
    }

    if let Some(url) = draft.image_url {
        let has_scheme = url.starts_with("http://") || url.starts_with("https://");
        if !has_scheme || url.chars().any(char::is_whitespace) {
            errors.push(FieldError::new("imageUrl", "Image URL must be an http(s) URL"));
        }
    }
}

/// Fail-fast variant of [`validate_card`]
pub fn ensure_valid_card(draft: &CardDraft<'_>, mode: ValidationMode) -> Result<()> {
    match validate_card(draft, mode).into_iter().next() {
        Some(first) => Err(CardError::Validation(vec![first])),
        None => Ok(()),
    }
}

/// Validate an ad-hoc e-mail request, failing on the first problem
pub fn ensure_valid_email_request(
    to: Option<&str>,
    subject: Option<&str>,
    html: Option<&str>,
) -> Result<()> {
    let missing: Vec<&str> = [("to", to), ("subject", subject), ("html", html)]
        .into_iter()
        .filter(|(_, value)| is_blank(*value))
        .map(|(field, _)| field)
        .collect();

    if let Some(field) = missing.first() {
        return Err(CardError::invalid(
            field,
            "Missing required fields: to, subject, html",
        ));
    }

    if !to.map_or(false, is_valid_email) {
        return Err(CardError::invalid("to", "Invalid email address"));
    }

    Ok(())
}
