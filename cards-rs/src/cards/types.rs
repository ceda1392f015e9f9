//! Card types and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_BACKGROUND_COLOR: &str = "#ffffff";
pub const DEFAULT_TEXT_COLOR: &str = "#333333";
pub const DEFAULT_BORDER_COLOR: &str = "#e91e63";
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_FONT_SIZE: &str = "16px";
pub const DEFAULT_PATTERN: &str = "none";

/// A greeting card record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Store-assigned identifier, immutable
    pub id: String,
    pub card_type: CardType,
    pub recipient_name: String,
    pub recipient_email: String,
    pub sender_name: String,
    pub message: String,
    pub background_color: String,
    pub text_color: String,
    pub border_color: String,
    pub font_family: String,
    pub font_size: String,
    /// Decorative pattern key; unknown keys render no pattern
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    /// Provider message id recorded when the card was sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub is_sent: bool,
}

impl Card {
    /// Build a fresh draft from a validated create payload
    pub fn from_input(id: String, input: CardInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            card_type: input.card_type.unwrap_or_default(),
            recipient_name: input.recipient_name.unwrap_or_default(),
            recipient_email: input.recipient_email.unwrap_or_default(),
            sender_name: input.sender_name.unwrap_or_default(),
            message: input.message.unwrap_or_default(),
            background_color: input
                .background_color
                .unwrap_or_else(|| DEFAULT_BACKGROUND_COLOR.to_string()),
            text_color: input
                .text_color
                .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string()),
            border_color: input
                .border_color
                .unwrap_or_else(|| DEFAULT_BORDER_COLOR.to_string()),
            font_family: input
                .font_family
                .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
            font_size: input
                .font_size
                .unwrap_or_else(|| DEFAULT_FONT_SIZE.to_string()),
            pattern: input.pattern.unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
            image_url: input.image_url.filter(|url| !url.trim().is_empty()),
            created_at: now,
            updated_at: now,
            sent_at: None,
            message_id: None,
            is_sent: false,
        }
    }

    pub fn draft(&self) -> CardDraft<'_> {
        CardDraft {
            card_type: Some(&self.card_type),
            recipient_name: Some(&self.recipient_name),
            recipient_email: Some(&self.recipient_email),
            sender_name: Some(&self.sender_name),
            message: Some(&self.message),
            background_color: Some(&self.background_color),
            text_color: Some(&self.text_color),
            border_color: Some(&self.border_color),
            font_family: Some(&self.font_family),
            font_size: Some(&self.font_size),
            image_url: self.image_url.as_deref(),
        }
    }
}

/// Kind of card; drives the subject line, heading and closing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CardType {
    #[default]
    ThankYou,
    Birthday,
    Congratulations,
    GetWell,
    Holiday,
    Custom,
    PaymentRequest,
    Condolence,
    Baby,
    Wedding,
    Apology,
    /// Any value outside the known set, kept verbatim
    Unknown(String),
}

impl CardType {
    pub fn as_str(&self) -> &str {
        match self {
            CardType::ThankYou => "thank-you",
            CardType::Birthday => "birthday",
            CardType::Congratulations => "congratulations",
            CardType::GetWell => "get-well",
            CardType::Holiday => "holiday",
            CardType::Custom => "custom",
            CardType::PaymentRequest => "payment-request",
            CardType::Condolence => "condolence",
            CardType::Baby => "baby",
            CardType::Wedding => "wedding",
            CardType::Apology => "apology",
            CardType::Unknown(value) => value,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, CardType::Unknown(_))
    }
}

impl From<String> for CardType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "thank-you" => CardType::ThankYou,
            "birthday" => CardType::Birthday,
            "congratulations" => CardType::Congratulations,
            "get-well" => CardType::GetWell,
            "holiday" => CardType::Holiday,
            "custom" => CardType::Custom,
            "payment-request" => CardType::PaymentRequest,
            "condolence" => CardType::Condolence,
            "baby" => CardType::Baby,
            "wedding" => CardType::Wedding,
            "apology" => CardType::Apology,
            _ => CardType::Unknown(value),
        }
    }
}

impl From<CardType> for String {
    fn from(value: CardType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for creating a card
///
/// Content fields are optional at the type level so validation can report
/// each missing one; presentation fields fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CardInput {
    pub card_type: Option<CardType>,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub sender_name: Option<String>,
    pub message: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub border_color: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub pattern: Option<String>,
    pub image_url: Option<String>,
}

impl CardInput {
    pub fn draft(&self) -> CardDraft<'_> {
        CardDraft {
            card_type: self.card_type.as_ref(),
            recipient_name: self.recipient_name.as_deref(),
            recipient_email: self.recipient_email.as_deref(),
            sender_name: self.sender_name.as_deref(),
            message: self.message.as_deref(),
            background_color: self.background_color.as_deref(),
            text_color: self.text_color.as_deref(),
            border_color: self.border_color.as_deref(),
            font_family: self.font_family.as_deref(),
            font_size: self.font_size.as_deref(),
            image_url: self.image_url.as_deref().filter(|url| !url.trim().is_empty()),
        }
    }
}

/// Partial update; every field optional, unknown fields rejected
///
/// An empty `imageUrl` removes the image.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CardUpdate {
    pub card_type: Option<CardType>,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub sender_name: Option<String>,
    pub message: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub border_color: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub pattern: Option<String>,
    pub image_url: Option<String>,
}

impl CardUpdate {
    /// Shallow field-level merge onto an existing card
    pub fn apply(self, card: &mut Card) {
        if let Some(card_type) = self.card_type {
            card.card_type = card_type;
        }
        if let Some(value) = self.recipient_name {
            card.recipient_name = value;
        }
        if let Some(value) = self.recipient_email {
            card.recipient_email = value;
        }
        if let Some(value) = self.sender_name {
            card.sender_name = value;
        }
        if let Some(value) = self.message {
            card.message = value;
        }
        if let Some(value) = self.background_color {
            card.background_color = value;
        }
        if let Some(value) = self.text_color {
            card.text_color = value;
        }
        if let Some(value) = self.border_color {
            card.border_color = value;
        }
        if let Some(value) = self.font_family {
            card.font_family = value;
        }
        if let Some(value) = self.font_size {
            card.font_size = value;
        }
        if let Some(value) = self.pattern {
            card.pattern = value;
        }
        if let Some(value) = self.image_url {
            card.image_url = if value.trim().is_empty() { None } else { Some(value) };
        }
    }
}

/// Borrowed view of a candidate card, shared by create, update and preview
#[derive(Debug, Clone, Copy, Default)]
pub struct CardDraft<'a> {
    pub card_type: Option<&'a CardType>,
    pub recipient_name: Option<&'a str>,
    pub recipient_email: Option<&'a str>,
    pub sender_name: Option<&'a str>,
    pub message: Option<&'a str>,
    pub background_color: Option<&'a str>,
    pub text_color: Option<&'a str>,
    pub border_color: Option<&'a str>,
    pub font_family: Option<&'a str>,
    pub font_size: Option<&'a str>,
    pub image_url: Option<&'a str>,
}

/// Filter for listing cards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub is_sent: Option<bool>,
}

impl CardFilter {
    pub fn matches(&self, card: &Card) -> bool {
        self.is_sent.map_or(true, |sent| card.is_sent == sent)
    }
}

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset,
        }
    }

    /// Parse raw query values; negative, zero or non-numeric inputs fall back
    /// to the defaults
    pub fn from_query(limit: Option<&str>, offset: Option<&str>) -> Self {
        let limit = limit
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .map(|v| (v as usize).min(MAX_LIMIT))
            .unwrap_or(DEFAULT_LIMIT);
        let offset = offset
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v >= 0)
            .map(|v| v as usize)
            .unwrap_or(0);

        Self { limit, offset }
    }
}

/// One page of a card listing
#[derive(Debug, Clone, Serialize)]
pub struct CardPage {
    pub cards: Vec<Card>,
    /// Matches before pagination
    pub total: usize,
}

/// Raw list query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub sent: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListQuery {
    pub fn filter(&self) -> CardFilter {
        let is_sent = match self.sent.as_deref().map(str::trim) {
            Some("true") | Some("1") => Some(true),
            Some("false") | Some("0") => Some(false),
            _ => None,
        };
        CardFilter { is_sent }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.limit.as_deref(), self.offset.as_deref())
    }
}
