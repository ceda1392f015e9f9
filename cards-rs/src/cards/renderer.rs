//! Card rendering into an e-mail subject, HTML body and plain-text fallback

use crate::cards::types::{Card, CardInput, CardType};
use crate::cards::validator::{ensure_valid_card, ValidationMode};
use crate::error::Result;
use chrono::Utc;
use serde::Serialize;

/// Rendered e-mail parts for a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedCard {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Per-type wording used by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardTypeInfo {
    pub display_name: &'static str,
    pub emoji: &'static str,
    pub heading: &'static str,
    pub closing: &'static str,
}

const GENERIC_CARD: CardTypeInfo = CardTypeInfo {
    display_name: "Greeting Card",
    emoji: "💌",
    heading: "You've Received a Greeting Card!",
    closing: "Warm wishes,",
};

/// Look up the wording for a card type, falling back to a generic card
pub fn card_type_info(card_type: &CardType) -> CardTypeInfo {
    let (display_name, emoji, heading, closing) = match card_type {
        CardType::ThankYou => (
            "Thank You",
            "💝",
            "You've Received a Thank You Card!",
            "With gratitude,",
        ),
        CardType::Birthday => (
            "Happy Birthday",
            "🎂",
            "Birthday Wishes Card!",
            "Happy Birthday from,",
        ),
        CardType::Congratulations => (
            "Congratulations",
            "🎉",
            "Congratulations Card!",
            "Congratulations from,",
        ),
        CardType::GetWell => (
            "Get Well Soon",
            "🌸",
            "Get Well Soon Card",
            "Get well soon from,",
        ),
        CardType::Holiday => (
            "Holiday Greetings",
            "🎄",
            "Holiday Greetings Card!",
            "Season's greetings,",
        ),
        CardType::Custom => ("Custom Message", "✉️", "You've Received a Card!", "Best wishes,"),
        CardType::PaymentRequest => (
            "Payment Request",
            "💰",
            "Payment Request Card",
            "Best regards,",
        ),
        CardType::Condolence => ("With Sympathy", "🕊️", "Condolence Card", "With sympathy,"),
        CardType::Baby => (
            "Baby Congratulations",
            "👶",
            "Baby Congratulations Card!",
            "With love,",
        ),
        CardType::Wedding => (
            "Wedding Congratulations",
            "💒",
            "Wedding Congratulations Card!",
            "With best wishes,",
        ),
        CardType::Apology => ("Apology", "🙏", "Apology Card", "Sincerely,"),
        CardType::Unknown(_) => return GENERIC_CARD,
    };

    CardTypeInfo {
        display_name,
        emoji,
        heading,
        closing,
    }
}

/// Tiled background definitions keyed by pattern name
///
/// Values sit inside a double-quoted `style` attribute, so they never contain
/// a raw `"`, `<` or `>`. `none` and keys outside this table render no
/// pattern.
pub fn pattern_css(pattern: &str) -> Option<&'static str> {
    match pattern {
        "dots" => Some(
            "background-image:radial-gradient(rgba(0,0,0,0.08) 2px,transparent 2px);background-size:20px 20px;",
        ),
        "stripes" => Some(
            "background-image:repeating-linear-gradient(45deg,rgba(0,0,0,0.05) 0,rgba(0,0,0,0.05) 10px,transparent 10px,transparent 20px);",
        ),
        "hearts" => Some(
            "background-image:url(&quot;data:image/svg+xml;utf8,%3Csvg xmlns='http://www.w3.org/2000/svg' width='40' height='40'%3E%3Cpath d='M20 30 L10 20 A5 5 0 0 1 20 12 A5 5 0 0 1 30 20 Z' fill='%23e91e63' fill-opacity='0.12'/%3E%3C/svg%3E&quot;);background-size:40px 40px;",
        ),
        "stars" => Some(
            "background-image:url(&quot;data:image/svg+xml;utf8,%3Csvg xmlns='http://www.w3.org/2000/svg' width='40' height='40'%3E%3Cpolygon points='20,6 24,16 35,16 26,23 29,34 20,27 11,34 14,23 5,16 16,16' fill='%23ffc107' fill-opacity='0.15'/%3E%3C/svg%3E&quot;);background-size:40px 40px;",
        ),
        "flowers" => Some(
            "background-image:url(&quot;data:image/svg+xml;utf8,%3Csvg xmlns='http://www.w3.org/2000/svg' width='48' height='48'%3E%3Cg fill='%234caf50' fill-opacity='0.12'%3E%3Ccircle cx='24' cy='16' r='6'/%3E%3Ccircle cx='32' cy='24' r='6'/%3E%3Ccircle cx='24' cy='32' r='6'/%3E%3Ccircle cx='16' cy='24' r='6'/%3E%3C/g%3E%3Ccircle cx='24' cy='24' r='4' fill='%23ff9800' fill-opacity='0.2'/%3E%3C/svg%3E&quot;);background-size:48px 48px;",
        ),
        _ => None,
    }
}

/// Escape text for inclusion in HTML content or attribute values
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escaped message with line breaks turned into `<br>`
fn message_html(message: &str) -> String {
    message
        .replace("\r\n", "\n")
        .split('\n')
        .map(escape_html)
        .collect::<Vec<_>>()
        .join("<br>\n")
}

/// Subject line: "{display name} from {sender}"
pub fn render_subject(card_type: &CardType, sender_name: &str) -> String {
    format!("{} from {}", card_type_info(card_type).display_name, sender_name.trim())
}

/// Render a card into subject, HTML and text
///
/// User-supplied text is always escaped. Presentation attributes are used
/// verbatim and must have passed validation.
pub fn render(card: &Card) -> RenderedCard {
    let info = card_type_info(&card.card_type);
    RenderedCard {
        subject: render_subject(&card.card_type, &card.sender_name),
        html: render_html(card, &info),
        text: render_text(card, &info),
    }
}

/// Render an unsaved card for preview
///
/// Validation is lenient and fail-fast; a missing type renders as a thank-you
/// card.
pub fn render_preview(input: CardInput) -> Result<RenderedCard> {
    ensure_valid_card(&input.draft(), ValidationMode::Lenient)?;
    let card = Card::from_input("preview".to_string(), input, Utc::now());
    Ok(render(&card))
}

fn render_html(card: &Card, info: &CardTypeInfo) -> String {
    let recipient = escape_html(card.recipient_name.trim());
    let sender = escape_html(card.sender_name.trim());
    let message = message_html(card.message.trim_end());
    let pattern = pattern_css(&card.pattern).unwrap_or("");

    let image = card
        .image_url
        .as_deref()
        .map(|url| {
            format!(
                "<p style=\"text-align:center;margin:0 0 20px\"><img src=\"{}\" alt=\"\" style=\"max-width:100%;border-radius:6px\"></p>\n",
                escape_html(url)
            )
        })
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<title>{heading}</title>
</head>
<body style=\"font-family:Arial,sans-serif;padding:20px;background:#f5f5f5\">
<div style=\"max-width:500px;margin:0 auto;background:#ffffff;padding:30px;border-radius:10px\">
<h1 style=\"color:#4a90e2;text-align:center\">{emoji} {heading}</h1>
<div style=\"background-color:{bg};{pattern}color:{fg};font-family:{font},sans-serif;font-size:{size};padding:25px;border:2px solid {border};border-radius:8px;margin:20px 0\">
{image}<p><strong>Dear {recipient},</strong></p>
<p style=\"margin:15px 0\">{message}</p>
<p style=\"text-align:right\"><em>{closing}<br>{sender}</em></p>
</div>
<p style=\"text-align:center;color:#666666;font-size:12px\">Sent via Thank You Cards Platform</p>
</div>
</body>
</html>
",
        heading = info.heading,
        emoji = info.emoji,
        bg = card.background_color,
        pattern = pattern,
        fg = card.text_color,
        font = card.font_family,
        size = card.font_size,
        border = card.border_color,
        image = image,
        recipient = recipient,
        message = message,
        closing = info.closing,
        sender = sender,
    )
}

fn render_text(card: &Card, info: &CardTypeInfo) -> String {
    format!(
        "{heading}\n\nDear {recipient},\n\n{message}\n\n{closing}\n{sender}\n",
        heading = info.heading,
        recipient = card.recipient_name.trim(),
        message = card.message.trim_end().replace("\r\n", "\n"),
        closing = info.closing,
        sender = card.sender_name.trim(),
    )
}
