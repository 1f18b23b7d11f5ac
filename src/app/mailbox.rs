// LogHarvest - app/mailbox.rs
//
// Decodes raw RFC 822 messages into core `Message` values.
//
// Only the parts the pipeline reads are kept: the `Date` header, every
// `Received` header in order, the HTML body and whether the message was
// multipart.

use crate::core::model::Message;
use crate::util::error::MessageError;
use crate::util::logging;
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

const HTML_MIME_TYPE: &str = "text/html";

/// Decode one raw message.
///
/// Body selection:
///   - multipart: the first `text/html` part (depth-first) that is not an
///     attachment.
///   - single part: the body, only if the message itself is `text/html`.
///
/// A message without an HTML body is not an error; `html_body` is `None`.
pub fn decode_message(id: &str, raw: &[u8]) -> Result<Message, MessageError> {
    let mail = mailparse::parse_mail(raw).map_err(|e| MessageError::Mime {
        id: id.to_string(),
        source: e,
    })?;

    let multipart = mail.ctype.mimetype.starts_with("multipart/");
    let html_part = if multipart {
        find_html_part(&mail)
    } else if is_html(&mail) {
        Some(&mail)
    } else {
        None
    };

    let html_body = match html_part {
        Some(part) => Some(part.get_body().map_err(|e| MessageError::Body {
            id: id.to_string(),
            source: e,
        })?),
        None => None,
    };

    let message = Message {
        id: id.to_string(),
        html_body,
        date: mail.headers.get_first_value("Date"),
        received: mail.headers.get_all_values("Received"),
        multipart,
    };

    match &message.html_body {
        Some(body) => tracing::debug!(
            message = %id,
            multipart,
            received = message.received.len(),
            body = %logging::preview(body),
            "Message decoded"
        ),
        None => tracing::debug!(message = %id, multipart, "Message has no HTML body"),
    }

    Ok(message)
}

/// Depth-first search for the first inline HTML part.
fn find_html_part<'a, 'b>(part: &'a ParsedMail<'b>) -> Option<&'a ParsedMail<'b>> {
    if is_html(part) && !is_attachment(part) {
        return Some(part);
    }
    part.subparts.iter().find_map(find_html_part)
}

fn is_html(part: &ParsedMail<'_>) -> bool {
    part.ctype.mimetype.eq_ignore_ascii_case(HTML_MIME_TYPE)
}

fn is_attachment(part: &ParsedMail<'_>) -> bool {
    part.get_content_disposition().disposition == DispositionType::Attachment
}
