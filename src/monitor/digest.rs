//! The alert digest: plain and HTML bodies, wrapped in a MIME message.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use chrono::{DateTime, Utc};

use super::gmail::MailMatch;

const RULE_WIDTH: usize = 60;
const FOOTER: &str = "Sent by the presswatch mail monitor";

/// A composed digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub plain: String,
    /// HTML body.
    pub html: String,
}

/// Escape `&`, `<`, `>` and `"` for HTML text and attribute values.
///
/// ```
/// use presswatch::monitor::escape_html;
///
/// assert_eq!(escape_html(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Subject line for a digest of `count` messages.
pub fn digest_subject(count: usize) -> String {
    format!("[HPP Monitor] {} new HPP-related email(s) found", count)
}

/// Build the digest for `matches`, stamped with `now`.
pub fn build_digest(matches: &[MailMatch], now: DateTime<Utc>) -> Digest {
    let count = matches.len();
    let stamp = now.format("%Y-%m-%d %H:%M UTC").to_string();
    let rule = "=".repeat(RULE_WIDTH);

    let mut lines = vec![
        format!("HPP Monitor - Digest ({})", stamp),
        format!("Found {} new email(s) matching HPP keywords.\n", count),
        rule.clone(),
    ];
    for (i, m) in matches.iter().enumerate() {
        lines.push(format!("\n[{}] {}", i + 1, m.subject));
        lines.push(format!("    From   : {}", m.sender));
        lines.push(format!("    Date   : {}", m.date));
        lines.push(format!("    Snippet: {}", m.snippet));
    }
    lines.push(format!("\n{}", rule));
    lines.push(FOOTER.to_string());
    let plain = lines.join("\n");

    let cell = "padding:8px;border:1px solid #ddd";
    let mut rows = String::new();
    for (i, m) in matches.iter().enumerate() {
        let n = i + 1;
        let background = if n % 2 == 1 { "#f9f9f9" } else { "#ffffff" };
        rows.push_str(&format!(
            "\n        <tr style=\"background:{background}\">\
             \n          <td style=\"{cell};font-weight:bold\">{n}</td>\
             \n          <td style=\"{cell}\">{}</td>\
             \n          <td style=\"{cell}\">{}</td>\
             \n          <td style=\"{cell};white-space:nowrap\">{}</td>\
             \n          <td style=\"{cell};color:#555;font-size:0.9em\">{}</td>\
             \n        </tr>",
            escape_html(&m.subject),
            escape_html(&m.sender),
            escape_html(&m.date),
            escape_html(&m.snippet),
        ));
    }

    let html = format!(
        r##"<!DOCTYPE html>
<html>
<body style="font-family:Arial,sans-serif;margin:20px">
  <h2 style="color:#1a73e8">HPP Monitor - Email Digest</h2>
  <p><strong>{count} new email(s)</strong> matching HPP keywords - {stamp}</p>
  <table style="border-collapse:collapse;width:100%">
    <thead>
      <tr style="background:#1a73e8;color:#fff">
        <th style="{cell}">#</th>
        <th style="{cell}">Subject</th>
        <th style="{cell}">From</th>
        <th style="{cell}">Date</th>
        <th style="{cell}">Snippet</th>
      </tr>
    </thead>
    <tbody>{rows}</tbody>
  </table>
  <p style="font-size:0.8em;color:#aaa;margin-top:20px">{FOOTER}</p>
</body>
</html>"##
    );

    Digest {
        subject: digest_subject(count),
        plain,
        html,
    }
}

/// Encode a header value as an RFC 2047 word when it is not plain ASCII.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?utf-8?b?{}?=", STANDARD.encode(value))
    }
}

/// Base64 body wrapped at 76 columns.
fn wrap_base64(text: &str) -> String {
    let encoded = STANDARD.encode(text.as_bytes());
    encoded
        .as_bytes()
        .chunks(76)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Render the digest as a `multipart/alternative` RFC 2822 message.
pub fn build_mime(digest: &Digest, recipient: &str) -> String {
    let boundary = format!("=_presswatch_{}", uuid::Uuid::new_v4().simple());

    let mut msg = String::new();
    msg.push_str("MIME-Version: 1.0\r\n");
    msg.push_str(&format!("Subject: {}\r\n", encode_header(&digest.subject)));
    msg.push_str(&format!("To: {}\r\n", recipient));
    // The API replaces this with the authenticated address
    msg.push_str("From: me\r\n");
    msg.push_str(&format!(
        "Content-Type: multipart/alternative; boundary=\"{}\"\r\n\r\n",
        boundary
    ));

    for (subtype, body) in [("plain", &digest.plain), ("html", &digest.html)] {
        msg.push_str(&format!("--{}\r\n", boundary));
        msg.push_str(&format!("Content-Type: text/{}; charset=\"utf-8\"\r\n", subtype));
        msg.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        msg.push_str(&wrap_base64(body));
        msg.push_str("\r\n");
    }
    msg.push_str(&format!("--{}--\r\n", boundary));
    msg
}

/// Encode a MIME message for the send endpoint (URL-safe base64, padded).
pub fn encode_raw(mime: &str) -> String {
    URL_SAFE.encode(mime.as_bytes())
}
