//! Server-rendered pages: the creation form and the page behind a share link.

use chrono::{DateTime, Utc};

use crate::protocol::Consumed;
use crate::time::format_remaining;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:60rem;margin:2rem auto;padding:0 1rem}\
pre{white-space:pre-wrap;word-break:break-word;background:#f4f4f5;padding:1rem;border-radius:.5rem}\
.meta{color:#52525b;display:flex;gap:1.5rem}\
textarea{width:100%;min-height:16rem;font-family:monospace}\
.limits{display:flex;gap:1.5rem;margin:1rem 0}\
.error{color:#b91c1c}";

/// Escapes text for embedding in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n\
         <header><h1>Pastelite</h1></header>\n<main>\n{}\n</main>\n</body>\n</html>\n",
        title, STYLE, body
    )
}

/// The creation form. `content` is put back into the textarea when the form is
/// shown again after a rejected submission.
pub fn index(content: &str, error: Option<&str>) -> String {
    let error = error
        .map(|message| format!("<p class=\"error\">{}</p>\n", escape_html(message)))
        .unwrap_or_default();

    layout(
        "New Paste",
        &format!(
            "{}<form method=\"post\" action=\"/\">\n\
             <textarea name=\"content\" required>{}</textarea>\n\
             <div class=\"limits\">\n\
             <label>Expires after (seconds) <input type=\"number\" name=\"ttl_seconds\" min=\"1\"></label>\n\
             <label>Max views <input type=\"number\" name=\"max_views\" min=\"1\"></label>\n\
             </div>\n<button type=\"submit\">Create paste</button>\n</form>",
            error,
            escape_html(content)
        ),
    )
}

pub fn created(url: &str) -> String {
    let url = escape_html(url);
    layout(
        "Paste Created",
        &format!(
            "<h2>Paste created</h2>\n<p>Share this link: <a class=\"share-url\" href=\"{0}\">{0}</a></p>\n\
             <p><a href=\"/\">Create another</a></p>",
            url
        ),
    )
}

pub fn paste(consumed: &Consumed, now: DateTime<Utc>) -> String {
    let mut meta = String::new();
    if let Some(remaining) = consumed.remaining_views() {
        meta.push_str(&format!(
            "<span class=\"views\">{} views left</span>",
            remaining
        ));
    }
    if let Some(expires_at) = consumed.expires_at {
        meta.push_str(&format!(
            "<span class=\"expiry\">Expires in {}</span>",
            format_remaining(expires_at, now)
        ));
    }

    layout(
        "Paste",
        &format!(
            "<div class=\"meta\">{}</div>\n<pre class=\"paste-content\">{}</pre>",
            meta,
            escape_html(&consumed.content)
        ),
    )
}

pub fn not_found() -> String {
    layout(
        "Paste Not Found",
        "<h2>Paste Not Found</h2>\n<p>This paste may have expired, reached its view limit, or never existed.</p>",
    )
}

pub fn internal_error() -> String {
    layout(
        "Error",
        "<h2>Something went wrong</h2>\n<p>Please try again later.</p>",
    )
}
