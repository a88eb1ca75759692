
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

use crate::chat::{ChatMessage, Role};

const PAGE_TITLE: &str = "API Asistent";
const SAFE_LINK_SCHEMES: [&str; 3] = ["http", "https", "mailto"];
const BLOCKED_LINK_TARGET: &str = "#";
const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f6f7f9; color: #1d1f23; }
main { max-width: 860px; margin: 0 auto; padding: 24px; }
header h1 { margin-bottom: 4px; }
.subtitle { color: #555; margin-top: 0; }
.message { padding: 12px 16px; border-radius: 10px; margin: 12px 0; background: #fff; box-shadow: 0 1px 2px rgba(0,0,0,.08); }
.message.user { background: #e8f0fe; }
.message .role { font-size: 0.8em; color: #666; margin-bottom: 4px; }
.error { color: #b00020; }
form.chat { display: flex; gap: 8px; margin-top: 16px; }
form.chat input[type=text] { flex: 1; padding: 10px; }
pre { background: #f0f0f0; padding: 8px; overflow-x: auto; }
.sidebar { display: flex; justify-content: space-between; align-items: center; color: #2e7d32; }
"#;

/// Escape text for safe inclusion in HTML element content and attribute values
#[inline]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Relative links pass; absolute ones only with an allowed scheme.
/// Browsers ignore whitespace and control characters inside a scheme, so those are dropped first.
fn is_safe_destination(url: &str) -> bool {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();

    match cleaned.find([':', '/', '?', '#']) {
        Some(end) if cleaned[end..].starts_with(':') => {
            let scheme = cleaned[..end].to_ascii_lowercase();
            SAFE_LINK_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}

fn neutralize_destination(tag: Tag<'_>) -> Tag<'_> {
    match tag {
        Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        } if !is_safe_destination(&dest_url) => Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed(BLOCKED_LINK_TARGET),
            title,
            id,
        },
        Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        } if !is_safe_destination(&dest_url) => Tag::Image {
            link_type,
            dest_url: CowStr::Borrowed(BLOCKED_LINK_TARGET),
            title,
            id,
        },
        other => other,
    }
}

/// Render chat markdown to HTML. Raw HTML in the input is shown as text and
/// link targets with a scheme other than http, https or mailto are replaced.
#[inline]
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(tag) => Event::Start(neutralize_destination(tag)),
        other => other,
    });

    let mut output = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut output, parser);
    output
}

#[inline]
pub fn login_page(error: Option<&str>) -> String {
    let error_html = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape_html(e)))
        .unwrap_or_default();

    layout(&format!(
        r#"<header><h1>🔑 Prístup k aplikácii</h1></header>
<form method="post" action="/login">
  <label for="password">Zadajte prístupové heslo:</label>
  <input type="password" id="password" name="password" autofocus>
  <button type="submit">Prihlásiť</button>
</form>
{error_html}"#
    ))
}

#[inline]
pub fn chat_page(transcript: &[ChatMessage]) -> String {
    let messages: String = transcript.iter().map(render_message).collect();

    layout(&format!(
        r#"<div class="sidebar">
  <span>✅ Prístup povolený.</span>
  <form method="post" action="/reset"><button type="submit">Vymazať históriu chatu</button></form>
</div>
<header>
  <h1>🤖 Váš Interný API Asistent</h1>
  <p class="subtitle">Opýtajte sa ma čokoľvek o našej API. Odpoviem na základe <strong>API dokumentácie</strong>.</p>
</header>
<hr>
<section id="messages">
{messages}</section>
<form class="chat" method="post" action="/chat">
  <input type="text" name="message" placeholder="Vaša otázka k API..." autocomplete="off" autofocus>
  <button type="submit">Odoslať</button>
</form>"#
    ))
}

fn render_message(message: &ChatMessage) -> String {
    let (class, label) = match message.role {
        Role::User => ("user", "Vy"),
        Role::Assistant => ("assistant", "Asistent"),
        Role::System => ("system", "Systém"),
    };

    format!(
        "<div class=\"message {class}\"><div class=\"role\">{label}</div>{}</div>\n",
        render_markdown(&message.content)
    )
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="sk">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{PAGE_TITLE}</title>
<style>{STYLE}</style>
</head>
<body>
<main>
{body}
</main>
</body>
</html>
"#
    )
}
