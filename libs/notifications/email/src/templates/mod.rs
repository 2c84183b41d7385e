//! Email rendering with Handlebars.
//!
//! Every notification uses the same branded card: a header bar with the
//! subject, an intro paragraph, an optional table of details, a closing
//! paragraph and a static footer bar. Only the copy differs per event, so
//! the engine takes a [`NotificationContent`] and produces both bodies.
//!
//! The HTML body goes through Handlebars' default escaping, which covers
//! `& < > " ' \` =`, so payload fields can never inject markup.

use crate::error::NotificationResult;
use handlebars::Handlebars;
use serde::Serialize;
use std::fmt::Write;

/// Text of the static bar at the bottom of every HTML email.
pub const FOOTER_BAR: &str = "This is an automated message, please do not reply.";

const CARD_TEMPLATE: &str = "notification_card";

/// Ordered label/value pairs shown in the email body.
///
/// Rows keep insertion order. Blank values are kept here but never rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailSet {
    entries: Vec<(String, String)>,
}

impl DetailSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row.
    pub fn with(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(label, value);
        self
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.entries.push((label.into(), value.into()));
    }

    /// Rows with a non-blank value, trimmed, in insertion order.
    pub fn visible(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(label, value)| (label.as_str(), value.trim()))
            .filter(|(_, value)| !value.is_empty())
    }
}

/// The copy of a single notification, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub subject: String,
    pub intro: String,
    pub details: DetailSet,
    pub footer: String,
}

/// A fully rendered email, ready for a sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub plain_text_body: String,
    pub html_body: String,
}

#[derive(Serialize)]
struct CardRow<'a> {
    label: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct CardContext<'a> {
    subject: &'a str,
    intro: &'a str,
    rows: Vec<CardRow<'a>>,
    footer: &'a str,
    footer_bar: &'a str,
}

/// Renders [`NotificationContent`] into plain text and HTML.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Register the card template.
    pub fn new() -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_template_string(CARD_TEMPLATE, include_str!("card.html.hbs"))?;

        Ok(Self { handlebars })
    }

    /// Render both bodies. Output depends only on `content`.
    pub fn render(&self, content: &NotificationContent) -> NotificationResult<RenderedEmail> {
        Ok(RenderedEmail {
            subject: content.subject.clone(),
            plain_text_body: render_plain_text(content),
            html_body: self.render_html(content)?,
        })
    }

    fn render_html(&self, content: &NotificationContent) -> NotificationResult<String> {
        let context = CardContext {
            subject: &content.subject,
            intro: &content.intro,
            rows: content
                .details
                .visible()
                .map(|(label, value)| CardRow { label, value })
                .collect(),
            footer: &content.footer,
            footer_bar: FOOTER_BAR,
        };

        Ok(self.handlebars.render(CARD_TEMPLATE, &context)?)
    }
}

/// Intro, blank line, one `Label: Value` line per visible row, blank line, footer.
fn render_plain_text(content: &NotificationContent) -> String {
    let mut text = String::new();
    text.push_str(&content.intro);
    text.push_str("\n\n");

    for (label, value) in content.details.visible() {
        let _ = writeln!(text, "{label}: {value}");
    }

    text.push('\n');
    text.push_str(&content.footer);
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_content(details: DetailSet) -> NotificationContent {
        NotificationContent {
            subject: "Listing created: Loft".to_string(),
            intro: "Your listing has been created successfully.".to_string(),
            details,
            footer: "We will let you know as soon as applicants show interest.".to_string(),
        }
    }

    #[test]
    fn test_detail_set_keeps_order_and_hides_blank_values() {
        let details = DetailSet::new()
            .with("Title", "Loft")
            .with("Location", "   ")
            .with("Price", " 1200 ");

        let visible: Vec<_> = details.visible().collect();
        assert_eq!(visible, vec![("Title", "Loft"), ("Price", "1200")]);
    }

    #[test]
    fn test_plain_text_layout() {
        let engine = TemplateEngine::new().unwrap();
        let details = DetailSet::new()
            .with("Title", "Loft")
            .with("Location", "")
            .with("Price", "1200");

        let rendered = engine.render(&listing_content(details)).unwrap();

        assert_eq!(
            rendered.plain_text_body,
            "Your listing has been created successfully.\n\
             \n\
             Title: Loft\n\
             Price: 1200\n\
             \n\
             We will let you know as soon as applicants show interest."
        );
        assert!(!rendered.plain_text_body.contains("Location"));
    }

    #[test]
    fn test_html_card_structure() {
        let engine = TemplateEngine::new().unwrap();
        let details = DetailSet::new().with("Title", "Loft").with("Location", "");

        let html = engine.render(&listing_content(details)).unwrap().html_body;

        assert!(html.contains(">Listing created: Loft</td>"));
        assert!(html.contains("<p style=\"margin:0 0 16px;font-size:16px;line-height:24px;\">Your listing has been created successfully.</p>"));
        assert!(html.contains(">Title</td>"));
        assert!(html.contains(">Loft</td>"));
        assert!(!html.contains(">Location</td>"));
        assert!(html.contains(FOOTER_BAR));
    }

    #[test]
    fn test_html_omits_table_without_visible_rows() {
        let engine = TemplateEngine::new().unwrap();
        let details = DetailSet::new().with("Listing", " ");

        let html = engine.render(&listing_content(details)).unwrap().html_body;

        assert!(!html.contains("border-collapse"));
        assert!(!html.contains(">Listing</td>"));
    }

    #[test]
    fn test_html_escapes_every_dynamic_field() {
        let engine = TemplateEngine::new().unwrap();
        let content = NotificationContent {
            subject: "Listing created: <b>Loft</b>".to_string(),
            intro: "Tom & Jerry".to_string(),
            details: DetailSet::new().with("Title", "<script>alert(\"x\")</script>"),
            footer: "\"quoted\"".to_string(),
        };

        let html = engine.render(&content).unwrap().html_body;

        assert!(html.contains("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"));
        assert!(html.contains("Listing created: &lt;b&gt;Loft&lt;/b&gt;"));
        assert!(html.contains("Tom &amp; Jerry"));
        assert!(html.contains("&quot;quoted&quot;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let engine = TemplateEngine::new().unwrap();
        let content = listing_content(DetailSet::new().with("Title", "Loft"));

        assert_eq!(engine.render(&content).unwrap(), engine.render(&content).unwrap());
    }

    #[test]
    fn test_plain_text_is_not_escaped() {
        let engine = TemplateEngine::new().unwrap();
        let content = listing_content(DetailSet::new().with("Title", "Tom & Jerry's <Loft>"));

        let rendered = engine.render(&content).unwrap();
        assert!(rendered.plain_text_body.contains("Title: Tom & Jerry's <Loft>"));
    }
}
