//! Contact-form relay.
//!
//! A form post is turned into one HTML mail per recipient and one lead for
//! the CRM. The browser always gets `1` back once both have been attempted;
//! delivery problems only show up in the log. An empty post gets a bare 404.

use std::sync::{Arc, LazyLock};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use axum_extra::extract::CookieJar;
use regex::Regex;

use super::crm::{CrmClient, CrmLead, UtmParams};
use super::mailer::{MailMessage, Mailer};
use super::RelayError;
use crate::config::SiteConfig;

/// Recognized form keys and their labels, in label lookup order.
pub const FIELD_LABELS: [(&str, &str); 4] = [
    ("form_name", "Название формы"),
    ("phone", "Телефон"),
    ("name", "Имя"),
    ("message", "Сообщение"),
];

const TABLE_OPEN: &str =
    r#"<table border="1" cellpadding="5" cellspacing="0" style="border-collapse: collapse;">"#;

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("relay pattern {pattern:?} is invalid: {err}"),
    }
}

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?is)<script\b[^>]*>.*?(</script\s*>|$)"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?is)<style\b[^>]*>.*?(</style\s*>|$)"));
static TAG: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)<!--.*?-->|<[A-Za-z/!?][^>]*>?"));

/// Remove markup from a submitted value.
///
/// `<script>` and `<style>` elements go with their content; any other tag
/// is dropped and its text kept. A `<` not followed by a letter, `/`, `!`
/// or `?` is text.
pub fn strip_tags(value: &str) -> String {
    let value = SCRIPT_BLOCK.replace_all(value, "");
    let value = STYLE_BLOCK.replace_all(&value, "");
    TAG.replace_all(&value, "").into_owned()
}

/// Escape `& < > " '` for HTML text and attributes.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

/// The recognized fields of one form post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// `(label, stripped value)` in submission order
    pub fields: Vec<(&'static str, String)>,
    /// The `phone` value as submitted, if any
    pub phone: Option<String>,
}

impl Submission {
    /// Pick the recognized keys out of decoded form pairs.
    ///
    /// A repeated key keeps its first position and its last value.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut keys: Vec<&'static str> = Vec::new();
        let mut submission = Submission::default();

        for (key, value) in pairs {
            let Some(&(name, label)) = FIELD_LABELS.iter().find(|(k, _)| *k == key.as_str())
            else {
                continue;
            };
            if name == "phone" {
                submission.phone = Some(value.clone());
            }
            let stripped = strip_tags(value);
            match keys.iter().position(|k| *k == name) {
                Some(i) => submission.fields[i].1 = stripped,
                None => {
                    keys.push(name);
                    submission.fields.push((label, stripped));
                }
            }
        }
        submission
    }

    /// Table rows for the HTML mail.
    pub fn table_rows(&self) -> String {
        self.fields
            .iter()
            .map(|(label, value)| {
                format!("<tr><td>{}:</td><td>{}</td></tr>", escape_html(label), escape_html(value))
            })
            .collect()
    }

    /// Plain-text summary, one `Label: value` line per field.
    pub fn comment(&self) -> String {
        self.fields.iter().map(|(label, value)| format!("{}: {}\r\n", label, value)).collect()
    }

    /// The complete HTML mail body.
    pub fn html_body(&self, landing: &str) -> String {
        format!(
            "<html><body><h4>Новая заявка с сайта {}</h4>{}{}</table></body></html>",
            landing,
            TABLE_OPEN,
            self.table_rows()
        )
    }
}

/// Relay settings resolved from `[relay]` and `[site]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    /// Endpoint path
    pub path: String,
    /// Mail recipients
    pub recipients: Vec<String>,
    /// Sender and Reply-To address
    pub from: String,
    /// Landing name
    pub landing: String,
    /// CRM source id
    pub source_id: u32,
}

impl RelaySettings {
    /// Settings from a site configuration.
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            path: config.relay.path.clone(),
            recipients: config.relay.recipients.clone(),
            from: config.relay.from.clone(),
            landing: config.landing().to_string(),
            source_id: config.relay.source_id,
        }
    }

    /// Mail subject line.
    pub fn subject(&self) -> String {
        format!("{} - новая заявка", self.landing)
    }
}

/// Shared state of the relay handler.
#[derive(Clone)]
pub struct RelayState {
    settings: Arc<RelaySettings>,
    mailer: Arc<dyn Mailer>,
    crm: Option<CrmClient>,
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("settings", &self.settings)
            .field("crm", &self.crm.as_ref().map(CrmClient::endpoint))
            .finish_non_exhaustive()
    }
}

impl RelayState {
    /// State with an explicit mailer and optional CRM client.
    pub fn new(settings: RelaySettings, mailer: Arc<dyn Mailer>, crm: Option<CrmClient>) -> Self {
        Self { settings: Arc::new(settings), mailer, crm }
    }

    /// State for a site configuration, delivering through `mailer`.
    pub fn from_config(config: &SiteConfig, mailer: Arc<dyn Mailer>) -> Result<Self, RelayError> {
        let crm = match &config.relay.crm_endpoint {
            Some(endpoint) => Some(CrmClient::new(endpoint, config.relay.accept_invalid_certs)?),
            None => None,
        };
        Ok(Self::new(RelaySettings::from_config(config), mailer, crm))
    }

    /// Relay settings.
    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Send the mail to every recipient, logging failures.
    pub async fn send_mail(&self, submission: &Submission) {
        let html = submission.html_body(&self.settings.landing);
        let subject = self.settings.subject();

        for recipient in &self.settings.recipients {
            let message = MailMessage {
                to: recipient.clone(),
                from: self.settings.from.clone(),
                subject: subject.clone(),
                html: html.clone(),
            };
            let mailer = Arc::clone(&self.mailer);
            let result = tokio::task::spawn_blocking(move || mailer.send(&message))
                .await
                .map_err(|e| RelayError::Join(e.to_string()))
                .and_then(|sent| sent);
            match result {
                Ok(()) => tracing::info!(to = %recipient, "mail sent"),
                Err(e) => tracing::error!(to = %recipient, error = %e, "mail not sent"),
            }
        }
    }

    /// Forward the lead to the CRM, logging failures.
    pub async fn forward_lead(&self, submission: &Submission, utm: UtmParams) {
        let Some(crm) = &self.crm else {
            tracing::debug!("no CRM endpoint configured");
            return;
        };
        let lead = CrmLead {
            landing: self.settings.landing.clone(),
            source_id: self.settings.source_id,
            phone: submission.phone.clone().unwrap_or_default(),
            utm,
            comment: submission.comment(),
        };
        if let Err(e) = crm.submit(&lead).await {
            tracing::error!(endpoint = crm.endpoint(), error = %e, "lead not forwarded");
        }
    }
}

/// Router serving the relay endpoint at its configured path.
pub fn relay_router(state: RelayState) -> Router {
    let path = state.settings.path.clone();
    Router::new().route(&path, post(submit)).with_state(state)
}

async fn submit(State(state): State<RelayState>, jar: CookieJar, body: Bytes) -> Response {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&body).unwrap_or_default();
    if pairs.is_empty() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let submission = Submission::from_pairs(&pairs);
    state.send_mail(&submission).await;
    state.forward_lead(&submission, UtmParams::from_cookies(&jar)).await;
    "1".into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>Bold</b> text"), "Bold text");
        assert_eq!(strip_tags("Hi<script>alert(1)</script>!"), "Hi!");
        assert_eq!(strip_tags("a<style>p{}</style>b"), "ab");
        assert_eq!(strip_tags("x<SCRIPT type=x>evil()"), "x");
        assert_eq!(strip_tags("a<!-- c -->b"), "ab");
        assert_eq!(strip_tags("5 > 3"), "5 > 3");
    }

    #[test]
    fn test_strip_tags_keeps_bare_angle_brackets() {
        assert_eq!(strip_tags("бюджет < 5000 руб, звоните"), "бюджет < 5000 руб, звоните");
        assert_eq!(strip_tags("a<5 and b>3"), "a<5 and b>3");
        assert_eq!(strip_tags("x <= y, <i>z</i>"), "x <= y, z");
        assert_eq!(strip_tags("trailing <"), "trailing <");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"Tom & "Jerry" <'x'>"#), "Tom &amp; &quot;Jerry&quot; &lt;&#039;x&#039;&gt;");
    }

    #[test]
    fn test_submission_keeps_recognized_keys_in_order() {
        let submission = Submission::from_pairs(&pairs(&[
            ("utm", "x"),
            ("phone", "+7 (900) 000-00-00"),
            ("form_name", "Обратный звонок"),
            ("agree", "on"),
        ]));

        assert_eq!(
            submission.fields,
            vec![("Телефон", "+7 (900) 000-00-00".to_string()), ("Название формы", "Обратный звонок".to_string())]
        );
        assert_eq!(submission.phone.as_deref(), Some("+7 (900) 000-00-00"));
    }

    #[test]
    fn test_repeated_key_last_value_wins() {
        let submission = Submission::from_pairs(&pairs(&[("name", "A"), ("phone", "1"), ("name", "B")]));
        assert_eq!(submission.fields[0], ("Имя", "B".to_string()));
        assert_eq!(submission.fields.len(), 2);
    }

    #[test]
    fn test_html_body_and_comment() {
        let submission = Submission::from_pairs(&pairs(&[
            ("name", "<b>Ann</b> & co"),
            ("message", "hi<script>steal()</script>"),
        ]));

        assert_eq!(
            submission.html_body("example.com"),
            "<html><body><h4>Новая заявка с сайта example.com</h4>\
             <table border=\"1\" cellpadding=\"5\" cellspacing=\"0\" style=\"border-collapse: collapse;\">\
             <tr><td>Имя:</td><td>Ann &amp; co</td></tr>\
             <tr><td>Сообщение:</td><td>hi</td></tr>\
             </table></body></html>"
        );
        assert_eq!(submission.comment(), "Имя: Ann & co\r\nСообщение: hi\r\n");
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = SiteConfig::default();
        config.site.domain = "shop.test".into();
        config.relay.recipients = vec!["a@shop.test".into()];
        let settings = RelaySettings::from_config(&config);
        assert_eq!(settings.landing, "shop.test");
        assert_eq!(settings.subject(), "shop.test - новая заявка");
        assert_eq!(settings.path, "/mail.php");
    }
}
