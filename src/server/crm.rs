//! Lead forwarding to the CRM's external-form endpoint.

use axum_extra::extract::CookieJar;
use serde::Serialize;

use super::RelayError;

/// Prefix of the cookies holding the visitor's UTM tags.
pub const UTM_COOKIE_PREFIX: &str = "_uc_";

/// UTM tags of the visitor. Missing tags are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UtmParams {
    #[serde(rename = "UTM_CAMPAIGN")]
    pub campaign: String,
    #[serde(rename = "UTM_CONTENT")]
    pub content: String,
    #[serde(rename = "UTM_MEDIUM")]
    pub medium: String,
    #[serde(rename = "UTM_SOURCE")]
    pub source: String,
    #[serde(rename = "UTM_TERM")]
    pub term: String,
}

impl UtmParams {
    /// Read the tags with `lookup`, which maps a cookie name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let tag = |name: &str| lookup(&format!("{}utm_{}", UTM_COOKIE_PREFIX, name)).unwrap_or_default();
        Self {
            campaign: tag("campaign"),
            content: tag("content"),
            medium: tag("medium"),
            source: tag("source"),
            term: tag("term"),
        }
    }

    /// Read the tags from request cookies.
    pub fn from_cookies(jar: &CookieJar) -> Self {
        Self::from_lookup(|name| jar.get(name).map(|c| c.value().to_string()))
    }

    /// The `params_json` field: compact JSON, slashes and non-ASCII unescaped.
    pub fn to_params_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One lead as the CRM receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmLead {
    pub landing: String,
    pub source_id: u32,
    pub phone: String,
    pub utm: UtmParams,
    pub comment: String,
}

impl CrmLead {
    /// Urlencoded form fields, in the order the endpoint documents them.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("landing", self.landing.clone()),
            ("sourceId", self.source_id.to_string()),
            ("phone", self.phone.clone()),
            ("params_json", self.utm.to_params_json()),
            ("comment", self.comment.clone()),
        ]
    }
}

/// HTTP client for the CRM endpoint.
///
/// Requests have no timeout and are not retried; a slow CRM delays the
/// relay's response.
#[derive(Debug, Clone)]
pub struct CrmClient {
    client: reqwest::Client,
    endpoint: String,
}

impl CrmClient {
    /// Client for `endpoint`. Certificate checks stay on unless
    /// `accept_invalid_certs` is set.
    pub fn new(endpoint: &str, accept_invalid_certs: bool) -> Result<Self, RelayError> {
        if accept_invalid_certs {
            tracing::warn!(endpoint, "TLS certificate verification disabled for CRM requests");
        }
        let client =
            reqwest::Client::builder().danger_accept_invalid_certs(accept_invalid_certs).build()?;
        Ok(Self { client, endpoint: endpoint.to_string() })
    }

    /// The endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the lead as an urlencoded form.
    pub async fn submit(&self, lead: &CrmLead) -> Result<(), RelayError> {
        let response = self.client.post(&self.endpoint).form(&lead.form_fields()).send().await?;
        let status = response.status();
        response.error_for_status()?;
        tracing::debug!(%status, "lead forwarded");
        Ok(())
    }
}
