use crate::types::{Digest, DigestError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Render the digest as a self-contained HTML document: one block per
/// category with the summary followed by links to the covered stories for
/// attribution.
pub fn render_html(digest: &Digest) -> String {
    let mut html = String::from("<html><body>");
    html.push_str(&format!(
        "<p>{} &ndash; {}</p>",
        digest.period_start.format("%Y-%m-%d"),
        digest.period_end.format("%Y-%m-%d"),
    ));
    for section in &digest.sections {
        html.push_str(&format!(
            "<p><b>{}</b></p><p>{}</p>",
            escape(&section.category),
            escape(&section.summary_text)
        ));
        if !section.top_clusters.is_empty() {
            html.push_str("<ul>");
            for cluster in &section.top_clusters {
                html.push_str(&format!(
                    "<li><a href=\"{}\">{}</a></li>",
                    escape(&cluster.canonical.url),
                    escape(&cluster.canonical.title)
                ));
            }
            html.push_str("</ul>");
        }
        html.push_str("<br>");
    }
    html.push_str("</body></html>");
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Delivery adapter over the Mailgun HTTP API.
pub struct MailgunDelivery {
    client: Client,
    domain: String,
    api_key: String,
    sender_name: String,
    sender_email: String,
    recipient_email: String,
}

impl MailgunDelivery {
    /// Read credentials from the environment. Missing variables are a
    /// configuration failure surfaced before any sending is attempted.
    pub fn from_env() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create HTTP client");
        Ok(Self {
            client,
            domain: env_var("MAILGUN_DOMAIN")?,
            api_key: env_var("MAILGUN_API_KEY")?,
            sender_name: env_var("SENDER_NAME")?,
            sender_email: env_var("SENDER_EMAIL")?,
            recipient_email: env_var("RECIPIENT_EMAIL")?,
        })
    }

    pub async fn deliver(&self, digest: &Digest) -> Result<()> {
        let html = render_html(digest);
        let subject = format!(
            "Weekly news digest ({} - {})",
            digest.period_start.format("%Y-%m-%d"),
            digest.period_end.format("%Y-%m-%d"),
        );
        let url = format!("https://api.mailgun.net/v3/{}/messages", self.domain);
        debug!(recipient = %self.recipient_email, "sending digest email");

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                (
                    "from",
                    format!("{} <{}>", self.sender_name, self.sender_email),
                ),
                ("to", self.recipient_email.clone()),
                ("subject", subject),
                ("html", html),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DigestError::Delivery(format!(
                "mailgun returned {}: {}",
                status, body
            )));
        }
        info!(recipient = %self.recipient_email, "digest email sent");
        Ok(())
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| DigestError::Config(format!("environment variable {} is not set", name)))
}
