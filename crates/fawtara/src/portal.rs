use std::time::Duration;

use futures::future;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderValue, REFERER, SET_COOKIE};

use crate::parser::{self, ParseError};
use crate::payload::{bill_payload, billing_key};
use crate::types::{BillRecord, BillingItem, Session};

/// Bill requests put in flight at once. Batches run back to back, so
/// this is also the cap on concurrent portal connections.
pub const BATCH_SIZE: usize = 10;

/// Message attached to bills the portal asked us to resubmit.
pub const BILL_FAILURE_MSG: &str = "حصل خطأ عند تحصيل هذه الفاتورة";

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("Login rejected: {0}")]
    Auth(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Device lookup returned no number")]
    EmptyDevice,
    #[error("Network timeout: {0}")]
    Timeout(#[source] reqwest::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            PortalError::Timeout(err)
        } else {
            PortalError::Http(err)
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortalClient {
    client: Client,
    base_url: String,
}

impl PortalClient {
    pub fn new() -> Result<Self, PortalError> {
        Self::with_base_url(crate::BASE_URL)
    }

    /// Client against a custom portal root, used by tests with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, PortalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Runs the two-step login handshake and the device lookup, returning
    /// the cookie set and device number every later call depends on.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, PortalError> {
        let landing = self
            .client
            .get(format!("{}/index.php", self.base_url))
            .send()
            .await?;

        // The landing page issues the session cookie the login POST must
        // carry back, alongside the form token and captcha id.
        let entry_cookie = landing
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(cookie_pair)
            .unwrap_or_default();

        let landing_html = landing.error_for_status()?.text().await?;
        log::trace!("Landing page:\n{}", landing_html);

        let form = parser::parse_login_form(&landing_html)?;
        log::debug!("Submitting login for {} (captcha {})", username, form.captcha_id);

        let login_res = self
            .client
            .post(format!("{}/ws/checkLogin.php", self.base_url))
            .header(COOKIE, &entry_cookie)
            .form(&[
                ("username", username),
                ("password", password),
                ("app", "1"),
                ("captcha", form.captcha_id.as_str()),
                ("token", form.token.as_str()),
            ])
            .send()
            .await?;

        let cookies = flatten_cookies(login_res.headers().get_all(SET_COOKIE).iter());
        let body = login_res.error_for_status()?.text().await?;

        if let Some(message) = parser::parse_login_rejection(&body) {
            log::warn!("Portal rejected login for {}: {}", username, message);
            return Err(PortalError::Auth(message));
        }

        let device_html = self
            .client
            .get(format!("{}/sep.php", self.base_url))
            .header(COOKIE, &cookies)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let device_no = parser::parse_device_no(&device_html).ok_or(PortalError::EmptyDevice)?;
        log::info!("Authenticated {} against device {}", username, device_no);

        Ok(Session { cookies, device_no })
    }

    /// Fetches one bill per item, in batches of [`BATCH_SIZE`]. Results
    /// come back in input order; an outage banner anywhere aborts the
    /// whole run and discards everything collected so far.
    pub async fn fetch_bills(
        &self,
        session: &Session,
        items: &[BillingItem],
        city: &str,
    ) -> Result<Vec<BillRecord>, PortalError> {
        let mut records = Vec::with_capacity(items.len());

        for batch in items.chunks(BATCH_SIZE) {
            let pages = future::join_all(batch.iter().map(|item| {
                let payload = bill_payload(&session.device_no, &billing_key(city, item));
                self.fetch_bill_page(session, payload)
            }))
            .await;

            for (page, item) in pages.into_iter().zip(batch) {
                let page = page?;

                if let Some(banner) = parser::find_outage_banner(&page) {
                    log::warn!("Portal outage, aborting after {} bills: {}", records.len(), banner);
                    return Err(PortalError::Unavailable(banner));
                }

                records.push(bill_record(&page, item));
            }

            log::debug!("Fetched batch of {} ({} total)", batch.len(), records.len());
        }

        Ok(records)
    }

    async fn fetch_bill_page(
        &self,
        session: &Session,
        payload: String,
    ) -> Result<String, PortalError> {
        let res = self
            .client
            .post(format!("{}/ws/sep.php", self.base_url))
            .header(COOKIE, &session.cookies)
            .header(ACCEPT, "text/html, */*; q=0.01")
            .header(REFERER, format!("{}/sep.php", self.base_url))
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&[("myData", payload.as_str())])
            .send()
            .await?;

        // Anything that is not an HTML page is useless to the extractor;
        // it parses as a bill with no fields.
        let is_html = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("html"));

        if !res.status().is_success() || !is_html {
            log::warn!(
                "Bill response discarded (status {}, html: {})",
                res.status(),
                is_html
            );
            return Ok(String::new());
        }

        Ok(res.text().await?)
    }
}

fn bill_record(page: &str, item: &BillingItem) -> BillRecord {
    if parser::is_resubmit_banner(page) {
        log::warn!("Portal asked to resubmit bill {}", item.billing_no);
        return BillRecord::failed(BILL_FAILURE_MSG, item);
    }
    BillRecord::from_detail(parser::parse_bill_detail(page), item)
}

fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn flatten_cookies<'a>(values: impl Iterator<Item = &'a HeaderValue>) -> String {
    values
        .filter_map(|v| v.to_str().ok())
        .map(cookie_pair)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}
