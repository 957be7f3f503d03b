use crate::types::{
    BootstrapConfig, BootstrapError, Method, RequestSpec, Result, Session, LITERAL_SPACE_MARKER,
    REDACTED_FIELDS,
};
use reqwest::header::SET_COOKIE;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Every request goes to the console's single page.
const CONSOLE_PATH: &str = "/index.html?lang=en";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:134.0) Gecko/20100101 Firefox/134.0";

/// Sends browser-looking requests to the admin console.
///
/// The console answers differently to requests that do not look like a
/// top-level Firefox navigation, so every call carries the same header
/// profile. Redirects are not followed and no connection is reused.
pub struct Transport {
    client: Client,
    origin: String,
    target: Url,
}

impl Transport {
    pub fn new(config: &BootstrapConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .http1_only()
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .zstd(true)
            .build()?;

        let origin = format!("http://{}", config.authority());
        let target = Url::parse(&format!("{}{}", origin, CONSOLE_PATH))?;

        Ok(Self {
            client,
            origin,
            target,
        })
    }

    /// Builds the request without sending it.
    pub fn build_request(
        &self,
        method: Method,
        fields: &[(String, String)],
        session: Option<&Session>,
    ) -> RequestSpec {
        let mut headers = browser_headers(&self.origin, self.target.as_str());
        if let Some(session) = session {
            headers.push(("Cookie".to_string(), session.as_str().to_string()));
        }

        let encoded = encode_form(fields);
        let mut url = self.target.clone();

        let body = match method {
            Method::Get => {
                if !fields.is_empty() {
                    let query = format!("{}&{}", url.query().unwrap_or_default(), encoded);
                    url.set_query(Some(&query));
                }
                None
            }
            Method::Post => {
                headers.push(("Content-Length".to_string(), encoded.len().to_string()));
                Some(encoded)
            }
        };

        RequestSpec {
            method,
            url,
            headers,
            body,
        }
    }

    /// Sends one request and checks that the status is in `[200, 400)`.
    pub async fn send(
        &self,
        method: Method,
        fields: &[(String, String)],
        session: Option<&Session>,
    ) -> Result<ConsoleResponse> {
        let spec = self.build_request(method, fields, session);
        trace_request(&spec);

        let mut request = self.client.request(spec.method.into(), spec.url.clone());
        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &spec.body {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        info!("Response: {} for {} {}", status, spec.method, spec.url);

        check_status(status, &spec.url)?;
        Ok(ConsoleResponse { inner: response })
    }
}

/// Response whose status already passed the range check.
#[derive(Debug)]
pub struct ConsoleResponse {
    inner: Response,
}

impl ConsoleResponse {
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// All `Set-Cookie` header values in the order the console sent them.
    pub fn set_cookies(&self) -> Vec<String> {
        self.inner
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .collect()
    }

    /// Reads the body. Nothing is read until this is called.
    pub async fn text(self) -> Result<String> {
        let body = self.inner.text().await?;
        Ok(body)
    }
}

pub fn check_status(status: u16, url: &Url) -> Result<()> {
    if (200..400).contains(&status) {
        Ok(())
    } else {
        Err(BootstrapError::UnexpectedStatus {
            status,
            url: url.to_string(),
        })
    }
}

fn browser_headers(origin: &str, target: &str) -> Vec<(String, String)> {
    [
        ("Content-Type", "application/x-www-form-urlencoded"),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
        ("Accept-Encoding", "gzip, deflate, br, zstd"),
        ("Accept-Language", "de,en-US;q=0.7,en;q=0.3"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "same-origin"),
        ("Sec-Fetch-User", "?1"),
        ("Priority", "u=0, i"),
        ("Upgrade-Insecure-Requests", "1"),
        ("User-Agent", USER_AGENT),
        ("Referer", target),
        ("Origin", origin),
        ("Connection", "close"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

/// Joins `name=value` pairs with `&`, percent-encoding every value.
pub fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, encode_value(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encodes one value. Values carrying [`LITERAL_SPACE_MARKER`] lose
/// the marker and get `+` instead of `%20` for spaces.
pub fn encode_value(raw: &str) -> String {
    match raw.strip_prefix(LITERAL_SPACE_MARKER) {
        Some(rest) => urlencoding::encode(rest).replace("%20", "+"),
        None => urlencoding::encode(raw).into_owned(),
    }
}

fn redact_body(body: &str) -> String {
    body.split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if REDACTED_FIELDS.contains(&name) => format!("{}=***", name),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn trace_request(spec: &RequestSpec) {
    debug!("Request: {} {}", spec.method, spec.url);
    for (name, value) in &spec.headers {
        if name.eq_ignore_ascii_case("cookie") {
            debug!("  {}: {}", name, Session::new(value.clone()).redacted());
        } else {
            debug!("  {}: {}", name, value);
        }
    }
    if let Some(body) = &spec.body {
        debug!("Body: {}", redact_body(body));
    }
}
