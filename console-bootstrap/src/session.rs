use crate::transport::Transport;
use crate::types::{BootstrapError, Method, Result, Session};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

fn session_cookie_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(SessionID=[^;]+)").expect("valid session cookie pattern")
    })
}

/// Picks the first `SessionID=...` pair out of the console's `Set-Cookie` values.
pub fn session_from_set_cookies<S: AsRef<str>>(cookies: &[S]) -> Result<Session> {
    if cookies.is_empty() {
        return Err(BootstrapError::Authentication(
            "console sent no Set-Cookie header".to_string(),
        ));
    }

    cookies
        .iter()
        .find_map(|cookie| {
            session_cookie_pattern()
                .captures(cookie.as_ref())
                .map(|caps| Session::new(&caps[1]))
        })
        .ok_or_else(|| {
            BootstrapError::Authentication(format!(
                "no SessionID among {} Set-Cookie header(s)",
                cookies.len()
            ))
        })
}

/// Opens a console session and logs in with it.
///
/// Login success is judged by the transport's status check alone; the
/// console's answer to the credentials POST is not inspected.
pub async fn login(transport: &Transport, username: &str, password: &str) -> Result<Session> {
    let response = transport.send(Method::Get, &[], None).await?;
    let session = session_from_set_cookies(&response.set_cookies())?;
    debug!("Got session cookie {}", session.redacted());

    let credentials = vec![
        ("username".to_string(), username.to_string()),
        ("password".to_string(), password.to_string()),
        ("login".to_string(), "Login".to_string()),
    ];
    transport
        .send(Method::Post, &credentials, Some(&session))
        .await?;

    info!("Logged in as {}", username);
    Ok(session)
}
