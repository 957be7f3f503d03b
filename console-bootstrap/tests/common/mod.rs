// Fake admin console shared by the integration tests
#![allow(dead_code)]

use console_bootstrap::BootstrapConfig;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION_COOKIE: &str = "SessionID=abc123";
pub const CONSOLE_PATH: &str = "/index.html";

/// Body the console should receive for [`form_page`] with nothing skipped.
pub const EXPECTED_SUBMISSION: &str = "game_name=My+Game&admin_password=s3cret&game_password=\
&savegame=latest.sav&server_port=34197&max_player=8&mp_language=en&auto_save_interval=10\
&stats_interval=5&pause_game_if_empty=1&start_server=Start";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn config_for(server: &MockServer) -> BootstrapConfig {
    let address = server.address();
    BootstrapConfig {
        host: address.ip().to_string(),
        port: address.port(),
        username: "admin".to_string(),
        password: "secret".to_string(),
        retry_interval_seconds: 1,
        timeout_seconds: 5,
    }
}

/// Start page as the console renders it, optionally without one field.
pub fn form_page(skip: Option<&str>) -> String {
    let inputs = [
        ("game_name", "text", "My Game"),
        ("admin_password", "password", "s3cret"),
        ("game_password", "password", ""),
        ("server_port", "number", "34197"),
        ("max_player", "number", "8"),
        ("auto_save_interval", "number", "10"),
        ("stats_interval", "number", "5"),
    ];

    let mut html = String::from(
        "<!DOCTYPE html>\n<html><head><title>Server</title></head><body>\n<form method=\"post\">\n",
    );
    for (name, kind, value) in inputs {
        if Some(name) == skip {
            continue;
        }
        html.push_str(&format!(
            "<input type=\"{}\" name=\"{}\" value=\"{}\">\n",
            kind, name, value
        ));
    }
    if skip != Some("savegame") {
        html.push_str(
            "<select name=\"savegame\">\n<option value=\"old.sav\">old</option>\n\
             <option value=\"latest.sav\" selected=\"selected\">latest</option>\n</select>\n",
        );
    }
    if skip != Some("mp_language") {
        html.push_str(
            "<select name=\"mp_language\">\n<option value=\"de\">Deutsch</option>\n\
             <option value=\"en\" selected=\"selected\">English</option>\n</select>\n",
        );
    }
    if skip != Some("pause_game_if_empty") {
        html.push_str(
            "<select name=\"pause_game_if_empty\">\n<option value=\"0\">no</option>\n\
             <option value=\"1\" selected=\"selected\">yes</option>\n</select>\n",
        );
    }
    html.push_str("<input type=\"text\" name=\"motd\" value=\"welcome\">\n");
    html.push_str("<input type=\"submit\" name=\"start_server\" value=\"Start\">\n");
    html.push_str("</form></body></html>\n");
    html
}

/// Login page: hands out the session cookie.
pub async fn mount_login_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(CONSOLE_PATH))
        .and(query_param("lang", "en"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "SessionID=abc123; Path=/; HttpOnly")
                .set_body_string("<html><form><input name=\"username\"></form></html>"),
        )
        .with_priority(5)
        .mount(server)
        .await;
}

/// Credentials POST bound to the session.
pub async fn mount_login_post(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(CONSOLE_PATH))
        .and(header("cookie", SESSION_COOKIE))
        .and(body_string_contains("login=Login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Authenticated start page.
pub async fn mount_form_page(server: &MockServer, html: String) {
    mount_slow_form_page(server, html, Duration::ZERO).await;
}

/// Authenticated start page that takes `delay` to answer.
pub async fn mount_slow_form_page(server: &MockServer, html: String, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(CONSOLE_PATH))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_string(html).set_delay(delay))
        .with_priority(1)
        .mount(server)
        .await;
}

/// The start submission. Answers with a redirect like the real console.
pub async fn mount_start_post(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(CONSOLE_PATH))
        .and(header("cookie", SESSION_COOKIE))
        .and(body_string_contains("start_server=Start"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/index.html?lang=en"),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_console(server: &MockServer, form_html: String, expected_starts: u64) {
    mount_login_page(server).await;
    mount_login_post(server).await;
    mount_form_page(server, form_html).await;
    mount_start_post(server, expected_starts).await;
}
