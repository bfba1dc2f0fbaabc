//! Session header shown before a demo link.

use std::time::Duration;

use jamilink_core::Config;

fn describe_timeout(timeout: Option<Duration>) -> String {
    match timeout {
        Some(timeout) => format!("{}s", timeout.as_secs()),
        None => "none".to_string(),
    }
}

/// Summary of the account being linked and the phase limits in force.
pub fn session_header(name: &str, password_protected: bool, config: &Config) -> String {
    let archive = if password_protected {
        "password protected"
    } else {
        "unprotected"
    };
    format!(
        "\x1b[1;36mJamilink\x1b[0m  linking \x1b[1m{}\x1b[0m\n  archive   {}\n  timeouts  connect {}, authenticate {}\n",
        name,
        archive,
        describe_timeout(config.connecting_timeout),
        describe_timeout(config.authenticating_timeout)
    )
}

pub fn print_session_header(name: &str, password_protected: bool, config: &Config) {
    println!("\n{}", session_header(name, password_protected, config));
}
