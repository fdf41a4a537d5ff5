//! Send a transactional email using the SendGrid backend.
use msg_core::{EmailClient, EmailRequest};
use msg_sendgrid::SendGridClient;
use msgkit::prelude::*;

use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&LoggingConfig {
        level: "info".to_string(),
        format: "pretty".to_string(),
    });

    let username = arg_or_env("--username", "SENDGRID_USERNAME");
    let password = arg_or_env("--password", "SENDGRID_PASSWORD");
    let from = arg_or_env("--from", "EMAIL_FROM");
    let to = arg_or_env("--to", "EMAIL_TO");
    let subject = arg_or_env("--subject", "EMAIL_SUBJECT");
    let text = arg_or_env("--text", "EMAIL_TEXT");

    let client = SendGridClient::new(username, password)?;
    let res = client
        .send(EmailRequest {
            to: &to,
            from: &from,
            subject: &subject,
            text: Some(&text),
            html: None,
        })
        .await?;
    println!(
        "Sent via {} with id {}\nRaw: {}",
        res.provider,
        res.id,
        serde_json::to_string_pretty(&res.raw)?
    );
    Ok(())
}

fn arg_or_env(flag: &str, env_key: &str) -> String {
    let args: Vec<String> = std::env::args().collect();
    if let Some(idx) = args.iter().position(|a| a == flag) {
        if idx + 1 < args.len() {
            return args[idx + 1].clone();
        }
    }
    env::var(env_key)
        .unwrap_or_else(|_| panic!("missing {} (arg {} or env {})", flag, flag, env_key))
}
