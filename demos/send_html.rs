use std::io;

use kannon::{Attachment, KannonClient, KannonConfig, Recipient, SendOptions, Sender};
use tracing_subscriber::EnvFilter;

fn required_env(name: &str) -> Result<String, io::Error> {
    std::env::var(name).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{name} environment variable is required"),
        )
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let domain = required_env("KANNON_DOMAIN")?;
    let api_key = required_env("KANNON_API_KEY")?;
    let endpoint = required_env("KANNON_ENDPOINT")?;
    let to = required_env("KANNON_TO")?;
    let from = std::env::var("KANNON_FROM").unwrap_or_else(|_| format!("noreply@{domain}"));

    let sender = Sender::new(from, "Kannon demo");
    let client = KannonClient::new(domain, api_key, sender, KannonConfig::endpoint(endpoint))?;

    let recipient = Recipient::with_fields(to, [("name".to_owned(), "there".to_owned())].into());
    let options = SendOptions::default()
        .global_field("product", "kannon")
        .attachment(Attachment::new("hello.txt", b"Hello from the kannon demo.".to_vec()));

    let result = client
        .send_html(
            vec![recipient],
            "Hello from kannon",
            "<p>Hi {{ name }}, this is {{ product }}.</p>",
            options,
        )
        .await?;
    println!(
        "message_id: {}, template_id: {}, scheduled_time: {}",
        result.message_id, result.template_id, result.scheduled_time
    );

    Ok(())
}
