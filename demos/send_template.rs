use std::io;
use std::time::Duration;

use kannon::{KannonClient, KannonConfig, SendOptions, Sender};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let get = |name: &str| {
        std::env::var(name).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{name} environment variable is required"),
            )
        })
    };
    let domain = get("KANNON_DOMAIN")?;
    let api_key = get("KANNON_API_KEY")?;
    let endpoint = get("KANNON_ENDPOINT")?;
    let template_id = get("KANNON_TEMPLATE_ID")?;
    let to = get("KANNON_TO")?;

    let client = KannonClient::builder(
        domain.clone(),
        api_key,
        Sender::new(format!("noreply@{domain}"), "Kannon demo"),
        KannonConfig::endpoint(endpoint),
    )
    .timeout(Duration::from_secs(10))
    .build()?;

    let result = client
        .send_template([to], "Template demo", template_id, SendOptions::default())
        .await?;
    println!("message_id: {}", result.message_id);

    Ok(())
}
