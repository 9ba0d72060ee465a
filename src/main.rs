use anyhow::Context;
use clap::Parser;
use minecraft_stat_proxy::{
    config::Args, hypixel::HypixelClient, listener::Listener, mojang::MojangClient,
    session::SessionContext,
};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().compact())
        .init();

    let args = Args::parse();
    args.validate()?;

    let hypixel = match args.hypixel_api_key.as_deref() {
        Some(key) if !key.is_empty() => {
            let client = Arc::new(HypixelClient::new(key.to_owned()));
            client
                .test_key()
                .await
                .context("Hypixel API key validation failed")?;
            Some(client)
        }
        _ => {
            tracing::warn!(
                "no Hypixel API key has been provided, Hypixel API features will be disabled"
            );
            None
        }
    };

    let context = SessionContext {
        forward_host: args.forward_host.clone(),
        forward_port: args.forward_port,
        access_token: args.access_token.clone(),
        uuid: args.uuid.clone(),
        mojang: Arc::new(MojangClient::new()),
        hypixel,
    };

    Listener::bind(&args, context).await?.run().await
}
