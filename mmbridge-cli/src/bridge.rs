//! Networked commands: serve, send, classdef, ping.

use anyhow::{Context, Result};
use mmbridge::{BridgeConfig, ClassDef, Client, Command, Dispatcher, Envelope, Payload, Server};

use crate::OutputFormat;
use crate::inspect;

/// Runs the loopback server until interrupted.
pub async fn serve(config: &BridgeConfig) -> Result<()> {
    let server = Server::bind(config, loopback()?)
        .await
        .with_context(|| format!("failed to bind {}", config.addr()))?;
    println!("listening on {}", server.local_addr()?);
    tokio::select! {
        result = server.run() => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("interrupted, shutting down");
        }
    }
    Ok(())
}

/// Handlers for `mmbridge serve`: commands are echoed, class definition
/// requests get the schema table.
fn loopback() -> Result<Dispatcher<Envelope>> {
    let mut dispatcher = Dispatcher::new();
    dispatcher.on(|cmd: Command| cmd.into_envelope())?;
    let api = inspect::schema_json().to_string();
    dispatcher.on(move |_: ClassDef| ClassDef::new(api.clone()).into_envelope())?;
    Ok(dispatcher)
}

/// Opens a session, naming the address on failure.
async fn connect(config: &BridgeConfig) -> Result<Client> {
    Client::connect(config)
        .await
        .with_context(|| format!("cannot reach bridge at {}", config.addr()))
}

pub async fn send_command(config: &BridgeConfig, command: &str, format: OutputFormat) -> Result<()> {
    let reply = connect(config).await?.command(command).await?;
    println!("{}", inspect::render(&reply, format)?);
    Ok(())
}

pub async fn send_class_def(config: &BridgeConfig, api: &str, format: OutputFormat) -> Result<()> {
    let reply = connect(config).await?.class_def(api).await?;
    println!("{}", inspect::render(&reply, format)?);
    Ok(())
}

pub async fn ping(config: &BridgeConfig) -> Result<()> {
    let client = connect(config).await?;
    println!("{} {}", config.addr(), client.server_version());
    Ok(())
}
