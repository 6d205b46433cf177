//! Offline commands: schema, decode, config.

use std::fmt::Write as _;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use mmbridge::{BridgeConfig, Envelope, MessageKind};
use mmbridge_proto::{codec, read_frame, schema_for};
use serde_json::json;

use crate::OutputFormat;

/// The schema table as JSON: one `{msgType, fields}` entry per kind.
pub fn schema_json() -> serde_json::Value {
    let kinds = MessageKind::ALL
        .iter()
        .map(|&kind| {
            let fields: serde_json::Map<_, _> = schema_for(kind)
                .fields()
                .iter()
                .map(|f| (f.name.to_owned(), json!(f.ty.name())))
                .collect();
            json!({ "msgType": kind.tag(), "fields": fields })
        })
        .collect();
    serde_json::Value::Array(kinds)
}

pub fn schema(format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&schema_json())?);
        return Ok(());
    }
    println!("{:<16} FIELDS", "KIND");
    for &kind in &MessageKind::ALL {
        let fields: Vec<_> = schema_for(kind)
            .fields()
            .iter()
            .map(|f| format!("{}: {}", f.name, f.ty))
            .collect();
        let label = if fields.is_empty() {
            "-".to_owned()
        } else {
            fields.join(", ")
        };
        println!("{:<16} {label}", kind.tag());
    }
    Ok(())
}

/// Formats an envelope for printing.
pub fn render(env: &Envelope, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        let doc = serde_json::Value::Object(codec::encode(env));
        return Ok(serde_json::to_string_pretty(&doc)?);
    }
    let mut out = env.kind().tag().to_owned();
    for (name, value) in env.fields() {
        write!(out, "\n  {name:<10} {}", value.to_json())?;
    }
    Ok(out)
}

pub fn decode(path: Option<&Path>, framed: bool, format: OutputFormat) -> Result<()> {
    let bytes = read_input(path)?;
    let payloads = if framed {
        split_frames(&bytes)?
    } else {
        vec![bytes]
    };
    for (i, payload) in payloads.iter().enumerate() {
        let env = codec::from_slice(payload).with_context(|| format!("message {}", i + 1))?;
        println!("{}", render(&env, format)?);
    }
    Ok(())
}

/// Reads `path`, or stdin for `None` and `-`.
fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(p) if p != Path::new("-") => {
            std::fs::read(p).with_context(|| format!("failed to read {}", p.display()))
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Splits a buffer of length-prefixed frames; a trailing partial frame is
/// an error.
fn split_frames(mut bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        let frame = read_frame(&mut bytes)
            .with_context(|| format!("frame {} is truncated or oversized", frames.len() + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

pub fn config_show(config: &BridgeConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

pub fn config_path(explicit: Option<&Path>) -> Result<()> {
    println!("{}", target_path(explicit)?.display());
    Ok(())
}

pub fn config_init(config: &BridgeConfig, explicit: Option<&Path>, force: bool) -> Result<()> {
    let path = target_path(explicit)?;
    write_config(config, &path, force)?;
    println!("{}", path.display());
    Ok(())
}

fn target_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_owned()),
        None => BridgeConfig::default_path().context("no platform config directory"),
    }
}

fn write_config(config: &BridgeConfig, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config.save(path)?;
    Ok(())
}
