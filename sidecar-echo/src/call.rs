use std::io::Write as _;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use sidecar::metadata::metadata_to_pairs;
use sidecar::{Client, ClientOptions, Metadata, Request};
use sidecar_echo::{COLLECT, EXPAND, EchoRequest, EchoResponse, GET, UPDATE};
use tracing::debug;

use crate::cli::{CallArgs, Procedure};
use crate::command_error::CommandError;

const COLLECT_MESSAGES: usize = 3;
const UPDATE_MESSAGES: usize = 6;

pub async fn call(args: CallArgs, verbose: bool) -> Result<(), CommandError> {
    let client = Client::new(ClientOptions {
        address: args.address.clone(),
        insecure: args.insecure,
        headers: args.headers.clone(),
        ..ClientOptions::default()
    })?;
    debug!(url = client.base_url(), kind = %client.transport_kind(), "calling");

    let text = args.message();
    let mut elapsed = Duration::ZERO;
    for _ in 0..args.number {
        let started = Instant::now();
        let trailer = match args.procedure {
            Procedure::Get => get(&client, text).await?,
            Procedure::Expand => expand(&client, text).await?,
            Procedure::Collect => collect(&client, text).await?,
            Procedure::Update => update(&client, text).await?,
        };
        elapsed += started.elapsed();

        if verbose {
            print_trailer(&trailer);
        }
    }

    if args.number > 1 {
        eprintln!("{:?}", elapsed / args.number);
    }
    Ok(())
}

async fn get(client: &Client, text: &str) -> Result<Metadata, CommandError> {
    let res = client
        .unary::<EchoRequest, EchoResponse>(GET, Request::new(EchoRequest::new(text)))
        .await?;
    print_response(&res.message)?;
    Ok(res.trailer)
}

async fn expand(client: &Client, text: &str) -> Result<Metadata, CommandError> {
    let mut call = client
        .server_streaming::<EchoRequest, EchoResponse>(EXPAND, Request::new(EchoRequest::new(text)))
        .await?;
    while let Some(res) = call.receive().await? {
        print_response(&res)?;
    }
    call.close_response().await?;
    Ok(call.trailer().cloned().unwrap_or_default())
}

async fn collect(client: &Client, text: &str) -> Result<Metadata, CommandError> {
    let mut call = client.client_streaming::<EchoRequest, EchoResponse>(COLLECT)?;
    let request = EchoRequest::new(text);
    for _ in 0..COLLECT_MESSAGES {
        call.send(&request).await?;
    }
    let res = call.close_and_receive().await?;
    print_response(&res)?;
    Ok(call.trailer().cloned().unwrap_or_default())
}

async fn update(client: &Client, text: &str) -> Result<Metadata, CommandError> {
    let call = client.bidi_streaming::<EchoRequest, EchoResponse>(UPDATE)?;
    let (mut tx, mut rx) = call.split();

    let request = EchoRequest::new(text);
    let sender = tokio::spawn(async move {
        for _ in 0..UPDATE_MESSAGES {
            tx.send(&request).await?;
        }
        tx.close();
        Ok::<_, sidecar::Error>(())
    });

    while let Some(res) = rx.receive().await? {
        print_response(&res)?;
    }
    rx.close_response().await?;
    sender
        .await
        .context("request stream task failed")
        .map_err(CommandError::RuntimeError)??;

    Ok(rx.trailer().cloned().unwrap_or_default())
}

fn print_response(res: &EchoResponse) -> Result<(), CommandError> {
    let line = serde_json::to_string(res)
        .context("failed to render response")
        .map_err(CommandError::RuntimeError)?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{line}")
        .context("failed to write response")
        .map_err(CommandError::RuntimeError)
}

fn print_trailer(trailer: &Metadata) {
    eprintln!("Response Trailers:");
    for (key, value) in metadata_to_pairs(trailer) {
        eprintln!("  {key}: {value}");
    }
}
