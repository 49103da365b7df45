use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use sidecar_echo::EchoTestServer;

const EXE: &str = env!("CARGO_BIN_EXE_echo-sidecar");

const EXPECTED_GET: &str = "{\"text\":\"Rust echo get: hello\"}\n";
const EXPECTED_COLLECT: &str = "{\"text\":\"Rust echo collect: hello hello hello\"}\n";
const EXPECTED_EXPAND: &str = "{\"text\":\"Rust echo expand: 1\"}\n\
{\"text\":\"Rust echo expand: 2\"}\n\
{\"text\":\"Rust echo expand: 3\"}\n";

fn status_code(out: &Output) -> i32 {
    out.status.code().unwrap_or(-1)
}

fn expected_update() -> String {
    "{\"text\":\"Rust echo update: hello\"}\n".repeat(6)
}

async fn run(args: Vec<String>) -> anyhow::Result<Output> {
    tokio::task::spawn_blocking(move || Command::new(EXE).args(&args).output())
        .await
        .context("spawn_blocking join")?
        .context("run echo-sidecar binary")
}

async fn check_all_procedures(address: &str) -> anyhow::Result<()> {
    let cases = [
        ("get", EXPECTED_GET.to_string()),
        ("collect", EXPECTED_COLLECT.to_string()),
        ("expand", EXPECTED_EXPAND.to_string()),
        ("update", expected_update()),
    ];

    for (procedure, expected) in cases {
        let out = run(vec![
            "call".into(),
            procedure.into(),
            "--address".into(),
            address.into(),
        ])
        .await?;

        anyhow::ensure!(
            status_code(&out) == 0,
            "{procedure}: exit code {}\nstderr:\n{}",
            status_code(&out),
            String::from_utf8_lossy(&out.stderr)
        );
        anyhow::ensure!(
            String::from_utf8_lossy(&out.stdout) == expected,
            "{procedure}: expected {expected:?}, got {:?}",
            String::from_utf8_lossy(&out.stdout)
        );
    }
    Ok(())
}

#[tokio::test]
async fn calls_over_tcp() -> anyhow::Result<()> {
    let server = EchoTestServer::start_tcp().await.context("start echo server")?;
    check_all_procedures(&server.target()).await?;
    server.shutdown().await;
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn calls_over_abstract_socket() -> anyhow::Result<()> {
    let socket = format!("@echo-sidecar-cli-{}", std::process::id());
    let server = EchoTestServer::start_unix(&socket).await.context("start echo server")?;
    check_all_procedures(&server.target()).await?;
    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn repeated_calls_report_mean_latency() -> anyhow::Result<()> {
    let server = EchoTestServer::start_tcp().await.context("start echo server")?;
    let out = run(vec![
        "call".into(),
        "get".into(),
        "--address".into(),
        server.target(),
        "-n".into(),
        "3".into(),
    ])
    .await?;

    anyhow::ensure!(status_code(&out) == 0, "exit code {}", status_code(&out));
    anyhow::ensure!(String::from_utf8_lossy(&out.stdout) == EXPECTED_GET.repeat(3));
    anyhow::ensure!(!out.stderr.is_empty(), "expected a latency line on stderr");
    Ok(())
}

#[tokio::test]
async fn verbose_prints_trailers_to_stderr() -> anyhow::Result<()> {
    let server = EchoTestServer::start_tcp().await.context("start echo server")?;
    let out = run(vec![
        "call".into(),
        "get".into(),
        "--address".into(),
        server.target(),
        "--verbose".into(),
    ])
    .await?;

    anyhow::ensure!(status_code(&out) == 0, "exit code {}", status_code(&out));
    anyhow::ensure!(String::from_utf8_lossy(&out.stdout) == EXPECTED_GET);
    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(stderr.contains("grpc-status: 0"), "stderr:\n{stderr}");
    Ok(())
}

#[tokio::test]
async fn unreachable_server_exits_40() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let address = format!("unix:{}", dir.path().join("absent.sock").display());
    let out = run(vec!["call".into(), "get".into(), "--address".into(), address]).await?;

    anyhow::ensure!(
        status_code(&out) == 40,
        "expected exit code 40, got {}\nstderr:\n{}",
        status_code(&out),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let out = Command::new(EXE)
        .args(["call", "get", "--number", "zero"])
        .output()
        .context("run echo-sidecar binary")?;

    anyhow::ensure!(
        status_code(&out) == 30,
        "expected exit code 30, got {}",
        status_code(&out)
    );
    Ok(())
}

#[test]
fn empty_address_exits_30() -> anyhow::Result<()> {
    let out = Command::new(EXE)
        .args(["call", "get", "--address", ""])
        .output()
        .context("run echo-sidecar binary")?;

    anyhow::ensure!(
        status_code(&out) == 30,
        "expected exit code 30, got {}",
        status_code(&out)
    );
    Ok(())
}

#[test]
fn serve_command_answers_calls() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let socket = dir.path().join("echo.sock");

    let mut child = Command::new(EXE)
        .args(["serve", "--socket"])
        .arg(&socket)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("spawn echo-sidecar serve")?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while !socket.exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    let out = Command::new(EXE)
        .args(["call", "get", "--address"])
        .arg(format!("unix:{}", socket.display()))
        .output()
        .context("run echo-sidecar call");

    let _ = child.kill();
    let _ = child.wait();

    let out = out?;
    anyhow::ensure!(
        String::from_utf8_lossy(&out.stdout) == EXPECTED_GET,
        "stdout: {:?}\nstderr:\n{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}
