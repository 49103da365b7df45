use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "echo-sidecar",
    author,
    version,
    about = "Echo service and client for the sidecar RPC transport",
    after_help = "Examples:\n  echo-sidecar serve --socket @echo\n  echo-sidecar call get --address unix:@echo --message hello\n  echo-sidecar call expand --address localhost:8080 --message \"1 2 3\"\n  echo-sidecar call update -n 100"
)]
pub struct Cli {
    /// Debug logging; `call` also prints response trailers to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the echo service on a TCP port or a local socket
    Serve(ServeArgs),

    /// Call one method of an echo server
    Call(CallArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// TCP port; 0 serves on the local socket instead
    #[arg(short, long, default_value_t = 0)]
    pub port: u16,

    /// Local socket: `@name` (abstract namespace) or a filesystem path
    #[arg(short, long, default_value = "@echo")]
    pub socket: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Procedure {
    /// Unary
    Get,
    /// Server streaming: one response per space-separated word
    Expand,
    /// Client streaming: three requests, one joined response
    Collect,
    /// Bidi streaming: six requests, each echoed back
    Update,
}

impl Procedure {
    #[must_use]
    pub fn default_message(self) -> &'static str {
        match self {
            Self::Expand => "1 2 3",
            Self::Get | Self::Collect | Self::Update => "hello",
        }
    }
}

#[derive(Debug, Args)]
pub struct CallArgs {
    #[arg(value_enum)]
    pub procedure: Procedure,

    /// Server address: HOST:PORT (port 443 uses TLS) or unix:@NAME / unix:PATH
    #[arg(short, long, env = "ECHO_SIDECAR_ADDRESS", default_value = "unix:@echo")]
    pub address: String,

    /// Request text (defaults to "1 2 3" for expand, "hello" otherwise)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Number of times to call the method
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub number: u32,

    /// Extra request header (repeatable, "Key: Value")
    #[arg(long = "header", short = 'H', value_name = "KEY: VALUE")]
    pub headers: Vec<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,
}

impl CallArgs {
    #[must_use]
    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or_else(|| self.procedure.default_message())
    }
}
