#![forbid(unsafe_code)]

//! A small gRPC-compatible RPC transport over HTTP/2.
//!
//! Messages travel as length-prefixed frames; the outcome of every call is
//! reported in `grpc-status`/`grpc-message` trailers. Clients reach servers
//! over TLS, cleartext TCP (h2c) or a local socket, and all four call shapes
//! are supported: unary, server-streaming, client-streaming and bidi.

pub mod body;
pub mod client;
pub mod codec;
pub mod metadata;
pub mod server;
pub mod status;
pub mod transport;

mod code;
mod error;
mod message;
mod types;

pub use client::{
    BidiReceiver, BidiSender, BidiStreamingCall, Client, ClientStreamingCall, ServerStreamingCall,
};
pub use code::Code;
pub use error::{Error, ErrorKind, Result};
pub use message::{RawMessage, RpcMessage};
pub use metadata::Metadata;
pub use server::{
    BidiStream, ClientStream, HandlerResult, ListenAddr, Listener, Router, Server, ServerStream,
};
pub use status::Status;
pub use transport::{Target, TransportKind, UnixSocketAddr};
pub use types::{ClientOptions, DEFAULT_CONNECT_TIMEOUT, Request, Response};
