pub mod client;
pub mod codec;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod pool;
pub mod transport;
pub mod value;

mod buffer;

pub use client::Client;
pub use commands::lcs::{LcsIdxMatch, LcsIdxResult};
pub use commands::{Arg, Command};
pub use config::ClientConfig;
pub use context::Context;
pub use error::{Error, ErrorReply};
pub use frame::Frame;
pub use pipeline::Pipeline;
pub use value::Value;

pub type Result<T> = std::result::Result<T, Error>;
