use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("transport error: {0}")]
    Transport(io::Error),

    #[error("malformed packet: {len} bytes is shorter than an echo reply")]
    MalformedPacket { len: usize },

    #[error("cannot resolve {host}: {reason}")]
    UnresolvedHost { host: String, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("cannot install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
