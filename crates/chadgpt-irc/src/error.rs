/// Errors produced by the IRC client.
#[derive(Debug, thiserror::Error)]
pub enum IrcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("invalid server name for TLS: {0}")]
    InvalidServerName(String),

    #[error("malformed line: {0}")]
    Parse(String),

    #[error("line exceeds {max} bytes")]
    LineTooLong { max: usize },

    #[error("server closed the connection: {0}")]
    Closed(String),
}
