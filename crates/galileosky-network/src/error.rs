use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to bind listener to {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("socket error with {addr}: {source}")]
    Socket {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

pub type NetworkResult<T> = Result<T, NetworkError>;
