//! HTTP surfaces: the live-reload dev server and the contact-form relay.

pub mod crm;
pub mod dev;
pub mod mailer;
pub mod relay;

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

pub use crm::{CrmClient, CrmLead, UtmParams};
pub use dev::{dev_router, DevServer};
pub use mailer::{MailMessage, Mailer, RecordingMailer, SendmailMailer};
pub use relay::{relay_router, RelaySettings, RelayState, Submission};

/// Error starting or running a server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `host:port` did not parse
    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),
    /// The socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The server stopped with an error
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
    /// The relay could not be set up
    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Error raised while relaying a submission.
///
/// These are logged by the relay, never returned to the browser.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A configured address is not a valid mailbox
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    /// The message could not be assembled
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    /// The local mail facility rejected the message
    #[error("sendmail failed: {0}")]
    Sendmail(#[from] lettre::transport::sendmail::Error),
    /// The CRM request failed
    #[error("CRM request failed: {0}")]
    Crm(#[from] reqwest::Error),
    /// A blocking send task panicked or was cancelled
    #[error("mail task failed: {0}")]
    Join(String),
}

/// Parse `host:port` into a socket address.
pub fn listen_addr(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    let text = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    };
    text.parse().map_err(|_| ServerError::InvalidAddress(text))
}

/// Bind a listener on `addr`.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr).await.map_err(|source| ServerError::Bind { addr, source })
}

/// Serve `router` on `listener` until the process is stopped.
pub async fn serve(listener: TcpListener, router: axum::Router) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("listening on http://{}", addr);
    }
    axum::serve(listener, router).await.map_err(ServerError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_addr() {
        assert_eq!(listen_addr("127.0.0.1", 3000).unwrap().port(), 3000);
        assert!(listen_addr("::1", 80).unwrap().is_ipv6());
        assert!(matches!(listen_addr("localhost", 80), Err(ServerError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = bind(listen_addr("127.0.0.1", 0).unwrap()).await.expect("should bind");
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
