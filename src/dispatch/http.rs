//! HTTP dispatcher backed by a shared [`reqwest::Client`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::model::DeliveredEvent;

use super::{Dispatch, DeliveryOutcome};

/// POSTs event envelopes as JSON to subscriber endpoints.
pub struct HttpDispatcher {
    client: reqwest::Client,
}

impl HttpDispatcher {
    /// Builds a dispatcher with a per-request timeout. Falls back to a
    /// default client if the builder rejects the configuration.
    pub fn new(request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    async fn dispatch(&self, url: &str, event: &DeliveredEvent) -> DeliveryOutcome {
        let resp = match self.client.post(url).json(event).send().await {
            Ok(resp) => resp,
            Err(e) => {
                return DeliveryOutcome::Unreachable {
                    detail: e.to_string(),
                }
            }
        };

        let status = resp.status().as_u16();
        debug!(url, status, event = %event.id, "webhook delivery attempted");
        if resp.status().is_success() {
            DeliveryOutcome::Accepted { status }
        } else {
            DeliveryOutcome::Rejected { status }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::model::{ChangeEvent, ChangeKind};

    use super::*;

    async fn serve_status(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            let resp = format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\n\r\n");
            sock.write_all(resp.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/hook")
    }

    fn envelope() -> DeliveredEvent {
        let ev = ChangeEvent::detected(
            ChangeKind::Added,
            "wh-1",
            "user-1",
            "item-1",
            Utc::now(),
        );
        DeliveredEvent::wrap(ev, Utc::now())
    }

    #[tokio::test]
    async fn success_status_is_accepted() {
        let url = serve_status("200 OK").await;
        let out = HttpDispatcher::new(Duration::from_secs(5))
            .dispatch(&url, &envelope())
            .await;
        assert_eq!(out, DeliveryOutcome::Accepted { status: 200 });
    }

    #[tokio::test]
    async fn error_status_is_rejected_not_err() {
        let url = serve_status("500 Internal Server Error").await;
        let out = HttpDispatcher::new(Duration::from_secs(5))
            .dispatch(&url, &envelope())
            .await;
        assert_eq!(out, DeliveryOutcome::Rejected { status: 500 });
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        // Bind then drop to obtain a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let out = HttpDispatcher::new(Duration::from_secs(1))
            .dispatch(&format!("http://{addr}/hook"), &envelope())
            .await;
        assert!(matches!(out, DeliveryOutcome::Unreachable { .. }));
    }
}
