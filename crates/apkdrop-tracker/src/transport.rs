use apkdrop_core::event::TrackPayload;

/// Delivery seam between the emitter and the wire.
///
/// Implementations must tolerate being fired and forgotten: the emitter never
/// inspects the result beyond logging it at debug level.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn deliver(&self, payload: TrackPayload) -> anyhow::Result<()>;
}

/// JSON-over-HTTP transport posting to the server's track endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// `base_url` is the server origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/track", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, payload: TrackPayload) -> anyhow::Result<()> {
        self.client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_built_from_base_url() {
        let t = HttpTransport::new("http://localhost:3000/");
        assert_eq!(t.endpoint, "http://localhost:3000/api/track");
    }
}
