use std::future::Future;

use anyhow::Result;

use crate::model::note::NoteRecord;

/// Destination for completed notes. A failed delivery leaves the batch with
/// the caller; the sink must not retain a partially accepted batch.
pub trait NoteSink: Send + 'static {
    fn deliver(&self, batch: &[NoteRecord]) -> impl Future<Output = Result<()>> + Send;
}

/// POSTs each batch as a JSON array. Any non-2xx status or transport error is
/// a failed transmission.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

impl NoteSink for HttpSink {
    fn deliver(&self, batch: &[NoteRecord]) -> impl Future<Output = Result<()>> + Send {
        let request = self.client.post(&self.url).json(batch);
        async move {
            request.send().await?.error_for_status()?;
            Ok(())
        }
    }
}
