use std::sync::Arc;

use crate::common::label::Labels;
use crate::common::option::ClientOpts;
use crate::common::time_series::{TimeSeries, WriteBatch};
use crate::common::utils::get_current_timestamp;
use crate::compression::Compressor;
use crate::credential::CredentialSource;
use crate::load_generator::MetricSink;
use crate::query::{QueryClient, QueryResult, RangeSpec};
use crate::remote_write::{RemoteWriteSender, WriteEncoder};
use crate::signer::SigV4Signer;
use crate::transport::{build_url, SignedTransport};
use crate::Result;

pub const REMOTE_WRITE_PATH: &str = "api/v1/remote_write";

///
/// AmpClient writes samples to and queries one managed prometheus workspace.
/// Every call is a single blocking, signed round trip; nothing is retried.
pub struct AmpClient {
    transport: SignedTransport,
    encoder: WriteEncoder,
    sender: RemoteWriteSender,
    query: QueryClient,
}

impl AmpClient {
    pub fn new(opts: &ClientOpts, credentials: Arc<dyn CredentialSource>) -> Result<AmpClient> {
        let base = opts.base_url()?;
        let compressor = Compressor::Snappy;
        let signer = SigV4Signer::new(opts.region(), opts.service_name());
        Ok(AmpClient {
            transport: SignedTransport::new(credentials, signer, opts.request_timeout())?,
            encoder: WriteEncoder::new(compressor),
            sender: RemoteWriteSender::new(build_url(&base, REMOTE_WRITE_PATH, &[])?, compressor),
            query: QueryClient::new(&base),
        })
    }

    /// Write one sample of `name` stamped with the current wall clock.
    pub fn write_metric(&self, name: &str, value: f64, labels: &Labels) -> Result<()> {
        let batch = vec![TimeSeries::single(name, labels, get_current_timestamp(), value)];
        self.write_batch(&batch)
    }

    pub fn write_batch(&self, batch: &WriteBatch) -> Result<()> {
        let body = self.encoder.encode(batch)?;
        self.sender.send(&self.transport, body)
    }

    pub fn query(&self, expression: &str) -> Result<QueryResult> {
        self.query.query(&self.transport, expression, None)
    }

    pub fn query_range(&self, expression: &str, range: &RangeSpec) -> Result<QueryResult> {
        self.query.query(&self.transport, expression, Some(range))
    }

    pub fn list_metric_names(&self) -> Result<Vec<String>> {
        self.query.list_metric_names(&self.transport)
    }
}

impl MetricSink for AmpClient {
    fn write_metric(&self, name: &str, value: f64, labels: &Labels) -> Result<()> {
        AmpClient::write_metric(self, name, value, labels)
    }
}
