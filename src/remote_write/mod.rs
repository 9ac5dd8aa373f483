use reqwest::{Method, Url};

use crate::common::time_series::{TimeSeries, WriteBatch};
use crate::compression::Compressor;
use crate::proto::WriteRequest;
use crate::transport::SignedTransport;
use crate::{AmpErr, Result};

pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";
pub const REMOTE_WRITE_VERSION: &str = "0.1.0";

/// Turns a write batch into the compressed remote write body.
#[derive(Clone, Copy, Debug, Default)]
pub struct WriteEncoder {
    compressor: Compressor,
}

impl WriteEncoder {
    pub fn new(compressor: Compressor) -> WriteEncoder {
        WriteEncoder { compressor }
    }

    pub fn compressor(&self) -> Compressor {
        self.compressor
    }

    /// Serialized, uncompressed message. Same batch in, same bytes out.
    pub fn serialize(&self, batch: &WriteBatch) -> Result<Vec<u8>> {
        build_write_request(batch)?.write_to_bytes()
    }

    pub fn encode(&self, batch: &WriteBatch) -> Result<Vec<u8>> {
        let raw = self.serialize(batch)?;
        let compressed = self.compressor.compress(&raw)?;
        trace!("encoded {} series: {} bytes, {} compressed", batch.len(), raw.len(), compressed.len());
        Ok(compressed)
    }

    /// Inverse of `encode`, for backends and checks.
    pub fn decode(&self, body: &[u8]) -> Result<WriteBatch> {
        let raw = self.compressor.decompress(body)?;
        let request = WriteRequest::parse_from_bytes(&raw)?;
        Ok(request.timeseries.iter().map(TimeSeries::from).collect())
    }
}

fn build_write_request(batch: &WriteBatch) -> Result<WriteRequest> {
    if batch.is_empty() {
        return Err(AmpErr::EncodingErr("empty write batch".to_string()));
    }
    let mut timeseries = Vec::with_capacity(batch.len());
    for series in batch.iter() {
        series.validate()?;
        timeseries.push(crate::proto::TimeSeries::from(series));
    }
    Ok(WriteRequest { timeseries })
}

/// Posts encoded batches to the remote write endpoint. One attempt per call, no retry.
pub struct RemoteWriteSender {
    endpoint: Url,
    compressor: Compressor,
}

impl RemoteWriteSender {
    pub fn new(endpoint: Url, compressor: Compressor) -> RemoteWriteSender {
        RemoteWriteSender { endpoint, compressor }
    }

    /// Only HTTP 200 counts as accepted; anything else comes back as `WriteErr` with status and body.
    pub fn send(&self, transport: &SignedTransport, compressed: Vec<u8>) -> Result<()> {
        let headers = vec![
            ("Content-Encoding".to_string(), self.compressor.content_encoding().to_string()),
            ("Content-Type".to_string(), PROTOBUF_CONTENT_TYPE.to_string()),
            ("X-Prometheus-Remote-Write-Version".to_string(), REMOTE_WRITE_VERSION.to_string()),
        ];
        let response = transport.execute(Method::POST, self.endpoint.clone(), headers, compressed)?;
        if response.status == 200 {
            Ok(())
        } else {
            Err(AmpErr::WriteErr { status: response.status, body: response.body })
        }
    }
}
