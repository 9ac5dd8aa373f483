use crate::Result;

/// Block compression applied to serialized write requests before they are signed and sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compressor {
    // Snappy raw block format, the one remote write mandates.
    // The block header carries the uncompressed length.
    Snappy,
}

impl Default for Compressor {
    fn default() -> Self {
        Compressor::Snappy
    }
}

impl Compressor {
    /// Value for the `Content-Encoding` header.
    pub fn content_encoding(&self) -> &'static str {
        match self {
            Compressor::Snappy => "snappy",
        }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compressor::Snappy => Ok(snap::raw::Encoder::new().compress_vec(data)?),
        }
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compressor::Snappy => Ok(snap::raw::Decoder::new().decompress_vec(data)?),
        }
    }
}
