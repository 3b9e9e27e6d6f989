//! Lazy response body iteration.
//!
//! A body read straight from the network is single-pass. Once drained into
//! memory (see [`ResponseBodyIterator::buffer`]) it can be rewound and read
//! again.

use bytes::{Bytes, BytesMut};
use futures::Stream;

use crate::error::{Error, ErrorKind, Result};

/// Size of the chunks yielded by [`ResponseBodyIterator`] (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug)]
enum BodySource {
    Network {
        response: reqwest::Response,
        pending: BytesMut,
        finished: bool,
    },
    Buffered {
        data: Bytes,
        position: usize,
    },
}

/// Chunked reader over a response body.
///
/// Every chunk but the last is exactly [`CHUNK_SIZE`] bytes. Chunks come out
/// in the order received and are never re-read, except after [`rewind`] on a
/// buffered body.
///
/// [`rewind`]: ResponseBodyIterator::rewind
#[derive(Debug)]
pub struct ResponseBodyIterator {
    source: BodySource,
    /// Origin used in error messages.
    origin: String,
}

impl ResponseBodyIterator {
    pub(crate) fn from_network(response: reqwest::Response, origin: impl Into<String>) -> Self {
        Self {
            source: BodySource::Network {
                response,
                pending: BytesMut::new(),
                finished: false,
            },
            origin: origin.into(),
        }
    }

    /// Wrap an in-memory body.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            source: BodySource::Buffered {
                data: data.into(),
                position: 0,
            },
            origin: String::new(),
        }
    }

    /// Returns true if the body is held in memory.
    pub fn is_buffered(&self) -> bool {
        matches!(self.source, BodySource::Buffered { .. })
    }

    /// The whole in-memory body, regardless of the read position.
    pub fn buffered(&self) -> Option<&Bytes> {
        match &self.source {
            BodySource::Buffered { data, .. } => Some(data),
            BodySource::Network { .. } => None,
        }
    }

    /// Restart a buffered body from its first byte. Returns false (and does
    /// nothing) for a network body.
    pub fn rewind(&mut self) -> bool {
        match &mut self.source {
            BodySource::Buffered { position, .. } => {
                *position = 0;
                true
            }
            BodySource::Network { .. } => false,
        }
    }

    /// Read the next chunk; `None` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match &mut self.source {
            BodySource::Buffered { data, position } => {
                if *position >= data.len() {
                    return Ok(None);
                }
                let end = (*position + CHUNK_SIZE).min(data.len());
                let chunk = data.slice(*position..end);
                *position = end;
                Ok(Some(chunk))
            }
            BodySource::Network {
                response,
                pending,
                finished,
            } => {
                while !*finished && pending.len() < CHUNK_SIZE {
                    match response.chunk().await {
                        Ok(Some(bytes)) => pending.extend_from_slice(&bytes),
                        Ok(None) => *finished = true,
                        Err(e) => {
                            let message =
                                format!("Error reading response body from {} {}", self.origin, e);
                            return Err(Error::with_source(ErrorKind::Communication(message), e));
                        }
                    }
                }
                if pending.is_empty() {
                    return Ok(None);
                }
                let take = pending.len().min(CHUNK_SIZE);
                Ok(Some(pending.split_to(take).freeze()))
            }
        }
    }

    /// Drain the remaining chunks into one buffer.
    pub async fn collect_bytes(mut self) -> Result<Bytes> {
        if let BodySource::Buffered { data, position } = &self.source {
            return Ok(data.slice(*position..));
        }
        let mut out = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }

    /// Drain a network body into memory and return the rewound in-memory
    /// iterator over it. A buffered body is returned unchanged.
    pub async fn buffer(self) -> Result<Self> {
        if self.is_buffered() {
            return Ok(self);
        }
        let origin = self.origin.clone();
        let data = self.collect_bytes().await?;
        Ok(Self {
            origin,
            ..Self::from_bytes(data)
        })
    }

    /// The remaining chunks as a `Stream`.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>> + Send {
        futures::stream::try_unfold(self, |mut body| async move {
            Ok(body.next_chunk().await?.map(|chunk| (chunk, body)))
        })
    }
}
