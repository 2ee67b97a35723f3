//! The progressive fetch subsystem.
//!
//! A remote document is addressed by byte-range requests and consumed by
//! the engine as if it were a fully buffered file. [`BlockFetcher`] feeds
//! it: the engine requests blocks out of order as its parser seeks, the
//! fetcher downloads each block at most once, delivers the bytes into
//! engine memory and, when prefetching is enabled, opportunistically walks
//! forward through the remaining blocks while nothing else is in flight.
//!
//! Per stream, per block the status moves `Unfetched -> InFlight ->
//! Fetched`, reverting to `Unfetched` on a failed request so the block can
//! be re-requested. Closing a stream removes its state entry; a completion
//! that finds no entry is discarded, so responses arriving after close are
//! never written into engine memory.

use crate::core::engine::{FetchHooks, NativeEngine, StreamId};
use crate::core::error::{VellumError, VellumResult};
use rustc_hash::FxHashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, trace, warn};

/// Boxed future used by the transport traits so they stay object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transport-level failure. Never escapes the fetcher; failed blocks are
/// logged and revert to retryable.
#[derive(Debug)]
pub enum TransportError {
    /// The request could not be issued or did not complete.
    Request(String),
    /// The server answered with something other than 206 Partial Content.
    Status(u16),
    /// The response body could not be read.
    Body(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Request(msg) => write!(f, "request failed: {}", msg),
            TransportError::Status(code) => write!(f, "expected 206 status, got {}", code),
            TransportError::Body(msg) => write!(f, "failed to read response: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Result alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Issues one byte-range request for `[start, end)` of `url`.
///
/// The response is two-staged (headers, then body) so the fetcher can check
/// for stream closure at both await points.
pub trait RangeTransport: Send + Sync {
    fn fetch_range<'a>(
        &'a self,
        url: &'a str,
        start: u64,
        end: u64,
    ) -> BoxFuture<'a, TransportResult<Box<dyn RangeBody>>>;
}

/// The body half of an in-flight range response.
pub trait RangeBody: Send {
    fn bytes(self: Box<Self>) -> BoxFuture<'static, TransportResult<Vec<u8>>>;
}

/// Per-block fetch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Unfetched,
    InFlight,
    Fetched,
}

struct FetchState {
    url: String,
    block_shift: u32,
    block_size: u64,
    content_length: u64,
    map: Vec<BlockState>,
    prefetch: bool,
}

/// Outcome of a single-block fetch, driving the prefetch chain.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Bytes were delivered to the engine.
    Delivered,
    /// The block was already in flight or fetched; nothing was done.
    Skipped,
    /// The stream was closed; the response (if any) was discarded.
    Dropped,
    /// The request failed; the block is retryable again.
    Failed,
}

/// Deduplicating, prefetching block fetcher. One instance serves every
/// progressive stream of an engine; state is keyed by the engine-assigned
/// stream id.
pub struct BlockFetcher {
    engine: Arc<dyn NativeEngine>,
    transport: Box<dyn RangeTransport>,
    states: Mutex<FxHashMap<StreamId, FetchState>>,
    on_complete: Mutex<Option<Box<dyn Fn(StreamId) + Send + Sync>>>,
    runtime: tokio::runtime::Handle,
    weak_self: Weak<BlockFetcher>,
}

impl BlockFetcher {
    /// Builds a fetcher. Must be called inside an async runtime; block
    /// requests arriving through the engine hooks are spawned onto it.
    pub fn new(
        engine: Arc<dyn NativeEngine>,
        transport: Box<dyn RangeTransport>,
    ) -> VellumResult<Arc<BlockFetcher>> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| VellumError::NoAsyncRuntime)?;
        Ok(Arc::new_cyclic(|weak| BlockFetcher {
            engine,
            transport,
            states: Mutex::new(FxHashMap::default()),
            on_complete: Mutex::new(None),
            runtime,
            weak_self: weak.clone(),
        }))
    }

    /// Registers a callback invoked after every delivered block, keyed by
    /// stream id. Intended for UI-level progress reporting.
    pub fn set_on_complete(&self, callback: impl Fn(StreamId) + Send + Sync + 'static) {
        *self.on_complete.lock().unwrap() = Some(Box::new(callback));
    }

    /// Registers a new stream. Invoked by the engine when a remote stream
    /// is created.
    pub fn open_stream(
        &self,
        id: StreamId,
        url: &str,
        content_length: u64,
        block_shift: u32,
        prefetch: bool,
    ) {
        let block_size = 1u64 << block_shift;
        let blocks = content_length.div_ceil(block_size) as usize;
        let state = FetchState {
            url: url.to_string(),
            block_shift,
            block_size,
            content_length,
            map: vec![BlockState::Unfetched; blocks],
            prefetch,
        };
        debug!(id, url, content_length, blocks, prefetch, "fetch stream opened");
        self.states.lock().unwrap().insert(id, state);
    }

    /// Closes a stream. In-flight requests are allowed to complete but
    /// their results are discarded; there is no network-level abort.
    pub fn close_stream(&self, id: StreamId) {
        if self.states.lock().unwrap().remove(&id).is_some() {
            debug!(id, "fetch stream closed");
        }
    }

    /// Fetches `block`. If the stream prefetches, keeps walking to the
    /// next unfetched block while no other fetch is in flight.
    ///
    /// Deduplicating: a block that is already in flight or fetched is not
    /// requested again. Failures are logged and leave the block retryable.
    pub async fn read(&self, id: StreamId, block: u32) {
        let mut block = block;
        loop {
            if self.fetch_block(id, block).await != Outcome::Delivered {
                return;
            }
            if !self.prefetch_enabled(id) {
                return;
            }
            match self.next_unfetched(id, block + 1) {
                Some(next) => block = next,
                None => return,
            }
        }
    }

    /// Prefetch advance: fetches the first unfetched block at or after
    /// `after`, wrapping around to the start. Does nothing while any block
    /// is in flight, or once every block is fetched.
    pub async fn read_next(&self, id: StreamId, after: u32) {
        match self.next_unfetched(id, after) {
            Some(block) => self.read(id, block).await,
            None => trace!(id, "no block to prefetch"),
        }
    }

    /// Number of blocks of a stream, if it is open.
    pub fn block_count(&self, id: StreamId) -> Option<usize> {
        self.states.lock().unwrap().get(&id).map(|s| s.map.len())
    }

    /// Number of fetched blocks of a stream, if it is open.
    pub fn fetched_blocks(&self, id: StreamId) -> Option<usize> {
        self.states.lock().unwrap().get(&id).map(|s| {
            s.map
                .iter()
                .filter(|b| **b == BlockState::Fetched)
                .count()
        })
    }

    /// True once every block of an open stream has been fetched.
    pub fn is_fully_fetched(&self, id: StreamId) -> Option<bool> {
        self.states
            .lock()
            .unwrap()
            .get(&id)
            .map(|s| s.map.iter().all(|b| *b == BlockState::Fetched))
    }

    async fn fetch_block(&self, id: StreamId, block: u32) -> Outcome {
        let (url, start, end) = {
            let mut states = self.states.lock().unwrap();
            let Some(state) = states.get_mut(&id) else {
                return Outcome::Dropped;
            };
            let index = block as usize;
            if index >= state.map.len() {
                warn!(id, block, blocks = state.map.len(), "block out of range");
                return Outcome::Failed;
            }
            if state.map[index] != BlockState::Unfetched {
                return Outcome::Skipped;
            }
            state.map[index] = BlockState::InFlight;
            let start = (block as u64) << state.block_shift;
            let end = (start + state.block_size).min(state.content_length);
            (state.url.clone(), start, end)
        };

        let response = match self.transport.fetch_range(&url, start, end).await {
            Ok(response) => response,
            Err(err) => {
                self.revert(id, block);
                warn!(id, block, %err, "block fetch failed");
                return Outcome::Failed;
            }
        };
        if !self.is_open(id) {
            return Outcome::Dropped;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                self.revert(id, block);
                warn!(id, block, %err, "block body read failed");
                return Outcome::Failed;
            }
        };
        if !self.is_open(id) {
            return Outcome::Dropped;
        }

        {
            let mut states = self.states.lock().unwrap();
            let Some(state) = states.get_mut(&id) else {
                return Outcome::Dropped;
            };
            state.map[block as usize] = BlockState::Fetched;
        }

        if let Err(err) = self.deliver(id, block, &body) {
            self.reset(id, block);
            warn!(id, block, %err, "block delivery failed");
            return Outcome::Failed;
        }
        trace!(id, block, len = body.len(), "block delivered");

        if let Some(callback) = &*self.on_complete.lock().unwrap() {
            callback(id);
        }
        Outcome::Delivered
    }

    /// Copies fetched bytes into engine memory and notifies the engine
    /// that the block is resident.
    fn deliver(&self, id: StreamId, block: u32, bytes: &[u8]) -> VellumResult<()> {
        let addr = self.engine.malloc(bytes.len())?;
        self.engine.write_bytes(addr, bytes);
        let result = self.engine.deliver_block(id, block, addr, bytes.len());
        self.engine.free(addr);
        Ok(result?)
    }

    /// First unfetched block at or after `after`, wrapping around. None
    /// while any block is in flight (only one fetch per stream at a time)
    /// or once everything is fetched.
    fn next_unfetched(&self, id: StreamId, after: u32) -> Option<u32> {
        let states = self.states.lock().unwrap();
        let state = states.get(&id)?;
        if state.map.iter().any(|b| *b == BlockState::InFlight) {
            return None;
        }
        let blocks = state.map.len();
        if blocks == 0 {
            return None;
        }
        (0..blocks)
            .map(|i| (after as usize + i) % blocks)
            .find(|&b| state.map[b] == BlockState::Unfetched)
            .map(|b| b as u32)
    }

    fn prefetch_enabled(&self, id: StreamId) -> bool {
        self.states
            .lock()
            .unwrap()
            .get(&id)
            .is_some_and(|s| s.prefetch)
    }

    fn is_open(&self, id: StreamId) -> bool {
        self.states.lock().unwrap().contains_key(&id)
    }

    /// Returns an in-flight block to the retryable state after a failed
    /// request.
    fn revert(&self, id: StreamId, block: u32) {
        let mut states = self.states.lock().unwrap();
        if let Some(state) = states.get_mut(&id) {
            if state.map[block as usize] == BlockState::InFlight {
                state.map[block as usize] = BlockState::Unfetched;
            }
        }
    }

    /// Unconditionally marks a block unfetched again, for a delivery that
    /// failed after the block had been marked fetched.
    fn reset(&self, id: StreamId, block: u32) {
        let mut states = self.states.lock().unwrap();
        if let Some(state) = states.get_mut(&id) {
            state.map[block as usize] = BlockState::Unfetched;
        }
    }
}

impl FetchHooks for BlockFetcher {
    fn open(&self, id: StreamId, url: &str, content_length: u64, block_shift: u32, prefetch: bool) {
        self.open_stream(id, url, content_length, block_shift, prefetch);
    }

    fn read(&self, id: StreamId, block: u32) {
        if let Some(fetcher) = self.weak_self.upgrade() {
            self.runtime.spawn(async move {
                fetcher.read(id, block).await;
            });
        }
    }

    fn close(&self, id: StreamId) {
        self.close_stream(id);
    }
}

/// Range-request transport over HTTP, backed by reqwest.
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpTransport {
    pub fn new() -> VellumResult<HttpTransport> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|err| VellumError::Transport(err.to_string()))?;
        Ok(HttpTransport { client })
    }
}

#[cfg(feature = "http")]
impl RangeTransport for HttpTransport {
    fn fetch_range<'a>(
        &'a self,
        url: &'a str,
        start: u64,
        end: u64,
    ) -> BoxFuture<'a, TransportResult<Box<dyn RangeBody>>> {
        Box::pin(async move {
            let range = format!("bytes={}-{}", start, end.saturating_sub(1));
            let response = self
                .client
                .get(url)
                .header(reqwest::header::RANGE, range)
                .send()
                .await
                .map_err(|err| TransportError::Request(err.to_string()))?;
            if response.status() != reqwest::StatusCode::PARTIAL_CONTENT {
                return Err(TransportError::Status(response.status().as_u16()));
            }
            Ok(Box::new(HttpRangeBody { response }) as Box<dyn RangeBody>)
        })
    }
}

#[cfg(feature = "http")]
struct HttpRangeBody {
    response: reqwest::Response,
}

#[cfg(feature = "http")]
impl RangeBody for HttpRangeBody {
    fn bytes(self: Box<Self>) -> BoxFuture<'static, TransportResult<Vec<u8>>> {
        Box::pin(async move {
            let bytes = self
                .response
                .bytes()
                .await
                .map_err(|err| TransportError::Body(err.to_string()))?;
            Ok(bytes.to_vec())
        })
    }
}
