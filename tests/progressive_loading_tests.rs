//! Progressive fetch subsystem tests: deduplication, prefetch scanning,
//! closed-stream discard, retry on failure, and the end-to-end hook wiring
//! through the runtime.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use vellum::{
    BlockFetcher, BoxFuture, NativeEngine, RangeBody, RangeTransport, Runtime, TestEngine,
    TransportError, TransportResult,
};

/// In-memory range transport. Records every request; can fail the next
/// request, and can gate body reads behind a semaphore so tests control
/// exactly when a response "arrives".
#[derive(Clone)]
struct ScriptedTransport {
    data: Vec<u8>,
    requests: Arc<Mutex<Vec<(u64, u64)>>>,
    fail_next: Arc<AtomicBool>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTransport {
    fn new(len: usize) -> ScriptedTransport {
        ScriptedTransport {
            data: (0..len).map(|i| (i % 251) as u8).collect(),
            requests: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(AtomicBool::new(false)),
            gate: None,
        }
    }

    fn gated(len: usize) -> (ScriptedTransport, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut transport = ScriptedTransport::new(len);
        transport.gate = Some(gate.clone());
        (transport, gate)
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

struct ScriptedBody {
    bytes: Vec<u8>,
    gate: Option<Arc<Semaphore>>,
}

impl RangeBody for ScriptedBody {
    fn bytes(self: Box<Self>) -> BoxFuture<'static, TransportResult<Vec<u8>>> {
        Box::pin(async move {
            if let Some(gate) = self.gate {
                let permit = gate.acquire().await.map_err(|_| {
                    TransportError::Body("gate closed".to_string())
                })?;
                permit.forget();
            }
            Ok(self.bytes)
        })
    }
}

impl RangeTransport for ScriptedTransport {
    fn fetch_range<'a>(
        &'a self,
        _url: &'a str,
        start: u64,
        end: u64,
    ) -> BoxFuture<'a, TransportResult<Box<dyn RangeBody>>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push((start, end));
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(TransportError::Status(500));
            }
            let bytes = self.data[start as usize..end as usize].to_vec();
            Ok(Box::new(ScriptedBody {
                bytes,
                gate: self.gate.clone(),
            }) as Box<dyn RangeBody>)
        })
    }
}

fn fetcher_over(engine: &TestEngine, transport: ScriptedTransport) -> Arc<BlockFetcher> {
    let engine: Arc<dyn NativeEngine> = Arc::new(engine.clone());
    BlockFetcher::new(engine, Box::new(transport)).unwrap()
}

fn booted_engine() -> TestEngine {
    let engine = TestEngine::new();
    engine.boot().unwrap();
    engine
}

#[tokio::test]
async fn test_read_delivers_block_into_engine() {
    let engine = booted_engine();
    let transport = ScriptedTransport::new(1000);
    let fetcher = fetcher_over(&engine, transport.clone());

    // 1000 bytes in 256-byte blocks: four blocks, the last one short.
    fetcher.open_stream(1, "https://example.com/a.pdf", 1000, 8, false);
    assert_eq!(fetcher.block_count(1), Some(4));

    fetcher.read(1, 0).await;
    let delivered = engine.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, 1);
    assert_eq!(delivered[0].1, 0);
    assert_eq!(delivered[0].2, transport.data[0..256].to_vec());
    assert_eq!(fetcher.fetched_blocks(1), Some(1));

    // The final block's range is clamped to the content length.
    fetcher.read(1, 3).await;
    assert_eq!(*transport.requests.lock().unwrap().last().unwrap(), (768, 1000));
    assert_eq!(engine.delivered()[1].2.len(), 232);
}

#[tokio::test]
async fn test_completion_callback_reports_progress() {
    let engine = booted_engine();
    let fetcher = fetcher_over(&engine, ScriptedTransport::new(512));
    let completions = Arc::new(AtomicUsize::new(0));
    let seen = completions.clone();
    fetcher.set_on_complete(move |_id| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    fetcher.open_stream(3, "https://example.com/a.pdf", 512, 8, false);
    fetcher.read(3, 0).await;
    fetcher.read(3, 1).await;
    assert_eq!(completions.load(Ordering::SeqCst), 2);
    assert_eq!(fetcher.is_fully_fetched(3), Some(true));
}

#[tokio::test]
async fn test_duplicate_reads_issue_one_request() {
    let engine = booted_engine();
    let (transport, gate) = ScriptedTransport::gated(1024);
    let fetcher = fetcher_over(&engine, transport.clone());
    fetcher.open_stream(2, "https://example.com/a.pdf", 1024, 8, false);

    let background = {
        let fetcher = fetcher.clone();
        tokio::spawn(async move { fetcher.read(2, 0).await })
    };
    while transport.request_count() == 0 {
        tokio::task::yield_now().await;
    }

    // Second read of an in-flight block returns without a second request.
    fetcher.read(2, 0).await;
    assert_eq!(transport.request_count(), 1);

    gate.add_permits(1);
    background.await.unwrap();
    assert_eq!(transport.request_count(), 1);
    assert_eq!(engine.delivered().len(), 1);
}

#[tokio::test]
async fn test_prefetch_scan_finds_first_unfetched() {
    let engine = booted_engine();
    let transport = ScriptedTransport::new(1024);
    let fetcher = fetcher_over(&engine, transport.clone());
    fetcher.open_stream(4, "https://example.com/a.pdf", 1024, 8, false);

    fetcher.read(4, 0).await;
    fetcher.read(4, 1).await;

    // [fetched, fetched, unfetched, unfetched]: the scan from 0 lands on
    // block 2 (prefetch is off, so the chain stops after one block).
    fetcher.read_next(4, 0).await;
    let blocks: Vec<u32> = engine.delivered().iter().map(|d| d.1).collect();
    assert_eq!(blocks, vec![0, 1, 2]);

    fetcher.read_next(4, 0).await;
    assert_eq!(fetcher.is_fully_fetched(4), Some(true));

    // Fully fetched: another advance performs no request.
    let requests = transport.request_count();
    fetcher.read_next(4, 0).await;
    assert_eq!(transport.request_count(), requests);
}

#[tokio::test]
async fn test_prefetch_scan_wraps_around() {
    let engine = booted_engine();
    let transport = ScriptedTransport::new(1024);
    let fetcher = fetcher_over(&engine, transport.clone());
    fetcher.open_stream(5, "https://example.com/a.pdf", 1024, 8, false);

    fetcher.read(5, 1).await;
    fetcher.read(5, 2).await;
    fetcher.read(5, 3).await;

    // Scanning forward from 2 finds nothing unfetched until it wraps to 0.
    fetcher.read_next(5, 2).await;
    assert_eq!(engine.delivered().last().unwrap().1, 0);
    assert_eq!(fetcher.is_fully_fetched(5), Some(true));
}

#[tokio::test]
async fn test_prefetch_chain_walks_sequentially() {
    let engine = booted_engine();
    let transport = ScriptedTransport::new(1024);
    let fetcher = fetcher_over(&engine, transport.clone());
    fetcher.open_stream(6, "https://example.com/a.pdf", 1024, 8, true);

    // With prefetch on, one demand read pulls the whole document.
    fetcher.read(6, 0).await;
    let blocks: Vec<u32> = engine.delivered().iter().map(|d| d.1).collect();
    assert_eq!(blocks, vec![0, 1, 2, 3]);
    assert_eq!(transport.request_count(), 4);
}

#[tokio::test]
async fn test_closed_stream_discards_late_response() {
    let engine = booted_engine();
    let (transport, gate) = ScriptedTransport::gated(1024);
    let fetcher = fetcher_over(&engine, transport.clone());
    fetcher.open_stream(7, "https://example.com/a.pdf", 1024, 8, false);

    let background = {
        let fetcher = fetcher.clone();
        tokio::spawn(async move { fetcher.read(7, 0).await })
    };
    while transport.request_count() == 0 {
        tokio::task::yield_now().await;
    }

    // Close while the response is in flight, then let it complete.
    fetcher.close_stream(7);
    gate.add_permits(1);
    background.await.unwrap();

    // The late response is discarded: nothing reaches the engine.
    assert!(engine.delivered().is_empty());
    assert_eq!(engine.call_count("deliver_block"), 0);
    assert_eq!(fetcher.block_count(7), None);
}

#[tokio::test]
async fn test_failed_fetch_is_retryable() {
    let engine = booted_engine();
    let transport = ScriptedTransport::new(1024);
    transport.fail_next.store(true, Ordering::SeqCst);
    let fetcher = fetcher_over(&engine, transport.clone());
    fetcher.open_stream(8, "https://example.com/a.pdf", 1024, 8, false);

    // The failure is swallowed; the block reverts to unfetched.
    fetcher.read(8, 0).await;
    assert!(engine.delivered().is_empty());
    assert_eq!(fetcher.fetched_blocks(8), Some(0));

    // A later request for the same block succeeds.
    fetcher.read(8, 0).await;
    assert_eq!(engine.delivered().len(), 1);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_out_of_range_block_is_rejected_without_request() {
    let engine = booted_engine();
    let transport = ScriptedTransport::new(1024);
    let fetcher = fetcher_over(&engine, transport.clone());
    fetcher.open_stream(9, "https://example.com/a.pdf", 1024, 8, false);

    fetcher.read(9, 99).await;
    assert_eq!(transport.request_count(), 0);
    assert!(engine.delivered().is_empty());
}

#[tokio::test]
async fn test_runtime_wires_engine_hooks_end_to_end() {
    let engine = TestEngine::new();
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let transport = ScriptedTransport::new(4096);
    let fetcher = runtime.attach_fetcher(Box::new(transport.clone())).unwrap();

    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    fetcher.set_on_complete(move |id| {
        let _ = sender.send(id);
    });

    let stream = runtime
        .open_remote_stream("https://example.com/big.pdf", 4096, 1024, false)
        .unwrap();
    let id = stream.fetch_id().unwrap();
    assert_eq!(fetcher.block_count(id), Some(4));

    // The engine requests a block; the hook spawns the fetch, delivers the
    // bytes, and reports completion.
    engine.request_block(id, 2);
    assert_eq!(receiver.recv().await, Some(id));
    let delivered = engine.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, id);
    assert_eq!(delivered[0].1, 2);
    assert_eq!(delivered[0].2, transport.data[2048..3072].to_vec());

    // Dropping the stream closes the engine side, which detaches the
    // fetch state through the close hook.
    drop(stream);
    assert_eq!(fetcher.block_count(id), None);
}
