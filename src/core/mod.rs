pub mod engine;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod handle;
pub mod marshal;
pub mod runtime;
pub mod test_engine;

pub use engine::{
    Address, Capabilities, FetchHooks, HandleKind, NativeEngine, NativeError, NativeResult,
    RawHandle, StreamId,
};
pub use error::{VellumError, VellumResult};
pub use fetch::{
    BlockFetcher, BlockState, BoxFuture, RangeBody, RangeTransport, TransportError, TransportResult,
};
pub use geometry::{Matrix, Point, Quad, Rect};
pub use handle::OwnedHandle;
pub use runtime::Runtime;
pub use test_engine::{TestEngine, TestOutline};

#[cfg(feature = "http")]
pub use fetch::HttpTransport;
