//! The reliability layer.
//!
//! This layer tracks which segments are in flight, estimates the round-trip
//! time, and schedules retransmission timeouts. It knows nothing about the
//! network or congestion control.
//!
//! 可靠性层。
//!
//! 该层跟踪哪些分段在途、估算往返时间并调度重传超时。它不了解网络和拥塞控制。

pub mod rtt;
pub mod scheduler;
pub mod window;

pub use rtt::RttEstimator;
pub use scheduler::RetxScheduler;
pub use window::{FetchWindow, SegmentEntry, SegmentState};
