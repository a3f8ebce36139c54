//! The fetch engine core: reliability building blocks, the fetch logic state
//! machine that composes them, and its counters.
//! 抓取引擎核心：可靠性构件、组合它们的抓取逻辑状态机及其计数器。

pub mod counters;
pub mod logic;
pub mod reliability;

pub use counters::{Counters, RttStats, RunningStat};
pub use logic::{FetchLogic, RxOutcome};
