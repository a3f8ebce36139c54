//! The packet module, containing a structured model of the NDN packets exchanged
//! by a fetch task: names, Interests, Data and Nacks. Wire encoding is left to
//! the transport.
//!
//! packet 模块，包含抓取任务所交换NDN包的结构化模型：名称、兴趣包、数据包和Nack。
//! 线路编码由传输层负责。

pub mod data;
pub mod interest;
pub mod name;

pub use data::{Data, Nack, NackReason, Reply};
pub use interest::{DEFAULT_INTEREST_LIFETIME, Interest, InterestTemplate, RequestToken};
pub use name::{
    MAX_NAME_LEN, Name, NameComponent, TT_GENERIC_NAME_COMPONENT, TT_SEGMENT_NAME_COMPONENT,
};

#[cfg(test)]
mod tests;
