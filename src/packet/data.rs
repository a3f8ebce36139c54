//! 数据包、Nack 以及交付给抓取任务的回复。
//! Data, Nack and the replies delivered to a fetch task.

use super::{
    interest::{Interest, RequestToken},
    name::Name,
};
use bytes::Bytes;

/// A Data packet answering one Interest.
///
/// 响应一个兴趣包的数据包。
#[derive(Debug, Clone)]
pub struct Data {
    pub name: Name,
    /// Content payload.
    /// 内容载荷。
    pub content: Bytes,
    /// Segment number in the FinalBlockId field, if present.
    /// FinalBlockId 字段中的分段号（如果存在）。
    pub final_block: Option<u64>,
    pub token: RequestToken,
}

impl Data {
    /// Creates a Data that satisfies `interest`.
    ///
    /// 创建满足 `interest` 的数据包。
    pub fn answer(interest: &Interest, content: impl Into<Bytes>) -> Self {
        Self {
            name: interest.name.clone(),
            content: content.into(),
            final_block: None,
            token: interest.token,
        }
    }

    pub fn with_final_block(mut self, final_block: u64) -> Self {
        self.final_block = Some(final_block);
        self
    }

    /// Segment number of this Data, taken from its name.
    pub fn segment(&self) -> Option<u64> {
        self.name.segment()
    }

    /// Whether this Data is the last segment of the object.
    ///
    /// 此数据包是否为对象的最后一个分段。
    pub fn is_final_segment(&self) -> bool {
        matches!((self.segment(), self.final_block), (Some(s), Some(f)) if s == f)
    }
}

/// Nack reason codes, as assigned by NDNLPv2.
///
/// NDNLPv2 分配的 Nack 原因码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NackReason {
    Congestion,
    Duplicate,
    NoRoute,
    Unspecified,
}

impl NackReason {
    pub fn code(self) -> u8 {
        match self {
            NackReason::Congestion => 50,
            NackReason::Duplicate => 100,
            NackReason::NoRoute => 150,
            NackReason::Unspecified => 255,
        }
    }

    /// Maps a wire code to a reason; unknown codes become `Unspecified`.
    pub fn from_code(code: u8) -> Self {
        match code {
            50 => NackReason::Congestion,
            100 => NackReason::Duplicate,
            150 => NackReason::NoRoute,
            _ => NackReason::Unspecified,
        }
    }
}

/// An explicit rejection of one Interest.
///
/// 对一个兴趣包的显式拒绝。
#[derive(Debug, Clone)]
pub struct Nack {
    pub reason: NackReason,
    pub token: RequestToken,
}

impl Nack {
    pub fn reject(interest: &Interest, reason: NackReason) -> Self {
        Self {
            reason,
            token: interest.token,
        }
    }
}

/// A reply delivered by the transport to the worker owning the request.
///
/// 由传输层交付给拥有该请求的工作线程的回复。
#[derive(Debug, Clone)]
pub enum Reply {
    Data(Data),
    Nack(Nack),
}

impl Reply {
    /// The request handle this reply answers.
    pub fn token(&self) -> RequestToken {
        match self {
            Reply::Data(data) => data.token,
            Reply::Nack(nack) => nack.token,
        }
    }
}

impl From<Data> for Reply {
    fn from(data: Data) -> Self {
        Reply::Data(data)
    }
}

impl From<Nack> for Reply {
    fn from(nack: Nack) -> Self {
        Reply::Nack(nack)
    }
}
