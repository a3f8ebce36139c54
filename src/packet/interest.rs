//! 兴趣包模板与兴趣包。
//! Interest templates and Interests.

use super::name::Name;
use crate::fetcher::registry::TaskId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// InterestLifetime used when the template does not specify one.
/// 模板未指定时使用的兴趣包生存期。
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_secs(4);

fn default_lifetime() -> Duration {
    DEFAULT_INTEREST_LIFETIME
}

/// The opaque request handle issued at send time. The transport must return
/// it unchanged with the matching reply so the worker can dispatch the reply
/// to its task.
///
/// 发送时签发的不透明请求句柄。传输层必须在对应回复中原样返回它，
/// 以便工作线程将回复分派给所属任务。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken {
    /// The task that sent the Interest.
    /// 发送兴趣包的任务。
    pub task: TaskId,
    /// The requested segment number.
    /// 请求的分段号。
    pub seg_num: u64,
}

/// Name prefix and per-Interest parameters shared by every Interest of a task.
///
/// CanBePrefix and MustBeFresh are not normally used by a fetcher, but they may
/// be set for benchmarking purposes.
///
/// 任务中所有兴趣包共享的名称前缀与参数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestTemplate {
    /// Name prefix; the segment component is appended to it.
    /// 名称前缀；分段组件附加在其后。
    pub prefix: Name,
    #[serde(default)]
    pub can_be_prefix: bool,
    #[serde(default)]
    pub must_be_fresh: bool,
    /// InterestLifetime.
    #[serde(
        default = "default_lifetime",
        rename = "interestLifetime",
        with = "humantime_serde"
    )]
    pub lifetime: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hop_limit: Option<u8>,
}

impl InterestTemplate {
    pub fn new(prefix: Name) -> Self {
        Self {
            prefix,
            can_be_prefix: false,
            must_be_fresh: false,
            lifetime: DEFAULT_INTEREST_LIFETIME,
            hop_limit: None,
        }
    }

    /// Builds the Interest for one segment, with a fresh random nonce.
    ///
    /// 为一个分段构建兴趣包，并使用新的随机nonce。
    pub fn make_interest(&self, token: RequestToken) -> Interest {
        Interest {
            name: self.prefix.with_segment(token.seg_num),
            can_be_prefix: self.can_be_prefix,
            must_be_fresh: self.must_be_fresh,
            lifetime: self.lifetime,
            hop_limit: self.hop_limit,
            nonce: rand::random(),
            token,
        }
    }
}

impl Default for InterestTemplate {
    fn default() -> Self {
        Self::new(Name::new())
    }
}

/// An Interest requesting one segment.
///
/// 请求一个分段的兴趣包。
#[derive(Debug, Clone)]
pub struct Interest {
    pub name: Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub lifetime: Duration,
    pub hop_limit: Option<u8>,
    pub nonce: u32,
    pub token: RequestToken,
}

impl Interest {
    /// The requested segment number.
    pub fn seg_num(&self) -> u64 {
        self.token.seg_num
    }
}
