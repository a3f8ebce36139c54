//! 定义了NDN名称及名称组件。
//! Defines NDN names and name components.

use crate::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// TLV-TYPE of a generic name component.
pub const TT_GENERIC_NAME_COMPONENT: u16 = 0x08;

/// TLV-TYPE of a segment number component (naming conventions rev3).
pub const TT_SEGMENT_NAME_COMPONENT: u16 = 0x32;

/// Maximum encoded length of a name's TLV-VALUE.
/// 名称 TLV-VALUE 的最大编码长度。
pub const MAX_NAME_LEN: usize = 2048;

/// Encoded size of a TLV VAR-NUMBER.
fn varnum_len(v: u64) -> usize {
    match v {
        0..=252 => 1,
        253..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

/// Encodes a NonNegativeInteger in its shortest 1, 2, 4 or 8 octet form.
fn encode_nni(n: u64) -> Bytes {
    if n <= u8::MAX as u64 {
        Bytes::copy_from_slice(&(n as u8).to_be_bytes())
    } else if n <= u16::MAX as u64 {
        Bytes::copy_from_slice(&(n as u16).to_be_bytes())
    } else if n <= u32::MAX as u64 {
        Bytes::copy_from_slice(&(n as u32).to_be_bytes())
    } else {
        Bytes::copy_from_slice(&n.to_be_bytes())
    }
}

fn decode_nni(b: &[u8]) -> Option<u64> {
    match b.len() {
        1 | 2 | 4 | 8 => Some(b.iter().fold(0u64, |acc, &x| (acc << 8) | x as u64)),
        _ => None,
    }
}

/// One component of a [`Name`].
///
/// [`Name`] 的一个组件。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NameComponent {
    typ: u16,
    value: Bytes,
}

impl NameComponent {
    /// Creates a component of arbitrary type.
    pub fn new(typ: u16, value: impl Into<Bytes>) -> Self {
        Self {
            typ,
            value: value.into(),
        }
    }

    /// Creates a generic component.
    pub fn generic(value: impl Into<Bytes>) -> Self {
        Self::new(TT_GENERIC_NAME_COMPONENT, value)
    }

    /// Creates a segment number component.
    ///
    /// 创建分段号组件。
    pub fn segment(seg_num: u64) -> Self {
        Self::new(TT_SEGMENT_NAME_COMPONENT, encode_nni(seg_num))
    }

    pub fn typ(&self) -> u16 {
        self.typ
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Interprets this component as a segment number.
    ///
    /// 将此组件解释为分段号。
    pub fn as_segment(&self) -> Option<u64> {
        if self.typ != TT_SEGMENT_NAME_COMPONENT {
            return None;
        }
        decode_nni(&self.value)
    }

    /// Length of this component in TLV form.
    pub fn encoded_len(&self) -> usize {
        varnum_len(self.typ as u64) + varnum_len(self.value.len() as u64) + self.value.len()
    }

    fn parse(s: &str) -> Result<Self> {
        if let Some(seg) = s.strip_prefix("seg=") {
            let n = seg
                .parse::<u64>()
                .map_err(|_| Error::InvalidName(s.to_string()))?;
            return Ok(Self::segment(n));
        }
        if let Some((typ, value)) = s.split_once('=') {
            if let Ok(typ) = typ.parse::<u16>() {
                return Ok(Self::new(typ, unescape(value)?));
            }
        }
        Ok(Self::generic(unescape(s)?))
    }
}

fn unescape(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s
                .get(i + 1..i + 3)
                .filter(|h| h.bytes().all(|c| c.is_ascii_hexdigit()))
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::InvalidName(s.to_string()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(seg) = self.as_segment() {
            return write!(f, "seg={seg}");
        }
        if self.typ != TT_GENERIC_NAME_COMPONENT {
            write!(f, "{}=", self.typ)?;
        }
        for &b in self.value.iter() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "%{b:02X}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An NDN name: a sequence of components, printed in URI form.
///
/// NDN名称：组件序列，以URI形式打印。
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, component: NameComponent) {
        self.components.push(component);
    }

    /// Returns a copy of this name with a segment component appended.
    ///
    /// 返回附加了分段组件的名称副本。
    pub fn with_segment(&self, seg_num: u64) -> Name {
        let mut components = Vec::with_capacity(self.components.len() + 1);
        components.extend_from_slice(&self.components);
        components.push(NameComponent::segment(seg_num));
        Name { components }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&NameComponent> {
        self.components.get(i)
    }

    pub fn last(&self) -> Option<&NameComponent> {
        self.components.last()
    }

    /// Segment number carried in the last component, if any.
    pub fn segment(&self) -> Option<u64> {
        self.last().and_then(NameComponent::as_segment)
    }

    /// Whether `self` is a prefix of `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        other.components.starts_with(&self.components)
    }

    /// Length of the name's TLV-VALUE.
    pub fn encoded_len(&self) -> usize {
        self.components.iter().map(NameComponent::encoded_len).sum()
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("ndn:").unwrap_or(s);
        if !s.starts_with('/') {
            return Err(Error::InvalidName(s.to_string()));
        }
        let components = s
            .split('/')
            .filter(|c| !c.is_empty())
            .map(NameComponent::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Name { components })
    }
}

impl TryFrom<String> for Name {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.to_string()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for c in &self.components {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
