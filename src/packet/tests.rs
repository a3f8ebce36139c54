//! Tests for the packet model.
use super::*;
use crate::fetcher::registry::TaskId;
use bytes::Bytes;
use std::time::Duration;

fn token(seg_num: u64) -> RequestToken {
    RequestToken {
        task: TaskId::new(0, 1, 7),
        seg_num,
    }
}

#[test]
fn test_name_parse_and_display() {
    let name: Name = "/ndn/edu/file.bin".parse().unwrap();
    assert_eq!(name.len(), 3);
    assert_eq!(name.to_string(), "/ndn/edu/file.bin");

    let root: Name = "/".parse().unwrap();
    assert!(root.is_empty());
    assert_eq!(root.to_string(), "/");

    let with_uri_scheme: Name = "ndn:/A".parse().unwrap();
    assert_eq!(with_uri_scheme.to_string(), "/A");

    assert!("relative/name".parse::<Name>().is_err());
    assert!("/bad%zz".parse::<Name>().is_err());
}

#[test]
fn test_name_percent_escaping() {
    let name: Name = "/a%20b/%00%FF".parse().unwrap();
    assert_eq!(name.get(0).unwrap().value().as_ref(), b"a b");
    assert_eq!(name.get(1).unwrap().value().as_ref(), &[0x00, 0xFF]);
    assert_eq!(name.to_string(), "/a%20b/%00%FF");
}

#[test]
fn test_name_percent_escape_requires_two_hex_digits() {
    assert!("/a%+f".parse::<Name>().is_err());
    assert!("/a%-1".parse::<Name>().is_err());
    assert!("/a%f".parse::<Name>().is_err());
    assert!(matches!(
        "/a%+f".parse::<Name>(),
        Err(crate::error::Error::InvalidName(_))
    ));
}

#[test]
fn test_segment_component_encoding() {
    assert_eq!(NameComponent::segment(0).value().as_ref(), &[0x00]);
    assert_eq!(NameComponent::segment(255).value().len(), 1);
    assert_eq!(NameComponent::segment(256).value().as_ref(), &[0x01, 0x00]);
    assert_eq!(NameComponent::segment(70_000).value().len(), 4);
    assert_eq!(NameComponent::segment(u64::MAX).value().len(), 8);

    for n in [0, 1, 255, 256, 65535, 65536, u32::MAX as u64, u64::MAX] {
        assert_eq!(NameComponent::segment(n).as_segment(), Some(n));
    }

    // A 3-octet value is not a valid NonNegativeInteger.
    let odd = NameComponent::new(TT_SEGMENT_NAME_COMPONENT, Bytes::from_static(&[1, 2, 3]));
    assert_eq!(odd.as_segment(), None);
    assert_eq!(NameComponent::generic("5").as_segment(), None);
}

#[test]
fn test_name_with_segment() {
    let prefix: Name = "/A/B".parse().unwrap();
    let name = prefix.with_segment(42);
    assert_eq!(name.to_string(), "/A/B/seg=42");
    assert_eq!(name.segment(), Some(42));
    assert!(prefix.is_prefix_of(&name));
    assert_eq!(prefix.segment(), None);

    let parsed: Name = "/A/B/seg=42".parse().unwrap();
    assert_eq!(parsed, name);
}

#[test]
fn test_encoded_len() {
    let name: Name = "/A/BC".parse().unwrap();
    assert_eq!(name.encoded_len(), 3 + 4);
    assert_eq!(NameComponent::segment(u64::MAX).encoded_len(), 10);
    assert_eq!(NameComponent::generic(vec![0u8; 300]).encoded_len(), 1 + 3 + 300);
}

#[test]
fn test_make_interest() {
    let mut tpl = InterestTemplate::new("/A".parse().unwrap());
    tpl.must_be_fresh = true;
    tpl.lifetime = Duration::from_millis(500);

    let interest = tpl.make_interest(token(9));
    assert_eq!(interest.name.to_string(), "/A/seg=9");
    assert_eq!(interest.seg_num(), 9);
    assert!(interest.must_be_fresh);
    assert!(!interest.can_be_prefix);
    assert_eq!(interest.lifetime, Duration::from_millis(500));
    assert_eq!(interest.token, token(9));
}

#[test]
fn test_data_final_segment() {
    let tpl = InterestTemplate::new("/A".parse().unwrap());
    let interest = tpl.make_interest(token(3));

    let data = Data::answer(&interest, Bytes::from_static(b"payload"));
    assert_eq!(data.segment(), Some(3));
    assert!(!data.is_final_segment());

    let last = data.clone().with_final_block(3);
    assert!(last.is_final_segment());
    let not_last = data.with_final_block(10);
    assert!(!not_last.is_final_segment());
}

#[test]
fn test_nack_reason_codes() {
    for reason in [
        NackReason::Congestion,
        NackReason::Duplicate,
        NackReason::NoRoute,
        NackReason::Unspecified,
    ] {
        assert_eq!(NackReason::from_code(reason.code()), reason);
    }
    assert_eq!(NackReason::from_code(7), NackReason::Unspecified);
}

#[test]
fn test_reply_token() {
    let tpl = InterestTemplate::new("/A".parse().unwrap());
    let interest = tpl.make_interest(token(1));
    let reply: Reply = Nack::reject(&interest, NackReason::NoRoute).into();
    assert_eq!(reply.token(), token(1));
}
