// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte-exact golden vectors for the canonical binary codec. Any change to
//! these encodings is a wire-compatibility break.

use refda::ari::{Ari, AriType, LitValue, ObjRef, ObjType, TimeDuration};
use refda::codec::{decode, encode};

fn check(value: Ari, expected: &[u8]) {
    let bytes = encode(&value);
    assert_eq!(
        bytes,
        expected,
        "encoding mismatch for {} (got {})",
        value,
        hex::encode(&bytes)
    );
    let (back, consumed) = decode(expected).expect("golden bytes decode");
    assert_eq!(back, value);
    assert_eq!(consumed, expected.len());
}

#[test]
fn test_primitive_vectors() {
    check(Ari::undefined(), &[0xf7]);
    check(Ari::null(), &[0xf6]);
    check(Ari::bool(false), &[0xf4]);
    check(Ari::bool(true), &[0xf5]);
    check(Ari::uint(0), &[0x00]);
    check(Ari::uint(23), &[0x17]);
    check(Ari::uint(24), &[0x18, 0x18]);
    check(Ari::uint(256), &[0x19, 0x01, 0x00]);
    check(Ari::int(-1), &[0x20]);
    check(Ari::int(-25), &[0x38, 0x18]);
    check(Ari::text("hi"), &[0x62, 0x68, 0x69]);
    check(Ari::bytes(vec![0xde, 0xad]), &[0x42, 0xde, 0xad]);
    check(
        Ari::real(1.5),
        &[0xfb, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    );
}

#[test]
fn test_tagged_literal_vectors() {
    // [INT(4), 4]
    check(Ari::typed(AriType::Int, LitValue::Int(4)), &[0x82, 0x04, 0x04]);
    // [LABEL(14), "severity"]
    check(
        Ari::label("sev"),
        &[0x82, 0x0e, 0x63, 0x73, 0x65, 0x76],
    );
    // [TD(13), [1, 500000000]]
    check(
        Ari::td(TimeDuration::from_millis(1500)),
        &[0x82, 0x0d, 0x82, 0x01, 0x1a, 0x1d, 0xcd, 0x65, 0x00],
    );
    // [AC(17), [1]]
    check(Ari::ac(vec![Ari::uint(1)]), &[0x82, 0x11, 0x81, 0x01]);
}

#[test]
fn test_reference_vectors() {
    // [org 1, model 1, CTRL(-6 -> 0x25), obj 4]
    check(
        Ari::objref(ObjRef::with_enums(1, 1, ObjType::Ctrl, 4)),
        &[0x84, 0x01, 0x01, 0x25, 0x04],
    );
    // with one positional parameter
    check(
        Ari::objref(ObjRef::with_enums(1, 1, ObjType::Edd, 2).with_params(vec![Ari::bool(true)])),
        &[0x85, 0x01, 0x01, 0x24, 0x02, 0x81, 0xf5],
    );
    // negative (ODM) model id
    check(
        Ari::objref(ObjRef::with_enums(65535, -5, ObjType::Var, 1)),
        &[0x84, 0x19, 0xff, 0xff, 0x24, 0x23, 0x01],
    );
}

#[test]
fn test_execset_vector() {
    // [EXECSET(20), [nonce 7, [[1,1,CTRL,4]]]]
    check(
        Ari::execset(
            Ari::uint(7),
            vec![Ari::objref(ObjRef::with_enums(1, 1, ObjType::Ctrl, 4))],
        ),
        &[
            0x82, 0x14, 0x82, 0x07, 0x81, 0x84, 0x01, 0x01, 0x25, 0x04,
        ],
    );
}
