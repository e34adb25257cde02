// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Canonical binary codec for ARI values ("ARI-CBOR").
//!
//! The encoding is a small-vocabulary CBOR subset:
//! - untagged primitive literals encode as the bare CBOR item;
//! - type-tagged literals encode as a 2-array `[type-code, payload]`;
//! - object references encode as a 4..6-array
//!   `[org, model, type-code, obj, params?, named?]`.
//!
//! Encoding is total and deterministic: integer and length arguments use the
//! shortest form, floats are always 64-bit, and map keys iterate in the value
//! model's total order. Decoding rejects non-shortest argument forms and
//! reports the count of bytes consumed.

use std::collections::BTreeMap;

use super::cursor::{Cursor, Writer};
use super::{CodecError, CodecResult};
use crate::ari::{
    Ari, AriType, ExecSet, Lit, LitValue, ObjRef, ObjType, Real, RefSeg, Report, RptSet, Table,
    TimeDuration, TimePoint,
};

const MAJOR_UINT: u8 = 0;
const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;

const SIMPLE_FALSE: u64 = 20;
const SIMPLE_TRUE: u64 = 21;
const SIMPLE_NULL: u64 = 22;
const SIMPLE_UNDEFINED: u64 = 23;
const ARG_FLOAT64: u64 = 27;

/// Encode one ARI to its canonical binary form. Total and deterministic.
pub fn encode(value: &Ari) -> Vec<u8> {
    let mut w = Writer::new();
    encode_item(&mut w, value);
    w.into_bytes()
}

/// Encode a message payload: back-to-back binary ARIs, in order.
pub fn encode_list(values: &[Ari]) -> Vec<u8> {
    let mut w = Writer::new();
    for value in values {
        encode_item(&mut w, value);
    }
    w.into_bytes()
}

/// Decode one ARI from a prefix of `bytes`, returning the value and the
/// count of bytes consumed.
pub fn decode(bytes: &[u8]) -> CodecResult<(Ari, usize)> {
    let mut c = Cursor::new(bytes);
    let value = decode_item(&mut c)?;
    Ok((value, c.offset()))
}

/// Decode an entire message payload of back-to-back ARIs.
pub fn decode_list(bytes: &[u8]) -> CodecResult<Vec<Ari>> {
    let mut c = Cursor::new(bytes);
    let mut values = Vec::new();
    while !c.is_eof() {
        values.push(decode_item(&mut c)?);
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn write_head(w: &mut Writer, major: u8, arg: u64) {
    let mt = major << 5;
    if arg < 24 {
        w.put_u8(mt | arg as u8);
    } else if arg <= u64::from(u8::MAX) {
        w.put_u8(mt | 24);
        w.put_u8(arg as u8);
    } else if arg <= u64::from(u16::MAX) {
        w.put_u8(mt | 25);
        w.put_u16_be(arg as u16);
    } else if arg <= u64::from(u32::MAX) {
        w.put_u8(mt | 26);
        w.put_u32_be(arg as u32);
    } else {
        w.put_u8(mt | 27);
        w.put_u64_be(arg);
    }
}

fn write_int(w: &mut Writer, value: i64) {
    if value >= 0 {
        write_head(w, MAJOR_UINT, value as u64);
    } else {
        write_head(w, MAJOR_NINT, !(value as u64));
    }
}

fn write_text(w: &mut Writer, text: &str) {
    write_head(w, MAJOR_TEXT, text.len() as u64);
    w.put_bytes(text.as_bytes());
}

fn write_simple(w: &mut Writer, arg: u64) {
    write_head(w, 7, arg);
}

fn write_f64(w: &mut Writer, value: f64) {
    w.put_u8((7 << 5) | ARG_FLOAT64 as u8);
    w.put_f64_be(value);
}

/// The tag a structured or framed value must carry on the wire even when the
/// in-memory literal was built without one.
fn inherent_tag(value: &LitValue) -> Option<AriType> {
    match value {
        LitValue::Label(_) => Some(AriType::Label),
        LitValue::Tp(_) => Some(AriType::Tp),
        LitValue::Td(_) => Some(AriType::Td),
        LitValue::Type(_) => Some(AriType::AriType),
        LitValue::Ac(_) => Some(AriType::Ac),
        LitValue::Am(_) => Some(AriType::Am),
        LitValue::Tbl(_) => Some(AriType::Tbl),
        LitValue::ExecSet(_) => Some(AriType::ExecSet),
        LitValue::RptSet(_) => Some(AriType::RptSet),
        _ => None,
    }
}

fn encode_item(w: &mut Writer, value: &Ari) {
    match value {
        Ari::Lit(lit) => match lit.typ.or_else(|| inherent_tag(&lit.value)) {
            None => encode_untagged(w, &lit.value),
            Some(tag) => {
                write_head(w, MAJOR_ARRAY, 2);
                write_int(w, tag.code());
                encode_payload(w, &lit.value);
            }
        },
        Ari::Ref(r) => encode_objref(w, r),
    }
}

fn encode_untagged(w: &mut Writer, value: &LitValue) {
    match value {
        LitValue::Undefined => write_simple(w, SIMPLE_UNDEFINED),
        LitValue::Null => write_simple(w, SIMPLE_NULL),
        LitValue::Bool(v) => write_simple(w, if *v { SIMPLE_TRUE } else { SIMPLE_FALSE }),
        LitValue::Int(v) => write_int(w, *v),
        LitValue::Uint(v) => write_head(w, MAJOR_UINT, *v),
        LitValue::Real(Real(v)) => write_f64(w, *v),
        LitValue::Bytes(v) => {
            write_head(w, MAJOR_BYTES, v.len() as u64);
            w.put_bytes(v);
        }
        LitValue::Text(v) => write_text(w, v),
        // unreachable through encode_item; kept total for direct callers
        other => encode_payload(w, other),
    }
}

fn encode_payload(w: &mut Writer, value: &LitValue) {
    match value {
        LitValue::Label(v) => write_text(w, v),
        LitValue::Type(t) => write_int(w, t.code()),
        LitValue::Tp(tp) => encode_timepair(w, tp.secs(), tp.nanos()),
        LitValue::Td(td) => encode_timepair(w, td.secs(), td.nanos()),
        LitValue::Ac(items) => {
            write_head(w, MAJOR_ARRAY, items.len() as u64);
            for item in items {
                encode_item(w, item);
            }
        }
        LitValue::Am(map) => {
            write_head(w, MAJOR_MAP, map.len() as u64);
            for (key, val) in map {
                encode_item(w, key);
                encode_item(w, val);
            }
        }
        LitValue::Tbl(table) => {
            write_head(w, MAJOR_ARRAY, 2);
            write_head(w, MAJOR_UINT, table.ncols() as u64);
            write_head(w, MAJOR_ARRAY, table.cells().len() as u64);
            for cell in table.cells() {
                encode_item(w, cell);
            }
        }
        LitValue::ExecSet(es) => {
            write_head(w, MAJOR_ARRAY, 2);
            encode_item(w, &es.nonce);
            write_head(w, MAJOR_ARRAY, es.targets.len() as u64);
            for target in &es.targets {
                encode_item(w, target);
            }
        }
        LitValue::RptSet(rs) => {
            write_head(w, MAJOR_ARRAY, 3);
            encode_item(w, &rs.nonce);
            encode_timepair(w, rs.reftime.secs(), rs.reftime.nanos());
            write_head(w, MAJOR_ARRAY, rs.reports.len() as u64);
            for report in &rs.reports {
                encode_report(w, report);
            }
        }
        other => encode_untagged(w, other),
    }
}

fn encode_timepair(w: &mut Writer, secs: i64, nanos: u32) {
    write_head(w, MAJOR_ARRAY, 2);
    write_int(w, secs);
    write_head(w, MAJOR_UINT, u64::from(nanos));
}

fn encode_report(w: &mut Writer, report: &Report) {
    write_head(w, MAJOR_ARRAY, 3);
    encode_timepair(w, report.reltime.secs(), report.reltime.nanos());
    encode_item(w, &report.source);
    write_head(w, MAJOR_ARRAY, report.items.len() as u64);
    for item in &report.items {
        encode_item(w, item);
    }
}

fn encode_seg(w: &mut Writer, seg: &RefSeg) {
    match seg {
        RefSeg::Int(v) => write_int(w, *v),
        RefSeg::Name(v) => write_text(w, v),
    }
}

fn encode_objref(w: &mut Writer, r: &ObjRef) {
    let len = if !r.named_params.is_empty() {
        6
    } else if !r.params.is_empty() {
        5
    } else {
        4
    };
    write_head(w, MAJOR_ARRAY, len);
    encode_seg(w, &r.org);
    encode_seg(w, &r.model);
    write_int(w, r.obj_type.as_ari_type().code());
    encode_seg(w, &r.obj);
    if len >= 5 {
        write_head(w, MAJOR_ARRAY, r.params.len() as u64);
        for p in &r.params {
            encode_item(w, p);
        }
    }
    if len == 6 {
        write_head(w, MAJOR_MAP, r.named_params.len() as u64);
        for (name, val) in &r.named_params {
            write_text(w, name);
            encode_item(w, val);
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct Head {
    major: u8,
    arg: u64,
}

fn read_head(c: &mut Cursor<'_>) -> CodecResult<Head> {
    let offset = c.offset();
    let initial = c.read_u8()?;
    let major = initial >> 5;
    let info = initial & 0x1f;
    let arg = match info {
        0..=23 => u64::from(info),
        24 => {
            let v = u64::from(c.read_u8()?);
            if major == 7 && v < 32 {
                return Err(CodecError::Malformed {
                    offset,
                    reason: "reserved two-byte simple value".into(),
                });
            }
            if v < 24 && major != 7 {
                return Err(CodecError::NonCanonical {
                    offset,
                    reason: "1-byte argument fits in head",
                });
            }
            v
        }
        25 => {
            let v = u64::from(c.read_u16_be()?);
            if v <= u64::from(u8::MAX) {
                return Err(CodecError::NonCanonical {
                    offset,
                    reason: "2-byte argument fits in 1 byte",
                });
            }
            v
        }
        26 => {
            let v = u64::from(c.read_u32_be()?);
            if v <= u64::from(u16::MAX) {
                return Err(CodecError::NonCanonical {
                    offset,
                    reason: "4-byte argument fits in 2 bytes",
                });
            }
            v
        }
        27 => {
            if major == 7 {
                // float64 payload read by the caller
                return Ok(Head {
                    major,
                    arg: ARG_FLOAT64,
                });
            }
            let v = c.read_u64_be()?;
            if v <= u64::from(u32::MAX) {
                return Err(CodecError::NonCanonical {
                    offset,
                    reason: "8-byte argument fits in 4 bytes",
                });
            }
            v
        }
        _ => {
            return Err(CodecError::Malformed {
                offset,
                reason: "indefinite or reserved length".into(),
            })
        }
    };
    Ok(Head { major, arg })
}

fn arg_to_int(head: &Head, offset: usize) -> CodecResult<i64> {
    match head.major {
        MAJOR_UINT => i64::try_from(head.arg).map_err(|_| CodecError::Malformed {
            offset,
            reason: "integer out of range".into(),
        }),
        MAJOR_NINT => {
            if head.arg > i64::MAX as u64 {
                Err(CodecError::Malformed {
                    offset,
                    reason: "negative integer out of range".into(),
                })
            } else {
                Ok(-1 - head.arg as i64)
            }
        }
        _ => Err(CodecError::Malformed {
            offset,
            reason: "expected integer".into(),
        }),
    }
}

fn read_int(c: &mut Cursor<'_>) -> CodecResult<i64> {
    let offset = c.offset();
    let head = read_head(c)?;
    arg_to_int(&head, offset)
}

fn read_uint(c: &mut Cursor<'_>) -> CodecResult<u64> {
    let offset = c.offset();
    let head = read_head(c)?;
    if head.major != MAJOR_UINT {
        return Err(CodecError::Malformed {
            offset,
            reason: "expected unsigned integer".into(),
        });
    }
    Ok(head.arg)
}

fn read_text(c: &mut Cursor<'_>) -> CodecResult<String> {
    let offset = c.offset();
    let head = read_head(c)?;
    if head.major != MAJOR_TEXT {
        return Err(CodecError::Malformed {
            offset,
            reason: "expected text string".into(),
        });
    }
    let bytes = c.read_bytes(head.arg as usize)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::Malformed {
        offset,
        reason: "invalid UTF-8 in text string".into(),
    })
}

fn read_array_head(c: &mut Cursor<'_>) -> CodecResult<u64> {
    let offset = c.offset();
    let head = read_head(c)?;
    if head.major != MAJOR_ARRAY {
        return Err(CodecError::Malformed {
            offset,
            reason: "expected array".into(),
        });
    }
    Ok(head.arg)
}

fn read_timepair(c: &mut Cursor<'_>) -> CodecResult<(i64, u32)> {
    let offset = c.offset();
    let len = read_array_head(c)?;
    if len != 2 {
        return Err(CodecError::Malformed {
            offset,
            reason: "time value must be a 2-array".into(),
        });
    }
    let secs = read_int(c)?;
    let nanos = read_uint(c)?;
    let nanos = u32::try_from(nanos).map_err(|_| CodecError::Malformed {
        offset,
        reason: "nanoseconds out of range".into(),
    })?;
    Ok((secs, nanos))
}

fn decode_item(c: &mut Cursor<'_>) -> CodecResult<Ari> {
    let offset = c.offset();
    let head = read_head(c)?;
    match head.major {
        MAJOR_UINT => Ok(Ari::uint(head.arg)),
        MAJOR_NINT => Ok(Ari::Lit(Lit {
            typ: None,
            value: LitValue::Int(arg_to_int(&head, offset)?),
        })),
        MAJOR_BYTES => {
            let bytes = c.read_bytes(head.arg as usize)?;
            Ok(Ari::bytes(bytes.to_vec()))
        }
        MAJOR_TEXT => {
            let bytes = c.read_bytes(head.arg as usize)?;
            let text = String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::Malformed {
                offset,
                reason: "invalid UTF-8 in text string".into(),
            })?;
            Ok(Ari::text(text))
        }
        MAJOR_ARRAY => decode_framed(c, head.arg, offset),
        MAJOR_MAP => Err(CodecError::Malformed {
            offset,
            reason: "bare map outside AM framing".into(),
        }),
        7 => match head.arg {
            SIMPLE_FALSE => Ok(Ari::bool(false)),
            SIMPLE_TRUE => Ok(Ari::bool(true)),
            SIMPLE_NULL => Ok(Ari::null()),
            SIMPLE_UNDEFINED => Ok(Ari::undefined()),
            ARG_FLOAT64 => Ok(Ari::real(c.read_f64_be()?)),
            other => Err(CodecError::Malformed {
                offset,
                reason: format!("unsupported simple value {}", other),
            }),
        },
        _ => Err(CodecError::Malformed {
            offset,
            reason: "unsupported major type".into(),
        }),
    }
}

/// Arrays carry either a typed literal (2-array) or an object reference
/// (4..6-array).
fn decode_framed(c: &mut Cursor<'_>, len: u64, offset: usize) -> CodecResult<Ari> {
    match len {
        2 => {
            let code = read_int(c)?;
            let tag = AriType::from_code(code).ok_or_else(|| CodecError::Malformed {
                offset,
                reason: format!("unknown ARI type code {}", code),
            })?;
            let value = decode_payload(c, tag, offset)?;
            Ok(Ari::Lit(Lit {
                typ: Some(tag),
                value,
            }))
        }
        4..=6 => decode_objref(c, len, offset),
        other => Err(CodecError::Malformed {
            offset,
            reason: format!("array of length {} is not a valid framing", other),
        }),
    }
}

fn decode_payload(c: &mut Cursor<'_>, tag: AriType, offset: usize) -> CodecResult<LitValue> {
    match tag {
        AriType::Null => {
            let head = read_head(c)?;
            if head.major == 7 && head.arg == SIMPLE_NULL {
                Ok(LitValue::Null)
            } else {
                Err(CodecError::Malformed {
                    offset,
                    reason: "NULL tag requires null payload".into(),
                })
            }
        }
        AriType::Bool => {
            let head = read_head(c)?;
            match (head.major, head.arg) {
                (7, SIMPLE_FALSE) => Ok(LitValue::Bool(false)),
                (7, SIMPLE_TRUE) => Ok(LitValue::Bool(true)),
                _ => Err(CodecError::Malformed {
                    offset,
                    reason: "BOOL tag requires boolean payload".into(),
                }),
            }
        }
        AriType::Int | AriType::Vast => Ok(LitValue::Int(read_int(c)?)),
        AriType::Uint | AriType::Uvast => Ok(LitValue::Uint(read_uint(c)?)),
        AriType::Real32 | AriType::Real64 => {
            let head = read_head(c)?;
            if head.major == 7 && head.arg == ARG_FLOAT64 {
                Ok(LitValue::Real(Real(c.read_f64_be()?)))
            } else {
                Err(CodecError::Malformed {
                    offset,
                    reason: "REAL tag requires float payload".into(),
                })
            }
        }
        AriType::TextStr => Ok(LitValue::Text(read_text(c)?)),
        AriType::ByteStr | AriType::Cbor => {
            let head = read_head(c)?;
            if head.major != MAJOR_BYTES {
                return Err(CodecError::Malformed {
                    offset,
                    reason: "BYTESTR tag requires byte string payload".into(),
                });
            }
            Ok(LitValue::Bytes(c.read_bytes(head.arg as usize)?.to_vec()))
        }
        AriType::Label => Ok(LitValue::Label(read_text(c)?)),
        AriType::AriType => {
            let code = read_int(c)?;
            let t = AriType::from_code(code).ok_or_else(|| CodecError::Malformed {
                offset,
                reason: format!("unknown ARI type code {}", code),
            })?;
            Ok(LitValue::Type(t))
        }
        AriType::Tp => {
            let (secs, nanos) = read_timepair(c)?;
            Ok(LitValue::Tp(TimePoint::new(secs, i64::from(nanos))))
        }
        AriType::Td => {
            let (secs, nanos) = read_timepair(c)?;
            Ok(LitValue::Td(TimeDuration::new(secs, i64::from(nanos))))
        }
        AriType::Ac => {
            let len = read_array_head(c)?;
            let mut items = Vec::with_capacity(len.min(1024) as usize);
            for _ in 0..len {
                items.push(decode_item(c)?);
            }
            Ok(LitValue::Ac(items))
        }
        AriType::Am => {
            let head = read_head(c)?;
            if head.major != MAJOR_MAP {
                return Err(CodecError::Malformed {
                    offset,
                    reason: "AM tag requires map payload".into(),
                });
            }
            let mut map = BTreeMap::new();
            for _ in 0..head.arg {
                let key = decode_item(c)?;
                let val = decode_item(c)?;
                if map.insert(key, val).is_some() {
                    return Err(CodecError::Malformed {
                        offset,
                        reason: "duplicate AM key".into(),
                    });
                }
            }
            Ok(LitValue::Am(map))
        }
        AriType::Tbl => {
            let len = read_array_head(c)?;
            if len != 2 {
                return Err(CodecError::Malformed {
                    offset,
                    reason: "TBL payload must be [ncols, cells]".into(),
                });
            }
            let ncols = read_uint(c)? as usize;
            let cell_count = read_array_head(c)?;
            let mut cells = Vec::with_capacity(cell_count.min(1024) as usize);
            for _ in 0..cell_count {
                cells.push(decode_item(c)?);
            }
            Table::from_cells(ncols, cells)
                .map(LitValue::Tbl)
                .ok_or_else(|| CodecError::Malformed {
                    offset,
                    reason: "TBL cell count not a multiple of column count".into(),
                })
        }
        AriType::ExecSet => {
            let len = read_array_head(c)?;
            if len != 2 {
                return Err(CodecError::Malformed {
                    offset,
                    reason: "EXECSET payload must be [nonce, targets]".into(),
                });
            }
            let nonce = decode_item(c)?;
            let count = read_array_head(c)?;
            let mut targets = Vec::with_capacity(count.min(1024) as usize);
            for _ in 0..count {
                targets.push(decode_item(c)?);
            }
            Ok(LitValue::ExecSet(ExecSet {
                nonce: Box::new(nonce),
                targets,
            }))
        }
        AriType::RptSet => {
            let len = read_array_head(c)?;
            if len != 3 {
                return Err(CodecError::Malformed {
                    offset,
                    reason: "RPTSET payload must be [nonce, reftime, reports]".into(),
                });
            }
            let nonce = decode_item(c)?;
            let (secs, nanos) = read_timepair(c)?;
            let count = read_array_head(c)?;
            let mut reports = Vec::with_capacity(count.min(1024) as usize);
            for _ in 0..count {
                reports.push(decode_report(c)?);
            }
            Ok(LitValue::RptSet(RptSet {
                nonce: Box::new(nonce),
                reftime: TimePoint::new(secs, i64::from(nanos)),
                reports,
            }))
        }
        _ => Err(CodecError::Malformed {
            offset,
            reason: format!("object type {} cannot tag a literal", tag.name()),
        }),
    }
}

fn decode_report(c: &mut Cursor<'_>) -> CodecResult<Report> {
    let offset = c.offset();
    let len = read_array_head(c)?;
    if len != 3 {
        return Err(CodecError::Malformed {
            offset,
            reason: "report must be [reltime, source, items]".into(),
        });
    }
    let (secs, nanos) = read_timepair(c)?;
    let source = decode_item(c)?;
    let count = read_array_head(c)?;
    let mut items = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        items.push(decode_item(c)?);
    }
    Ok(Report {
        reltime: TimeDuration::new(secs, i64::from(nanos)),
        source,
        items,
    })
}

fn decode_seg(c: &mut Cursor<'_>) -> CodecResult<RefSeg> {
    let offset = c.offset();
    let head = read_head(c)?;
    match head.major {
        MAJOR_UINT | MAJOR_NINT => Ok(RefSeg::Int(arg_to_int(&head, offset)?)),
        MAJOR_TEXT => {
            let bytes = c.read_bytes(head.arg as usize)?;
            let text = String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::Malformed {
                offset,
                reason: "invalid UTF-8 in path segment".into(),
            })?;
            Ok(RefSeg::Name(text))
        }
        _ => Err(CodecError::Malformed {
            offset,
            reason: "path segment must be integer or text".into(),
        }),
    }
}

fn decode_objref(c: &mut Cursor<'_>, len: u64, offset: usize) -> CodecResult<Ari> {
    let org = decode_seg(c)?;
    let model = decode_seg(c)?;
    let code = read_int(c)?;
    let obj_type = AriType::from_code(code)
        .and_then(ObjType::from_ari_type)
        .ok_or_else(|| CodecError::Malformed {
            offset,
            reason: format!("reference type code {} is not an object type", code),
        })?;
    let obj = decode_seg(c)?;
    let mut r = ObjRef::new(org, model, obj_type, obj);
    if len >= 5 {
        let count = read_array_head(c)?;
        for _ in 0..count {
            r.params.push(decode_item(c)?);
        }
    }
    if len == 6 {
        let head = read_head(c)?;
        if head.major != MAJOR_MAP {
            return Err(CodecError::Malformed {
                offset,
                reason: "named parameters must be a map".into(),
            });
        }
        for _ in 0..head.arg {
            let name = read_text(c)?;
            let val = decode_item(c)?;
            if r.named_params.insert(name, val).is_some() {
                return Err(CodecError::Malformed {
                    offset,
                    reason: "duplicate named parameter".into(),
                });
            }
        }
    }
    Ok(Ari::Ref(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ari::TimeDuration;

    fn roundtrip(value: &Ari) {
        let bytes = encode(value);
        let (back, consumed) = decode(&bytes).expect("decode should succeed");
        assert_eq!(consumed, bytes.len(), "whole encoding consumed");
        assert_eq!(&back, value, "roundtrip identity for {:?}", value);
        // re-encoding the decoded value must be byte-identical
        assert_eq!(encode(&back), bytes, "deterministic re-encoding");
    }

    #[test]
    fn test_roundtrip_primitives() {
        roundtrip(&Ari::undefined());
        roundtrip(&Ari::null());
        roundtrip(&Ari::bool(true));
        roundtrip(&Ari::bool(false));
        roundtrip(&Ari::uint(0));
        roundtrip(&Ari::uint(23));
        roundtrip(&Ari::uint(24));
        roundtrip(&Ari::uint(u64::MAX));
        roundtrip(&Ari::int(-1));
        roundtrip(&Ari::int(-1_000_000));
        roundtrip(&Ari::real(0.0));
        roundtrip(&Ari::real(-2.5));
        roundtrip(&Ari::text(""));
        roundtrip(&Ari::text("hello agent"));
        roundtrip(&Ari::bytes(vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn test_roundtrip_tagged_literals() {
        roundtrip(&Ari::typed(AriType::Int, LitValue::Int(42)));
        roundtrip(&Ari::typed(AriType::Uvast, LitValue::Uint(7)));
        roundtrip(&Ari::label("severity"));
        roundtrip(&Ari::aritype(AriType::Ctrl));
        roundtrip(&Ari::td(TimeDuration::from_millis(1500)));
        roundtrip(&Ari::td(TimeDuration::from_millis(-100)));
        roundtrip(&Ari::tp(TimePoint::new(1234, 500_000_000)));
    }

    #[test]
    fn test_roundtrip_structured() {
        roundtrip(&Ari::ac(vec![]));
        roundtrip(&Ari::ac(vec![
            Ari::uint(1),
            Ari::text("x"),
            Ari::ac(vec![Ari::bool(false)]),
        ]));

        let mut map = BTreeMap::new();
        map.insert(Ari::text("k"), Ari::uint(9));
        map.insert(Ari::uint(2), Ari::null());
        roundtrip(&Ari::am(map));

        let mut table = Table::new(2);
        table.push_row(vec![Ari::uint(1), Ari::text("a")]);
        table.push_row(vec![Ari::uint(2), Ari::text("b")]);
        roundtrip(&Ari::tbl(table));
    }

    #[test]
    fn test_roundtrip_execset_rptset() {
        let execset = Ari::execset(
            Ari::uint(7),
            vec![Ari::objref(ObjRef::with_enums(1, 1, ObjType::Ctrl, 4))],
        );
        roundtrip(&execset);

        let rptset = Ari::rptset(
            Ari::uint(7),
            TimePoint::new(1000, 0),
            vec![Report {
                reltime: TimeDuration::ZERO,
                source: Ari::objref(ObjRef::with_enums(1, 1, ObjType::Edd, 2)),
                items: vec![Ari::text("JHU/APL")],
            }],
        );
        roundtrip(&rptset);
    }

    #[test]
    fn test_roundtrip_objref_forms() {
        roundtrip(&Ari::objref(ObjRef::with_enums(1, 0, ObjType::Edd, 3)));
        roundtrip(&Ari::objref(ObjRef::with_names(
            "ietf",
            "dtnma-agent",
            ObjType::Ctrl,
            "inspect",
        )));
        roundtrip(&Ari::objref(
            ObjRef::with_enums(1, 1, ObjType::Ctrl, 4).with_params(vec![Ari::uint(10)]),
        ));
        roundtrip(&Ari::objref(
            ObjRef::with_enums(1, 1, ObjType::Ctrl, 4)
                .with_params(vec![Ari::uint(10)])
                .with_named_param("flag", Ari::bool(true)),
        ));
        // ODM model ids are negative
        roundtrip(&Ari::objref(ObjRef::with_enums(65535, -5, ObjType::Var, 1)));
    }

    #[test]
    fn test_decode_rejects_non_shortest_int() {
        // 5 encoded with a 1-byte argument instead of in the head
        let err = decode(&[0x18, 0x05]).unwrap_err();
        assert!(matches!(err, CodecError::NonCanonical { .. }));
    }

    #[test]
    fn test_decode_rejects_truncation() {
        let bytes = encode(&Ari::text("hello"));
        let err = decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEnd { .. }));
    }

    #[test]
    fn test_decode_rejects_bad_framing() {
        // 3-element array is neither a typed literal nor a reference
        let err = decode(&[0x83, 0x01, 0x02, 0x03]).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn test_decode_reports_consumed_prefix() {
        let mut bytes = encode(&Ari::uint(5));
        let first_len = bytes.len();
        bytes.extend_from_slice(&encode(&Ari::text("next")));
        let (value, consumed) = decode(&bytes).expect("decode prefix");
        assert_eq!(value, Ari::uint(5));
        assert_eq!(consumed, first_len);
    }

    #[test]
    fn test_list_roundtrip_preserves_order() {
        let values = vec![
            Ari::uint(1),
            Ari::execset(Ari::null(), vec![Ari::ac(vec![])]),
            Ari::text("tail"),
        ];
        let bytes = encode_list(&values);
        let back = decode_list(&bytes).expect("decode list");
        assert_eq!(back, values);
    }

    #[test]
    fn test_roundtrip_random_integers() {
        for _ in 0..256 {
            let bits = fastrand::u64(..);
            roundtrip(&Ari::uint(bits));
            roundtrip(&Ari::int(bits as i64));
        }
    }

    #[test]
    fn test_am_key_order_is_stable() {
        let mut forward = BTreeMap::new();
        forward.insert(Ari::uint(1), Ari::text("a"));
        forward.insert(Ari::uint(2), Ari::text("b"));
        let mut reverse = BTreeMap::new();
        reverse.insert(Ari::uint(2), Ari::text("b"));
        reverse.insert(Ari::uint(1), Ari::text("a"));
        assert_eq!(encode(&Ari::am(forward)), encode(&Ari::am(reverse)));
    }
}
