// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! URI-like text form for ARI values (`ari:` scheme).
//!
//! The text form is informational: it backs `Display`, log lines, and the
//! hex-line socket framing's diagnostics. It is not part of the protocol
//! path and round-trips only the grammar subset below:
//!
//! ```text
//! ari:undefined | ari:null | ari:true | ari:false
//! ari:42 | ari:-7 | ari:1.5 | ari:"text" | ari:h'6869'
//! ari:/INT/-4  /TD/PT1.5S  /LABEL/name  /AC/(a,b)  /AM/(k=v)
//! ari:/TBL/(2;a,b,c,d)  /EXECSET/(n;t1,t2)
//! ari://org/model/TYPE/obj(p1,p2)
//! ```

use std::collections::BTreeMap;

use crate::ari::{
    Ari, AriType, ExecSet, Lit, LitValue, ObjRef, ObjType, Real, RefSeg, Report, RptSet, Table,
    TimeDuration, TimePoint,
};

/// Render a value in `ari:` text form.
pub fn encode(value: &Ari) -> String {
    let mut out = String::from("ari:");
    write_item(&mut out, value);
    out
}

fn write_item(out: &mut String, value: &Ari) {
    match value {
        Ari::Lit(lit) => write_lit(out, lit),
        Ari::Ref(r) => write_ref(out, r),
    }
}

fn write_lit(out: &mut String, lit: &Lit) {
    match lit.typ {
        None => write_prim(out, &lit.value),
        Some(tag) => {
            out.push('/');
            out.push_str(tag.name());
            out.push('/');
            write_payload(out, &lit.value);
        }
    }
}

fn write_prim(out: &mut String, value: &LitValue) {
    match value {
        LitValue::Undefined => out.push_str("undefined"),
        LitValue::Null => out.push_str("null"),
        LitValue::Bool(true) => out.push_str("true"),
        LitValue::Bool(false) => out.push_str("false"),
        LitValue::Int(v) => out.push_str(&v.to_string()),
        LitValue::Uint(v) => out.push_str(&v.to_string()),
        LitValue::Real(Real(v)) => {
            let text = format!("{}", v);
            out.push_str(&text);
            // keep reals visually distinct from ints
            if !text.contains(['.', 'e', 'E', 'n', 'N', 'i']) {
                out.push_str(".0");
            }
        }
        LitValue::Text(v) => {
            out.push('"');
            for ch in v.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    other => out.push(other),
                }
            }
            out.push('"');
        }
        LitValue::Bytes(v) => {
            out.push_str("h'");
            out.push_str(&hex::encode(v));
            out.push('\'');
        }
        other => write_payload(out, other),
    }
}

fn write_payload(out: &mut String, value: &LitValue) {
    match value {
        LitValue::Label(v) => out.push_str(v),
        LitValue::Type(t) => out.push_str(t.name()),
        LitValue::Td(td) => out.push_str(&td.to_string()),
        LitValue::Tp(tp) => out.push_str(&tp.to_string()),
        LitValue::Ac(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_item(out, item);
            }
            out.push(')');
        }
        LitValue::Am(map) => {
            out.push('(');
            for (i, (key, val)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_item(out, key);
                out.push('=');
                write_item(out, val);
            }
            out.push(')');
        }
        LitValue::Tbl(table) => {
            out.push('(');
            out.push_str(&table.ncols().to_string());
            out.push(';');
            for (i, cell) in table.cells().iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_item(out, cell);
            }
            out.push(')');
        }
        LitValue::ExecSet(es) => {
            out.push('(');
            write_item(out, &es.nonce);
            out.push(';');
            for (i, target) in es.targets.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_item(out, target);
            }
            out.push(')');
        }
        LitValue::RptSet(rs) => {
            out.push('(');
            write_item(out, &rs.nonce);
            out.push(';');
            out.push_str(&rs.reftime.to_string());
            out.push(';');
            for (i, report) in rs.reports.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_report(out, report);
            }
            out.push(')');
        }
        other => write_prim(out, other),
    }
}

fn write_report(out: &mut String, report: &Report) {
    out.push('[');
    out.push_str(&report.reltime.to_string());
    out.push(';');
    write_item(out, &report.source);
    out.push(';');
    out.push('(');
    for (i, item) in report.items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_item(out, item);
    }
    out.push(')');
    out.push(']');
}

fn write_ref(out: &mut String, r: &ObjRef) {
    out.push_str("//");
    out.push_str(&r.org.to_string());
    out.push('/');
    out.push_str(&r.model.to_string());
    out.push('/');
    out.push_str(r.obj_type.as_ari_type().name());
    out.push('/');
    out.push_str(&r.obj.to_string());
    if !r.params.is_empty() || !r.named_params.is_empty() {
        out.push('(');
        let mut first = true;
        for p in &r.params {
            if !first {
                out.push(',');
            }
            first = false;
            write_item(out, p);
        }
        for (name, val) in &r.named_params {
            if !first {
                out.push(',');
            }
            first = false;
            out.push_str(name);
            out.push('=');
            write_item(out, val);
        }
        out.push(')');
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse the `ari:` text form (the `ari:` prefix is optional).
pub fn parse(text: &str) -> Option<Ari> {
    let rest = text.strip_prefix("ari:").unwrap_or(text);
    let mut p = Parser {
        chars: rest.char_indices().collect(),
        pos: 0,
    };
    let value = p.parse_item()?;
    if p.pos != p.chars.len() {
        return None;
    }
    Some(value)
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> Option<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    fn parse_item(&mut self) -> Option<Ari> {
        match self.peek()? {
            '/' => {
                self.bump();
                if self.peek() == Some('/') {
                    self.bump();
                    self.parse_ref()
                } else {
                    self.parse_tagged()
                }
            }
            '"' => self.parse_text().map(Ari::text),
            'h' if self.chars.get(self.pos + 1).map(|(_, c)| *c) == Some('\'') => {
                self.parse_bytes()
            }
            _ => self.parse_bare(),
        }
    }

    fn take_token(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '!') {
                token.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        token
    }

    fn parse_bare(&mut self) -> Option<Ari> {
        let token = self.take_token();
        match token.as_str() {
            "" => None,
            "undefined" => Some(Ari::undefined()),
            "null" => Some(Ari::null()),
            "true" => Some(Ari::bool(true)),
            "false" => Some(Ari::bool(false)),
            _ => {
                if let Ok(v) = token.parse::<u64>() {
                    Some(Ari::uint(v))
                } else if let Ok(v) = token.parse::<i64>() {
                    Some(Ari::int(v))
                } else if let Ok(v) = token.parse::<f64>() {
                    Some(Ari::real(v))
                } else {
                    None
                }
            }
        }
    }

    fn parse_text(&mut self) -> Option<String> {
        self.eat('"')?;
        let mut text = String::new();
        loop {
            match self.bump()? {
                '"' => return Some(text),
                '\\' => match self.bump()? {
                    'n' => text.push('\n'),
                    other => text.push(other),
                },
                other => text.push(other),
            }
        }
    }

    fn parse_bytes(&mut self) -> Option<Ari> {
        self.eat('h')?;
        self.eat('\'')?;
        let mut digits = String::new();
        loop {
            match self.bump()? {
                '\'' => break,
                c => digits.push(c),
            }
        }
        hex::decode(&digits).ok().map(Ari::bytes)
    }

    fn parse_tagged(&mut self) -> Option<Ari> {
        let name = self.take_token();
        let tag = AriType::from_name(&name)?;
        self.eat('/')?;
        let value = self.parse_tag_payload(tag)?;
        Some(Ari::Lit(Lit {
            typ: Some(tag),
            value,
        }))
    }

    fn parse_tag_payload(&mut self, tag: AriType) -> Option<LitValue> {
        match tag {
            AriType::Label => Some(LitValue::Label(self.take_token())),
            AriType::AriType => AriType::from_name(&self.take_token()).map(LitValue::Type),
            AriType::Td => TimeDuration::parse(&self.take_token()).map(LitValue::Td),
            AriType::Tp => {
                let token = self.take_token();
                if let Some((whole, frac)) = token.split_once('.') {
                    let secs = whole.parse::<i64>().ok()?;
                    let mut digits = frac.to_string();
                    while digits.len() < 9 {
                        digits.push('0');
                    }
                    let nanos = digits[..9].parse::<i64>().ok()?;
                    Some(LitValue::Tp(TimePoint::new(secs, nanos)))
                } else {
                    Some(LitValue::Tp(TimePoint::new(token.parse().ok()?, 0)))
                }
            }
            AriType::Ac => {
                let items = self.parse_list()?;
                Some(LitValue::Ac(items))
            }
            AriType::Am => {
                self.eat('(')?;
                let mut map = BTreeMap::new();
                if self.peek() == Some(')') {
                    self.bump();
                    return Some(LitValue::Am(map));
                }
                loop {
                    let key = self.parse_item()?;
                    self.eat('=')?;
                    let val = self.parse_item()?;
                    map.insert(key, val);
                    match self.bump()? {
                        ',' => continue,
                        ')' => break,
                        _ => return None,
                    }
                }
                Some(LitValue::Am(map))
            }
            AriType::Tbl => {
                self.eat('(')?;
                let ncols = self.take_token().parse::<usize>().ok()?;
                self.eat(';')?;
                let mut cells = Vec::new();
                if self.peek() == Some(')') {
                    self.bump();
                } else {
                    loop {
                        cells.push(self.parse_item()?);
                        match self.bump()? {
                            ',' => continue,
                            ')' => break,
                            _ => return None,
                        }
                    }
                }
                Table::from_cells(ncols, cells).map(LitValue::Tbl)
            }
            AriType::ExecSet => {
                self.eat('(')?;
                let nonce = self.parse_item()?;
                self.eat(';')?;
                let mut targets = Vec::new();
                if self.peek() == Some(')') {
                    self.bump();
                } else {
                    loop {
                        targets.push(self.parse_item()?);
                        match self.bump()? {
                            ',' => continue,
                            ')' => break,
                            _ => return None,
                        }
                    }
                }
                Some(LitValue::ExecSet(ExecSet {
                    nonce: Box::new(nonce),
                    targets,
                }))
            }
            AriType::RptSet => {
                // reports are written for logs, parsed rarely; accept the
                // nonce and reference time and an empty report list
                self.eat('(')?;
                let nonce = self.parse_item()?;
                self.eat(';')?;
                let secs = self.take_token().parse::<i64>().ok()?;
                self.eat(';')?;
                while self.peek() != Some(')') {
                    self.bump()?;
                }
                self.eat(')')?;
                Some(LitValue::RptSet(RptSet {
                    nonce: Box::new(nonce),
                    reftime: TimePoint::new(secs, 0),
                    reports: Vec::new(),
                }))
            }
            _ => {
                let token = self.take_token();
                match tag {
                    AriType::Null if token == "null" => Some(LitValue::Null),
                    AriType::Bool if token == "true" => Some(LitValue::Bool(true)),
                    AriType::Bool if token == "false" => Some(LitValue::Bool(false)),
                    AriType::Int | AriType::Vast => token.parse().ok().map(LitValue::Int),
                    AriType::Uint | AriType::Uvast => token.parse().ok().map(LitValue::Uint),
                    AriType::Real32 | AriType::Real64 => {
                        token.parse().ok().map(|v| LitValue::Real(Real(v)))
                    }
                    AriType::TextStr => {
                        // back up: TEXTSTR payload is quoted
                        None
                    }
                    _ => None,
                }
            }
        }
    }

    fn parse_list(&mut self) -> Option<Vec<Ari>> {
        self.eat('(')?;
        let mut items = Vec::new();
        if self.peek() == Some(')') {
            self.bump();
            return Some(items);
        }
        loop {
            items.push(self.parse_item()?);
            match self.bump()? {
                ',' => continue,
                ')' => break,
                _ => return None,
            }
        }
        Some(items)
    }

    fn parse_ref(&mut self) -> Option<Ari> {
        let org = self.parse_seg()?;
        self.eat('/')?;
        let model = self.parse_seg()?;
        self.eat('/')?;
        let type_name = self.take_token();
        let obj_type = AriType::from_name(&type_name).and_then(ObjType::from_ari_type)?;
        self.eat('/')?;
        let obj = self.parse_seg()?;
        let mut r = ObjRef::new(org, model, obj_type, obj);
        if self.peek() == Some('(') {
            self.bump();
            if self.peek() == Some(')') {
                self.bump();
                return Some(Ari::Ref(r));
            }
            loop {
                // named parameters are `name=value`; look ahead for '='
                let mark = self.pos;
                let token = self.take_token();
                if !token.is_empty() && self.peek() == Some('=') {
                    self.bump();
                    let val = self.parse_item()?;
                    r.named_params.insert(token, val);
                } else {
                    self.pos = mark;
                    r.params.push(self.parse_item()?);
                }
                match self.bump()? {
                    ',' => continue,
                    ')' => break,
                    _ => return None,
                }
            }
        }
        Some(Ari::Ref(r))
    }

    fn parse_seg(&mut self) -> Option<RefSeg> {
        let token = self.take_token();
        if token.is_empty() {
            return None;
        }
        match token.parse::<i64>() {
            Ok(v) => Some(RefSeg::Int(v)),
            Err(_) => Some(RefSeg::Name(token)),
        }
    }
}
