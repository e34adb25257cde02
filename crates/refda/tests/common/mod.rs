// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared harness: an agent with the builtin ADMs plus an example ADM of
//! scripted controls, wired to an in-memory manager link.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use refda::adm::{alarms as alarms_adm, IETF_ORG_ENUM};
use refda::amm::{
    CtrlData, CtrlExecutor, IdSeg, IdentData, ObjData, ObjDesc, SemType, VarData,
};
use refda::ari::{Ari, AriType, ObjRef, ObjType, RptSet};
use refda::transport::{MemTransport, MgrLink};
use refda::Agent;

pub const EX_ORG_ENUM: i64 = 65535;
pub const EX_MODEL_ENUM: i64 = 10;

pub const CTRL_A: i64 = 1;
pub const CTRL_B_FAILS: i64 = 2;
pub const CTRL_C: i64 = 3;
pub const CTRL_NOTIFY: i64 = 4;
pub const VAR_FLAG: i64 = 5;
pub const IDENT_RES1: i64 = 6;
pub const IDENT_RES2: i64 = 7;
pub const IDENT_CAT1: i64 = 8;

pub struct Harness {
    pub agent: Agent,
    pub mgr: MgrLink,
    /// Names of example CTRLs in invocation order.
    pub calls: Arc<Mutex<Vec<String>>>,
}

pub fn ex_ref(obj_type: ObjType, obj: i64) -> Ari {
    Ari::objref(ObjRef::with_enums(EX_ORG_ENUM, EX_MODEL_ENUM, obj_type, obj))
}

pub fn agent_ref(obj_type: ObjType, obj: i64) -> Ari {
    Ari::objref(ObjRef::with_enums(
        IETF_ORG_ENUM,
        refda::adm::dtnma_agent::MODEL_ENUM,
        obj_type,
        obj,
    ))
}

/// Build, register, bind, and start an agent over a memory pair.
pub fn setup() -> Harness {
    let mut agent = Agent::new();
    agent.register_builtins().expect("builtin registration");

    let calls: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let mut store = agent.core().store.write();
        let ns = store
            .add_namespace(
                IdSeg::with_enum("example", EX_ORG_ENUM),
                IdSeg::with_enum("adm", EX_MODEL_ENUM),
                "2025-01-03",
            )
            .expect("example namespace");

        let mut scripted = |name: &'static str, obj_enum: i64, succeed: bool| {
            let log = calls.clone();
            ns.register(
                ObjType::Ctrl,
                ObjDesc::new(
                    IdSeg::with_enum(name, obj_enum),
                    ObjData::Ctrl(CtrlData {
                        result_typ: Some(SemType::Builtin(AriType::TextStr)),
                        execute: CtrlExecutor::new(move |ctx| {
                            log.lock().expect("calls lock").push(name.to_string());
                            if succeed {
                                ctx.set_result(Ari::text(name));
                            }
                            // leaving the result unset is a failure
                        }),
                    }),
                ),
            )
            .expect("register scripted ctrl");
        };
        scripted("a", CTRL_A, true);
        scripted("b-fails", CTRL_B_FAILS, false);
        scripted("c", CTRL_C, true);
        scripted("notify", CTRL_NOTIFY, true);

        ns.register(
            ObjType::Var,
            ObjDesc::new(
                IdSeg::with_enum("flag", VAR_FLAG),
                ObjData::Var(VarData::new(
                    SemType::Builtin(AriType::Bool),
                    Ari::bool(false),
                )),
            ),
        )
        .expect("register flag var");

        let alarm_ident = |obj: i64| {
            Ari::objref(ObjRef::with_enums(
                IETF_ORG_ENUM,
                alarms_adm::MODEL_ENUM,
                ObjType::Ident,
                obj,
            ))
        };
        let mut ident = |name: &str, obj_enum: i64, base: i64| {
            ns.register(
                ObjType::Ident,
                ObjDesc::new(
                    IdSeg::with_enum(name, obj_enum),
                    ObjData::Ident(IdentData {
                        bases: vec![alarm_ident(base)],
                    }),
                ),
            )
            .expect("register ident");
        };
        ident("res1", IDENT_RES1, alarms_adm::IDENT_RESOURCE);
        ident("res2", IDENT_RES2, alarms_adm::IDENT_RESOURCE);
        ident("cat1", IDENT_CAT1, alarms_adm::IDENT_CATEGORY);
    }

    agent.bindrefs().expect("bindrefs");

    let (transport, mgr) = MemTransport::pair();
    agent.start(transport).expect("agent start");

    Harness { agent, mgr, calls }
}

impl Harness {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Collect RPTSETs from the manager link until `count` arrive or the
    /// deadline passes.
    pub fn recv_rptsets(&self, count: usize, deadline: Duration) -> Vec<RptSet> {
        let mut out = Vec::new();
        let start = std::time::Instant::now();
        while out.len() < count && start.elapsed() < deadline {
            if let Some((values, _dest)) = self.mgr.recv_timeout(Duration::from_millis(50)) {
                for value in values {
                    if let Some(rptset) = value.as_rptset() {
                        out.push(rptset.clone());
                    }
                }
            }
        }
        out
    }

    /// True when no further RPTSET arrives within the window.
    pub fn assert_no_rptset(&self, window: Duration) {
        let start = std::time::Instant::now();
        while start.elapsed() < window {
            if let Some((values, _)) = self.mgr.recv_timeout(Duration::from_millis(20)) {
                let rpt: Vec<_> = values.iter().filter(|v| v.as_rptset().is_some()).collect();
                assert!(rpt.is_empty(), "unexpected RPTSET arrived: {:?}", rpt);
            }
        }
    }

    pub fn set_flag(&self, value: bool) {
        let mut store = self.agent.core().store.write();
        let ns = store
            .find_namespace_mut(
                &refda::RefSeg::Int(EX_ORG_ENUM),
                &refda::RefSeg::Int(EX_MODEL_ENUM),
            )
            .expect("example namespace");
        let desc = ns
            .find_object_mut(ObjType::Var, &refda::RefSeg::Int(VAR_FLAG))
            .expect("flag var");
        if let ObjData::Var(var) = &mut desc.data {
            var.value = Ari::bool(value);
        }
    }
}
