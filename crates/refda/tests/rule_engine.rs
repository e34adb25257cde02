// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rule engine timing: TBR cadence with max-count self-disable, and SBR
//! condition polling. Intervals are generous to keep the assertions stable
//! on loaded machines.

mod common;

use std::time::Duration;

use common::{agent_ref, ex_ref, Harness};
use refda::adm::dtnma_agent;
use refda::amm::{IdSeg, ObjData, ObjDesc, SbrData, TbrData};
use refda::ari::{Ari, ObjType, RefSeg, TimeDuration, TimePoint};

const TBR_RULE: i64 = 20;
const SBR_RULE: i64 = 21;

fn register_tbr(h: &Harness, period_ms: i64, max_count: u64) {
    let mut store = h.agent.core().store.write();
    let ns = store
        .find_namespace_mut(
            &RefSeg::Int(common::EX_ORG_ENUM),
            &RefSeg::Int(common::EX_MODEL_ENUM),
        )
        .expect("example namespace");
    ns.register(
        ObjType::Tbr,
        ObjDesc::new(
            IdSeg::with_enum("tick", TBR_RULE),
            ObjData::Tbr(TbrData {
                action: Ari::ac(vec![ex_ref(ObjType::Ctrl, common::CTRL_NOTIFY)]),
                start_time: Ari::td(TimeDuration::ZERO),
                period: TimeDuration::from_millis(period_ms),
                max_exec_count: max_count,
                init_enabled: false,
                enabled: false,
                exec_count: 0,
                absolute_start: TimePoint::now(),
            }),
        ),
    )
    .expect("register tbr");
}

fn register_sbr(h: &Harness, min_interval_ms: i64) {
    let condition = Ari::ac(vec![
        ex_ref(ObjType::Var, common::VAR_FLAG),
        Ari::bool(true),
        agent_ref(ObjType::Oper, dtnma_agent::OPER_COMPARE_EQ),
    ]);
    let mut store = h.agent.core().store.write();
    let ns = store
        .find_namespace_mut(
            &RefSeg::Int(common::EX_ORG_ENUM),
            &RefSeg::Int(common::EX_MODEL_ENUM),
        )
        .expect("example namespace");
    ns.register(
        ObjType::Sbr,
        ObjDesc::new(
            IdSeg::with_enum("watch", SBR_RULE),
            ObjData::Sbr(SbrData {
                action: Ari::ac(vec![ex_ref(ObjType::Ctrl, common::CTRL_NOTIFY)]),
                condition,
                min_interval: TimeDuration::from_millis(min_interval_ms),
                max_exec_count: 0,
                init_enabled: false,
                enabled: false,
                exec_count: 0,
            }),
        ),
    )
    .expect("register sbr");
}

fn enable_rule(h: &Harness, obj_type: ObjType, ctrl: i64, rule: i64) {
    let mut r = agent_ref(ObjType::Ctrl, ctrl)
        .as_ref_path()
        .cloned()
        .expect("ref");
    r.params = vec![ex_ref(obj_type, rule)];
    let status = h.agent.exec_target(Ari::objref(r));
    assert!(status.wait_finished(Duration::from_secs(2)), "enable ctrl");
    assert!(!status.is_failed(), "enable ctrl failed");
}

fn notify_count(h: &Harness) -> usize {
    h.calls().iter().filter(|c| *c == "notify").count()
}

fn rule_enabled(h: &Harness, obj_type: ObjType, rule: i64) -> bool {
    let store = h.agent.core().store.read();
    let ns = store
        .find_namespace(
            &RefSeg::Int(common::EX_ORG_ENUM),
            &RefSeg::Int(common::EX_MODEL_ENUM),
        )
        .expect("example namespace");
    let desc = ns.find_object(obj_type, &RefSeg::Int(rule)).expect("rule");
    match &desc.data {
        ObjData::Tbr(t) => t.enabled,
        ObjData::Sbr(s) => s.enabled,
        _ => panic!("not a rule"),
    }
}

#[test]
fn test_p15_s5_tbr_runs_to_max_count_then_disables() {
    let mut h = common::setup();
    register_tbr(&h, 100, 3);
    enable_rule(&h, ObjType::Tbr, dtnma_agent::CTRL_TBR_ENABLE, TBR_RULE);

    // three firings at ~0, ~100, ~200 ms, then self-disable
    std::thread::sleep(Duration::from_millis(650));
    assert_eq!(notify_count(&h), 3, "action runs exactly max-count times");
    assert!(
        !rule_enabled(&h, ObjType::Tbr, TBR_RULE),
        "rule disables itself at max count"
    );

    // no further firings remain scheduled
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(notify_count(&h), 3);

    h.agent.stop().expect("stop");
}

#[test]
fn test_tbr_disable_ctrl_stops_firing() {
    let mut h = common::setup();
    register_tbr(&h, 100, 0);
    enable_rule(&h, ObjType::Tbr, dtnma_agent::CTRL_TBR_ENABLE, TBR_RULE);

    std::thread::sleep(Duration::from_millis(250));
    assert!(notify_count(&h) >= 2);

    enable_rule(&h, ObjType::Tbr, dtnma_agent::CTRL_TBR_DISABLE, TBR_RULE);
    let after_disable = notify_count(&h);
    std::thread::sleep(Duration::from_millis(300));
    assert!(
        notify_count(&h) <= after_disable + 1,
        "at most one in-flight firing after disable"
    );

    h.agent.stop().expect("stop");
}

#[test]
fn test_p16_s4_sbr_fires_on_condition_transition() {
    let mut h = common::setup();
    register_sbr(&h, 100);
    enable_rule(&h, ObjType::Sbr, dtnma_agent::CTRL_SBR_ENABLE, SBR_RULE);

    // condition is false: polls happen but the action never runs
    std::thread::sleep(Duration::from_millis(350));
    assert_eq!(notify_count(&h), 0, "no firing while the condition is false");

    // flip the condition; the action runs within one polling interval
    h.set_flag(true);
    let flip = std::time::Instant::now();
    loop {
        if notify_count(&h) >= 1 {
            break;
        }
        assert!(
            flip.elapsed() < Duration::from_millis(400),
            "SBR did not fire within a polling interval of the transition"
        );
        std::thread::sleep(Duration::from_millis(10));
    }

    // once per tick while the condition holds
    std::thread::sleep(Duration::from_millis(450));
    let while_true = notify_count(&h);
    assert!(
        (2..=8).contains(&while_true),
        "expected roughly one firing per interval, got {}",
        while_true
    );

    // condition returns false: firing stops
    h.set_flag(false);
    std::thread::sleep(Duration::from_millis(150));
    let after_false = notify_count(&h);
    std::thread::sleep(Duration::from_millis(350));
    assert!(
        notify_count(&h) <= after_false,
        "no further firings after the condition went false"
    );

    h.agent.stop().expect("stop");
}

#[test]
fn test_sbr_enable_validates_condition_shape() {
    let mut h = common::setup();
    {
        let mut store = h.agent.core().store.write();
        let ns = store
            .find_namespace_mut(
                &RefSeg::Int(common::EX_ORG_ENUM),
                &RefSeg::Int(common::EX_MODEL_ENUM),
            )
            .expect("example namespace");
        ns.register(
            ObjType::Sbr,
            ObjDesc::new(
                IdSeg::with_enum("broken", SBR_RULE + 1),
                ObjData::Sbr(SbrData {
                    action: Ari::ac(vec![]),
                    // not an AC: enable must refuse the rule
                    condition: Ari::uint(1),
                    min_interval: TimeDuration::from_millis(100),
                    max_exec_count: 0,
                    init_enabled: false,
                    enabled: false,
                    exec_count: 0,
                }),
            ),
        )
        .expect("register sbr");
    }

    let mut r = agent_ref(ObjType::Ctrl, dtnma_agent::CTRL_SBR_ENABLE)
        .as_ref_path()
        .cloned()
        .expect("ref");
    r.params = vec![ex_ref(ObjType::Sbr, SBR_RULE + 1)];
    let status = h.agent.exec_target(Ari::objref(r));
    assert!(status.wait_finished(Duration::from_secs(2)));
    assert!(status.is_failed(), "enabling a malformed SBR is a failure");

    h.agent.stop().expect("stop");
}
