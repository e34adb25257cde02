// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end execution engine scenarios driven through the in-memory
//! transport: echo, ordered macro reports, failure halting, waits, and
//! branching.

mod common;

use std::time::Duration;

use common::{agent_ref, ex_ref};
use refda::adm::dtnma_agent;
use refda::ari::{Ari, ObjType, TimeDuration, TimePoint};

fn inspect_of(target: Ari) -> Ari {
    let mut r = agent_ref(ObjType::Ctrl, dtnma_agent::CTRL_INSPECT)
        .as_ref_path()
        .cloned()
        .expect("ref");
    r.params = vec![target];
    Ari::objref(r)
}

#[test]
fn test_s1_echo_inspect_sw_vendor() {
    let mut h = common::setup();

    let target = inspect_of(agent_ref(ObjType::Edd, dtnma_agent::EDD_SW_VENDOR));
    h.mgr
        .send_values(&[Ari::execset(Ari::uint(1), vec![target.clone()])])
        .expect("send execset");

    let rptsets = h.recv_rptsets(1, Duration::from_secs(2));
    assert_eq!(rptsets.len(), 1);
    let rptset = &rptsets[0];
    assert_eq!(*rptset.nonce, Ari::uint(1));
    assert_eq!(rptset.reports.len(), 1);
    let report = &rptset.reports[0];
    assert_eq!(report.source, target);
    assert_eq!(report.items, vec![Ari::text("JHU/APL")]);

    h.agent.stop().expect("stop");
}

#[test]
fn test_p11_macro_success_reports_in_order() {
    let mut h = common::setup();

    let targets = [
        ex_ref(ObjType::Ctrl, common::CTRL_A),
        ex_ref(ObjType::Ctrl, common::CTRL_C),
        ex_ref(ObjType::Ctrl, common::CTRL_NOTIFY),
    ];
    let mac = Ari::ac(targets.to_vec());
    h.mgr
        .send_values(&[Ari::execset(Ari::uint(7), vec![mac])])
        .expect("send execset");

    let rptsets = h.recv_rptsets(3, Duration::from_secs(2));
    assert_eq!(rptsets.len(), 3, "exactly one ctrl-report per CTRL");
    for (rptset, target) in rptsets.iter().zip(&targets) {
        assert_eq!(*rptset.nonce, Ari::uint(7));
        assert_eq!(rptset.reports.len(), 1);
        assert_eq!(&rptset.reports[0].source, target);
        assert_eq!(rptset.reports[0].reltime, TimeDuration::ZERO);
    }
    assert_eq!(h.calls(), vec!["a", "c", "notify"]);

    h.agent.stop().expect("stop");
}

#[test]
fn test_p12_s2_macro_failure_halts_sequence() {
    let mut h = common::setup();

    let mac = Ari::ac(vec![
        ex_ref(ObjType::Ctrl, common::CTRL_A),
        ex_ref(ObjType::Ctrl, common::CTRL_B_FAILS),
        ex_ref(ObjType::Ctrl, common::CTRL_C),
    ]);
    let status = h
        .agent
        .exec_target_for(h.mgr.endpoint.clone(), Ari::uint(9), mac);

    assert!(
        status.wait_finished(Duration::from_secs(2)),
        "sequence should finish"
    );
    assert!(status.is_failed(), "sequence status must be failed");

    let rptsets = h.recv_rptsets(2, Duration::from_secs(2));
    assert_eq!(rptsets.len(), 2, "reports for a and for the failure only");
    assert_eq!(
        rptsets[0].reports[0].source,
        ex_ref(ObjType::Ctrl, common::CTRL_A)
    );
    assert_eq!(
        rptsets[1].reports[0].source,
        ex_ref(ObjType::Ctrl, common::CTRL_B_FAILS)
    );
    assert!(
        rptsets[1].reports[0].items[0].is_undefined(),
        "failed CTRL reports the undefined item"
    );
    // no report for c, and c never ran
    h.assert_no_rptset(Duration::from_millis(200));
    assert_eq!(h.calls(), vec!["a", "b-fails"]);

    h.agent.stop().expect("stop");
}

#[test]
fn test_p13_s3_wait_for_delays_following_items() {
    let mut h = common::setup();

    let wait = {
        let mut r = agent_ref(ObjType::Ctrl, dtnma_agent::CTRL_WAIT_FOR)
            .as_ref_path()
            .cloned()
            .expect("ref");
        r.params = vec![Ari::td(TimeDuration::from_millis(100))];
        Ari::objref(r)
    };
    let mac = Ari::ac(vec![wait, ex_ref(ObjType::Ctrl, common::CTRL_A)]);

    let t0 = TimePoint::now();
    h.mgr
        .send_values(&[Ari::execset(Ari::uint(3), vec![mac])])
        .expect("send execset");

    // while waiting, the agent stays responsive to other EXECSETs
    std::thread::sleep(Duration::from_millis(20));
    h.mgr
        .send_values(&[Ari::execset(
            Ari::uint(4),
            vec![ex_ref(ObjType::Ctrl, common::CTRL_NOTIFY)],
        )])
        .expect("send second execset");

    let rptsets = h.recv_rptsets(3, Duration::from_secs(3));
    assert_eq!(rptsets.len(), 3);

    // the notify report arrives while the first sequence is still waiting
    assert_eq!(
        rptsets[0].reports[0].source,
        ex_ref(ObjType::Ctrl, common::CTRL_NOTIFY)
    );

    // the report for `a` is generated no earlier than the wait duration
    let a_rpt = rptsets
        .iter()
        .find(|r| r.reports[0].source == ex_ref(ObjType::Ctrl, common::CTRL_A))
        .expect("report for a");
    let elapsed = a_rpt.reftime.saturating_since(&t0);
    assert!(
        elapsed >= TimeDuration::from_millis(100),
        "a ran after only {}",
        elapsed
    );

    h.agent.stop().expect("stop");
}

#[test]
fn test_p14_if_then_else_takes_one_branch() {
    let mut h = common::setup();

    let mut r = agent_ref(ObjType::Ctrl, dtnma_agent::CTRL_IF_THEN_ELSE)
        .as_ref_path()
        .cloned()
        .expect("ref");
    r.params = vec![
        Ari::ac(vec![Ari::bool(true)]),
        ex_ref(ObjType::Ctrl, common::CTRL_A),
        ex_ref(ObjType::Ctrl, common::CTRL_C),
    ];
    let status = h.agent.exec_target(Ari::objref(r));

    assert!(status.wait_finished(Duration::from_secs(2)));
    assert!(!status.is_failed());
    assert_eq!(h.calls(), vec!["a"], "only the truthy branch executes");

    h.agent.stop().expect("stop");
}

#[test]
fn test_catch_recovers_from_bad_target() {
    let mut h = common::setup();

    let bad = ex_ref(ObjType::Ctrl, 999);
    let mut r = agent_ref(ObjType::Ctrl, dtnma_agent::CTRL_CATCH)
        .as_ref_path()
        .cloned()
        .expect("ref");
    r.params = vec![bad, ex_ref(ObjType::Ctrl, common::CTRL_NOTIFY)];
    let status = h.agent.exec_target(Ari::objref(r));

    assert!(status.wait_finished(Duration::from_secs(2)));
    assert!(!status.is_failed(), "catch absorbs the try failure");
    assert_eq!(h.calls(), vec!["notify"]);

    h.agent.stop().expect("stop");
}

#[test]
fn test_s6_unknown_target_reporting_depends_on_nonce() {
    let mut h = common::setup();
    let unknown = ex_ref(ObjType::Ctrl, 999);

    // null nonce: no report at all
    h.mgr
        .send_values(&[Ari::execset(Ari::null(), vec![unknown.clone()])])
        .expect("send");
    h.assert_no_rptset(Duration::from_millis(300));

    // non-null nonce: one report with the undefined item
    h.mgr
        .send_values(&[Ari::execset(Ari::uint(5), vec![unknown.clone()])])
        .expect("send");
    let rptsets = h.recv_rptsets(1, Duration::from_secs(2));
    assert_eq!(rptsets.len(), 1);
    assert_eq!(*rptsets[0].nonce, Ari::uint(5));
    assert_eq!(rptsets[0].reports[0].source, unknown);
    assert!(rptsets[0].reports[0].items[0].is_undefined());

    h.agent.stop().expect("stop");
}

#[test]
fn test_errors_in_one_target_do_not_inhibit_others() {
    let mut h = common::setup();

    h.mgr
        .send_values(&[Ari::execset(
            Ari::uint(6),
            vec![
                ex_ref(ObjType::Ctrl, 999),
                ex_ref(ObjType::Ctrl, common::CTRL_A),
            ],
        )])
        .expect("send");

    let rptsets = h.recv_rptsets(2, Duration::from_secs(2));
    assert_eq!(rptsets.len(), 2);
    assert!(rptsets
        .iter()
        .any(|r| r.reports[0].source == ex_ref(ObjType::Ctrl, common::CTRL_A)
            && r.reports[0].items[0] == Ari::text("a")));

    h.agent.stop().expect("stop");
}

#[test]
fn test_var_store_and_reset_through_ctrls() {
    let mut h = common::setup();
    let flag = ex_ref(ObjType::Var, common::VAR_FLAG);

    let store_ctrl = {
        let mut r = agent_ref(ObjType::Ctrl, dtnma_agent::CTRL_VAR_STORE)
            .as_ref_path()
            .cloned()
            .expect("ref");
        r.params = vec![flag.clone(), Ari::bool(true)];
        Ari::objref(r)
    };
    let status = h.agent.exec_target(store_ctrl);
    assert!(status.wait_finished(Duration::from_secs(2)));
    assert!(!status.is_failed());

    {
        let store = h.agent.core().store.read();
        let lookup = refda::amm::dereference(&store, &flag).expect("deref flag");
        assert_eq!(lookup.obj.as_var().map(|v| v.value.clone()), Some(Ari::bool(true)));
    }

    let reset_ctrl = {
        let mut r = agent_ref(ObjType::Ctrl, dtnma_agent::CTRL_VAR_RESET)
            .as_ref_path()
            .cloned()
            .expect("ref");
        r.params = vec![flag.clone()];
        Ari::objref(r)
    };
    let status = h.agent.exec_target(reset_ctrl);
    assert!(status.wait_finished(Duration::from_secs(2)));
    assert!(!status.is_failed());

    {
        let store = h.agent.core().store.read();
        let lookup = refda::amm::dereference(&store, &flag).expect("deref flag");
        assert_eq!(
            lookup.obj.as_var().map(|v| v.value.clone()),
            Some(Ari::bool(false)),
            "reset restores the initial value"
        );
    }

    h.agent.stop().expect("stop");
}
