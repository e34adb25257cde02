// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lifecycle behavior: end-of-stream draining, shutdown, and the
//! instrumentation EDDs.

mod common;

use std::time::Duration;

use common::{agent_ref, ex_ref, Harness};
use refda::adm::dtnma_agent;
use refda::ari::{Ari, ObjType};

#[test]
fn test_transport_eof_drains_and_stops_cleanly() {
    let Harness {
        mut agent,
        mgr,
        calls,
    } = common::setup();

    mgr.send_values(&[Ari::execset(
        Ari::null(),
        vec![ex_ref(ObjType::Ctrl, common::CTRL_A)],
    )])
    .expect("send");

    // give the worker time to run the control, then close the manager side
    let start = std::time::Instant::now();
    while calls.lock().expect("calls").is_empty() && start.elapsed() < Duration::from_secs(2) {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(calls.lock().expect("calls").as_slice(), ["a"]);

    mgr.close();
    // workers observe the EOF sentinel chain and join without hanging
    agent.stop().expect("stop");
}

#[test]
fn test_instrumentation_edds_observe_activity() {
    let mut h = common::setup();

    h.mgr
        .send_values(&[Ari::execset(
            Ari::uint(1),
            vec![ex_ref(ObjType::Ctrl, common::CTRL_A)],
        )])
        .expect("send");
    let rptsets = h.recv_rptsets(1, Duration::from_secs(2));
    assert_eq!(rptsets.len(), 1);

    // inspect the run counter through the EDD
    let mut inspect = agent_ref(ObjType::Ctrl, dtnma_agent::CTRL_INSPECT)
        .as_ref_path()
        .cloned()
        .expect("ref");
    inspect.params = vec![agent_ref(ObjType::Edd, dtnma_agent::EDD_NUM_CTRLS_RUN)];
    h.mgr
        .send_values(&[Ari::execset(Ari::uint(2), vec![Ari::objref(inspect)])])
        .expect("send");

    let rptsets = h.recv_rptsets(1, Duration::from_secs(2));
    let count = rptsets[0].reports[0].items[0].as_uint().expect("count");
    assert!(count >= 1, "counter EDD reports runs, got {}", count);

    h.agent.stop().expect("stop");
}

#[test]
fn test_stop_without_traffic() {
    let mut h = common::setup();
    h.agent.stop().expect("stop with no traffic");
}

#[test]
fn test_multiple_execsets_in_one_message() {
    let mut h = common::setup();

    h.mgr
        .send_values(&[
            Ari::execset(Ari::uint(1), vec![ex_ref(ObjType::Ctrl, common::CTRL_A)]),
            Ari::execset(Ari::uint(2), vec![ex_ref(ObjType::Ctrl, common::CTRL_C)]),
        ])
        .expect("send");

    let rptsets = h.recv_rptsets(2, Duration::from_secs(2));
    assert_eq!(rptsets.len(), 2);
    assert_eq!(*rptsets[0].nonce, Ari::uint(1));
    assert_eq!(*rptsets[1].nonce, Ari::uint(2));

    h.agent.stop().expect("stop");
}

#[test]
fn test_non_execset_input_is_ignored() {
    let mut h = common::setup();

    h.mgr
        .send_values(&[
            Ari::text("not an execset"),
            Ari::execset(Ari::uint(3), vec![ex_ref(ObjType::Ctrl, common::CTRL_A)]),
        ])
        .expect("send");

    let rptsets = h.recv_rptsets(1, Duration::from_secs(2));
    assert_eq!(rptsets.len(), 1);
    assert_eq!(*rptsets[0].nonce, Ari::uint(3));
    h.assert_no_rptset(Duration::from_millis(200));

    h.agent.stop().expect("stop");
}
