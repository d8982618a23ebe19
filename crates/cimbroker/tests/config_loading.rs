// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![cfg(feature = "config-loaders")]
#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Broker configuration loading from YAML files.

use cimbroker::cim::CimInstance;
use cimbroker::{
    AggregationRequest, Aggregator, BrokerConfig, CimStatusCode, ContentKind, Error,
    FailurePolicy, PartialKey, ResponseData, RuntimeConfig,
};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn partial_file_keeps_defaults() {
    let file = write_config("include_qualifiers: true\n");
    let config = BrokerConfig::load_from_file(file.path()).unwrap();
    assert!(config.include_qualifiers);
    assert!(!config.include_class_origin);
    assert!(config.tolerated_status_codes.is_empty());
    assert_eq!(config.failure_policy(), FailurePolicy::FirstFailure);
}

#[test]
fn tolerated_codes_select_best_effort() {
    let file = write_config(
        "hostname: cimsrv01\n\
         binary_magic: false\n\
         tolerated_status_codes: [7, 6, 999]\n",
    );
    let config = BrokerConfig::load_from_file(file.path()).unwrap();
    assert!(!config.binary_magic);
    assert_eq!(
        config.failure_policy(),
        FailurePolicy::BestEffort {
            tolerated: vec![CimStatusCode::NotSupported, CimStatusCode::NotFound],
        }
    );
}

#[test]
fn unreadable_or_malformed_files_are_config_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.yaml");
    assert!(matches!(BrokerConfig::load_from_file(&missing), Err(Error::Config(_))));

    let file = write_config("tolerated_status_codes: not-a-list\n");
    match BrokerConfig::load_from_file(file.path()) {
        Err(Error::Config(msg)) => assert!(msg.contains("YAML"), "{}", msg),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn replaced_config_reaches_new_aggregations() {
    let runtime = RuntimeConfig::new(BrokerConfig {
        hostname: "before".to_string(),
        ..BrokerConfig::default()
    });
    let aggregator = Aggregator::new(runtime.clone());

    let file = write_config("hostname: after\n");
    let mut loaded = BrokerConfig::load_from_file(file.path()).unwrap();
    // the environment may override the host name, pin it for the check
    loaded.hostname = "after".to_string();
    runtime.store(loaded);
    assert_eq!(runtime.hostname(), "after");

    let key = PartialKey::new("root/cimv2", "Provider");
    let outcome = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&outcome);
    let id = aggregator
        .begin(
            AggregationRequest::new(ContentKind::Instances, vec![key.clone()]),
            move |result| *slot.lock() = Some(result),
        )
        .unwrap();

    let mut partial = ResponseData::new(ContentKind::Instances);
    partial.set_instances(vec![CimInstance::new("CIM_Item")]);
    assert!(aggregator.deliver(id, &key, partial).unwrap());

    let mut merged = outcome.lock().take().unwrap().unwrap();
    let path = merged.instances().unwrap()[0].path().unwrap().to_string();
    assert_eq!(path, "//after/root/cimv2:CIM_Item");
}
