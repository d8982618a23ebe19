// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::too_many_lines)] // Test code

//! Response container integration tests
//!
//! Exercises the public container API across encodings: idempotent
//! resolves, XML parity, appends of agent fragments, mixed binary units and
//! paging across encoding boundaries.

use cimbroker::cim::{CimInstance, CimValue, KeyBinding, ObjectPath, Property, Qualifier};
use cimbroker::config::{BINARY_TYPE_CPPD, BINARY_TYPE_SCMO};
use cimbroker::core::ser::BinaryCursor;
use cimbroker::scmo::convert;
use cimbroker::{ContentKind, Encoding, Encodings, ResponseData, XmlFragment};

fn thing(id: &str, count: u32) -> CimInstance {
    CimInstance::new("CIM_Thing")
        .with_property(
            Property::new("Id", id)
                .with_qualifier(Qualifier::new("Key", true))
                .unwrap(),
        )
        .unwrap()
        .with_property(Property::new("Count", count))
        .unwrap()
        .with_path(
            ObjectPath::new("CIM_Thing")
                .with_host("srv")
                .with_namespace("root/cimv2")
                .with_key(KeyBinding::string("Id", id)),
        )
}

fn ids(data: &mut ResponseData) -> Vec<String> {
    data.instances()
        .unwrap()
        .iter()
        .map(|i| i.value("Id").and_then(CimValue::as_str).unwrap().to_string())
        .collect()
}

fn xml_of(data: &mut ResponseData) -> String {
    let mut out = String::new();
    data.encode_xml_response(&mut out).unwrap();
    out
}

/// Container holding `things` spread over every encoding at once:
/// fragments, a binary unit, classic and compact elements, in that order.
fn spread(things: &[CimInstance]) -> ResponseData {
    let quarter = things.len() / 4;
    let (xml_part, rest) = things.split_at(quarter);
    let (binary_part, rest) = rest.split_at(quarter);
    let (classic_part, compact_part) = rest.split_at(quarter);

    let mut source = ResponseData::new(ContentKind::Instances);
    source.set_instances(xml_part.to_vec());
    let fragments = source.xml_fragments().unwrap().to_vec();

    let mut cursor = BinaryCursor::new();
    cursor.put_u32(BINARY_TYPE_CPPD).unwrap();
    cursor.put_instances(binary_part).unwrap();

    let mut data = ResponseData::new(ContentKind::Instances);
    data.set_xml(fragments);
    data.set_binary(cursor.release());
    data.set_instances(classic_part.to_vec());
    data.set_compact(
        compact_part
            .iter()
            .map(|i| convert::from_instance(i, "root/cimv2", None).unwrap())
            .collect(),
    );
    data
}

fn random_things(rng: &mut fastrand::Rng, n: usize) -> Vec<CimInstance> {
    (0..n)
        .map(|i| thing(&format!("t{:03}", i), rng.u32(..)))
        .collect()
}

#[test]
fn resolve_twice_equals_resolve_once() {
    for seed in 0..8 {
        let mut rng = fastrand::Rng::with_seed(seed);
        let n = rng.usize(4..20);
        let things = random_things(&mut rng, n);
        for target in Encoding::ALL {
            let mut data = spread(&things);
            data.resolve_to(target).unwrap();
            let encodings = data.encodings();
            let xml = xml_of(&mut data.clone());

            data.resolve_to(target).unwrap();
            assert_eq!(data.encodings(), encodings, "seed {} {:?}", seed, target);
            assert_eq!(xml_of(&mut data), xml, "seed {} {:?}", seed, target);
        }
    }
}

#[test]
fn every_target_keeps_logical_order() {
    let mut rng = fastrand::Rng::with_seed(3);
    let things = random_things(&mut rng, 12);
    let expected: Vec<String> = (0..12).map(|i| format!("t{:03}", i)).collect();

    for target in Encoding::ALL {
        let mut data = spread(&things);
        data.resolve_to(target).unwrap();
        assert!(data.has(target), "{:?}", target);
        assert_eq!(ids(&mut data), expected, "{:?}", target);
    }
}

#[test]
fn xml_is_identical_from_every_encoding() {
    let things: Vec<_> = (0..6).map(|i| thing(&format!("x{}", i), i * 10)).collect();
    let mut classic = ResponseData::new(ContentKind::Instances);
    classic.set_instances(things.clone());
    let expected = xml_of(&mut classic.clone());
    assert_eq!(expected.matches("<VALUE.NAMEDINSTANCE>").count(), 6);

    assert_eq!(xml_of(&mut spread(&things)), expected);
    for target in Encoding::ALL {
        let mut data = spread(&things);
        data.resolve_to(target).unwrap();
        assert_eq!(xml_of(&mut data), expected, "{:?}", target);
    }
}

#[test]
fn appended_agent_fragments_keep_order() {
    let fragment = |id: &str| {
        let body = format!(
            "<INSTANCE CLASSNAME=\"CIM_Thing\">\
             <PROPERTY NAME=\"Id\" TYPE=\"string\"><VALUE>{id}</VALUE></PROPERTY>\
             </INSTANCE>"
        );
        let reference = format!(
            "<INSTANCENAME CLASSNAME=\"CIM_Thing\">\
             <KEYBINDING NAME=\"Id\"><KEYVALUE VALUETYPE=\"string\">{id}</KEYVALUE></KEYBINDING>\
             </INSTANCENAME>"
        );
        XmlFragment::new(body, reference)
            .with_host("agent")
            .with_namespace("root/agent")
    };

    let mut first = ResponseData::new(ContentKind::Instances);
    first.set_xml(vec![fragment("one")]);
    let mut second = ResponseData::new(ContentKind::Instances);
    second.set_xml(vec![fragment("two")]);
    let union = first.encodings().union(second.encodings());

    first.append_response_data(second);
    assert_eq!(first.encodings(), union);
    assert_eq!(first.encodings(), Encodings::from(Encoding::Xml));
    assert_eq!(first.element_count(), 2);

    assert_eq!(ids(&mut first), vec!["one", "two"]);
    let path = first.instances().unwrap()[1].path().unwrap().to_string();
    assert_eq!(path, "//agent/root/agent:CIM_Thing.Id=\"two\"");
}

#[test]
fn append_is_the_union_of_encodings() {
    let mut classic = ResponseData::new(ContentKind::Instances);
    classic.set_instances(vec![thing("a", 1)]);
    let mut compact = ResponseData::new(ContentKind::Instances);
    compact.set_compact(vec![convert::from_instance(&thing("b", 2), "root/cimv2", None).unwrap()]);

    let union = classic.encodings().union(compact.encodings());
    classic.append_response_data(compact);
    assert_eq!(classic.encodings(), union);
    assert_eq!(classic.size().unwrap(), 2);
    assert_eq!(ids(&mut classic), vec!["a", "b"]);
}

#[test]
fn mixed_binary_units_split_by_marker() {
    let mut cursor = BinaryCursor::new();
    cursor.put_u32(BINARY_TYPE_CPPD).unwrap();
    cursor.put_instances(&[thing("classic", 1)]).unwrap();
    cursor.put_u32(BINARY_TYPE_SCMO).unwrap();
    cursor
        .put_compact_objects(&[convert::from_instance(&thing("compact", 2), "root/cimv2", None).unwrap()])
        .unwrap();

    let mut data = ResponseData::new(ContentKind::Instances);
    data.set_binary(cursor.release());
    assert_eq!(data.element_count(), 0);
    data.resolve_binary().unwrap();

    assert!(!data.has(Encoding::Binary));
    assert!(data.has(Encoding::Classic) && data.has(Encoding::Compact));
    assert!(!data.is_mirrored());
    assert_eq!(data.compact_objects().unwrap().len(), 1);
    assert_eq!(data.element_count(), 2);
    assert_eq!(ids(&mut data), vec!["classic", "compact"]);
}

#[test]
fn appended_compact_binary_leads_on_every_xml_path() {
    let objects: Vec<_> = ["a", "b"]
        .iter()
        .zip(1..)
        .map(|(id, n)| convert::from_instance(&thing(id, n), "root/cimv2", None).unwrap())
        .collect();
    let mut cursor = BinaryCursor::new();
    cursor.put_u32(BINARY_TYPE_SCMO).unwrap();
    cursor.put_compact_objects(&objects).unwrap();

    let mut merged = ResponseData::new(ContentKind::Instances);
    merged.set_instances(vec![thing("c", 3)]);
    let mut partial = ResponseData::new(ContentKind::Instances);
    partial.set_binary(cursor.release());
    merged.append_response_data(partial);

    let direct = xml_of(&mut merged.clone());
    let a = direct.find("<VALUE>a</VALUE>").unwrap();
    let c = direct.find("<VALUE>c</VALUE>").unwrap();
    assert!(a < c, "{}", direct);

    for target in Encoding::ALL {
        let mut data = merged.clone();
        data.resolve_to(target).unwrap();
        assert_eq!(xml_of(&mut data), direct, "{:?}", target);
    }
    assert_eq!(ids(&mut merged), vec!["a", "b", "c"]);
}

#[test]
fn paging_across_encodings() {
    let things: Vec<_> = (0..8).map(|i| thing(&format!("p{}", i), i)).collect();
    let mut data = spread(&things);

    let mut pages = Vec::new();
    while !data.is_empty() {
        let mut page = data.move_objects(3).unwrap();
        assert!(page.element_count() <= 3);
        pages.push(ids(&mut page));
    }
    let flat: Vec<String> = pages.concat();
    let expected: Vec<String> = (0..8).map(|i| format!("p{}", i)).collect();
    assert_eq!(flat, expected);
    assert_eq!(data.size().unwrap(), 0);
}

#[test]
fn binary_response_reopens_in_order() {
    let things: Vec<_> = (0..8).map(|i| thing(&format!("b{}", i), i)).collect();
    let mut data = spread(&things);
    let mut out = BinaryCursor::new();
    data.encode_binary_response(&mut out).unwrap();
    assert_eq!(data.encodings(), Encodings::from(Encoding::Binary));

    let mut reopened = ResponseData::new(ContentKind::Instances);
    reopened.set_binary(out.release());
    let expected: Vec<String> = (0..8).map(|i| format!("b{}", i)).collect();
    assert_eq!(ids(&mut reopened), expected);
}
