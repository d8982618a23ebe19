// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use cimbroker::core::ser::BinaryCursor;
use cimbroker::{ContentKind, Encoding, ResponseData};

fuzz_target!(|data: &[u8]| {
    // Fuzz marker-dispatched unit decoding through the container
    let mut response = ResponseData::new(ContentKind::Instances);
    response.set_binary(data.to_vec());
    let _ = response.resolve_to(Encoding::Classic);

    // Fuzz value decoding without magic checks
    let mut cursor = BinaryCursor::from_bytes(data.to_vec());
    cursor.set_magic(false);
    while cursor.get_value().is_ok() {}
});
