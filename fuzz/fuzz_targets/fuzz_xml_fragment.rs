// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use cimbroker::xml::{parse_instance, parse_object, parse_path};

fuzz_target!(|data: &[u8]| {
    // Convert bytes to string (CIM-XML is text-based)
    if let Ok(xml) = std::str::from_utf8(data) {
        // Fuzz instance body parser
        let _ = parse_instance(xml);

        // Fuzz object parser (classes and instances)
        let _ = parse_object(xml);

        // Fuzz instance/class reference parser
        let _ = parse_path(xml);
    }
});
