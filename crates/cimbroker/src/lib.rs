// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # cimbroker - CIM object representation and response aggregation
//!
//! The object core of a CIM server broker: one logical CIM result held in
//! any of four encodings, converted lazily between them, plus the merge of
//! partial results streamed back by several providers for one request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cimbroker::{ContentKind, Encoding, ResponseData, Result};
//! use cimbroker::cim::{CimInstance, Property};
//!
//! fn main() -> Result<()> {
//!     let instance = CimInstance::new("CIM_Disk").with_property(Property::new("Name", "sda"))?;
//!
//!     let mut data = ResponseData::new(ContentKind::Instances);
//!     data.set_instances(vec![instance]);
//!     data.complete_host_and_namespace("srv", "root/cimv2")?;
//!
//!     let mut xml = String::new();
//!     data.encode_xml_response(&mut xml)?;
//!     data.resolve_to(Encoding::Compact)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        Protocol encoders                            |
//! |          encode_xml_response | encode_binary_response                |
//! +---------------------------------------------------------------------+
//! |                          Aggregator                                 |
//! |   fan-out contexts | key-ordered merge | failure policy | filter    |
//! +---------------------------------------------------------------------+
//! |                  Multi-representation container                     |
//! |       Classic  <->  Compact  <->  XML fragments  <->  Binary        |
//! +---------------------------------------------------------------------+
//! |  cim object model | scmo compact store | xml writers/reader | ser   |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ResponseData`] | Result set of one operation in any mix of encodings |
//! | [`Aggregator`] | Merges per-provider partials into one result |
//! | [`scmo::CompactObject`] | Arena-backed instance, path or class |
//! | [`core::ser::BinaryCursor`] | 8-byte-slot binary codec |
//! | [`CimException`] | The only error shape returned to clients |
//!
//! ## Modules Overview
//!
//! - [`cim`] - Classic object model
//! - [`core`] - Binary codec
//! - [`scmo`] - Compact object store and class cache
//! - [`xml`] - CIM-XML writers and fragment reader
//! - [`response`] - Multi-representation response container
//! - [`aggregate`] - Response aggregation and query filtering
//! - [`config`] - Wire constants and runtime configuration

/// Response aggregation across providers, failure policy and query filters.
pub mod aggregate;
/// CIM object model (names, values, paths, qualifiers, classes, instances).
pub mod cim;
/// Wire constants and broker configuration.
pub mod config;
/// Low-level binary codec.
pub mod core;
/// Error types and CIM status codes.
pub mod error;
/// Multi-representation response container.
pub mod response;
/// Compact object store ("SCMO") and class cache.
pub mod scmo;
/// CIM-XML emission and parsing.
pub mod xml;

pub use aggregate::{
    AggregateError, AggregationRequest, Aggregator, ContextId, ExpressionFilter, FailurePolicy,
    PartialKey, PartialResponse, QueryFilter,
};
pub use config::{BrokerConfig, RuntimeConfig};
pub use error::{CimException, CimStatusCode, Error, Result};
pub use response::{
    ContentKind, Encoding, Encodings, RequestOptions, ResponseData, ResponseError, XmlFragment,
};

/// cimbroker version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
