// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Aggregation contexts and the merge step.

use super::{AggregateError, FailurePolicy, QueryFilter};
use crate::cim::CimName;
use crate::config::RuntimeConfig;
use crate::error::CimException;
use crate::response::{ContentKind, Encoding, Encodings, RequestOptions, ResponseData};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Correlation id of one aggregation.
pub type ContextId = u64;

/// Receives the merged container or the propagated failure, exactly once.
pub type Completion = Box<dyn FnOnce(Result<ResponseData, CimException>) + Send>;

/// Identifies one fan-out target: a provider/class name within a namespace.
///
/// The namespace is stamped onto the partial's elements at merge time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartialKey {
    namespace: CimName,
    name: CimName,
}

impl PartialKey {
    pub fn new(namespace: impl Into<CimName>, name: impl Into<CimName>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &CimName {
        &self.namespace
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }
}

impl fmt::Display for PartialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// Parameters of one aggregation.
#[derive(Clone)]
pub struct AggregationRequest {
    kind: ContentKind,
    keys: Vec<PartialKey>,
    options: RequestOptions,
    policy: Option<FailurePolicy>,
    filter: Option<Arc<dyn QueryFilter>>,
}

impl AggregationRequest {
    /// `keys` is the fan-out list in enumeration order; partials are merged
    /// in this order whatever order they arrive in.
    pub fn new(kind: ContentKind, keys: Vec<PartialKey>) -> Self {
        Self {
            kind,
            keys,
            options: RequestOptions::default(),
            policy: None,
            filter: None,
        }
    }

    /// Request options carried by the merged container.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides the configured failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Filter applied to partials delivered with
    /// [`PartialResponse::unfiltered`].
    pub fn with_filter(mut self, filter: Arc<dyn QueryFilter>) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl fmt::Debug for AggregationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationRequest")
            .field("kind", &self.kind)
            .field("keys", &self.keys)
            .field("policy", &self.policy)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

/// One provider's answer.
#[derive(Debug)]
pub struct PartialResponse {
    result: Result<ResponseData, CimException>,
    needs_filter: bool,
}

impl PartialResponse {
    /// Result already shaped by the request's query, if any.
    pub fn data(data: ResponseData) -> Self {
        Self {
            result: Ok(data),
            needs_filter: false,
        }
    }

    /// Result of a plain enumeration standing in for a query; the request
    /// filter is applied at merge time.
    pub fn unfiltered(data: ResponseData) -> Self {
        Self {
            result: Ok(data),
            needs_filter: true,
        }
    }

    pub fn failed(exception: CimException) -> Self {
        Self {
            result: Err(exception),
            needs_filter: false,
        }
    }
}

impl From<ResponseData> for PartialResponse {
    fn from(data: ResponseData) -> Self {
        Self::data(data)
    }
}

impl From<CimException> for PartialResponse {
    fn from(exception: CimException) -> Self {
        Self::failed(exception)
    }
}

impl From<Result<ResponseData, CimException>> for PartialResponse {
    fn from(result: Result<ResponseData, CimException>) -> Self {
        match result {
            Ok(data) => Self::data(data),
            Err(e) => Self::failed(e),
        }
    }
}

/// State of one in-flight aggregation, guarded by its own mutex.
pub struct AggregationContext {
    id: ContextId,
    request: AggregationRequest,
    policy: FailurePolicy,
    slots: Vec<Option<PartialResponse>>,
    remaining: usize,
    /// First non-tolerated failure, in arrival order.
    failure: Option<CimException>,
    /// `None` once completed or cancelled.
    completion: Option<Completion>,
}

impl AggregationContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn content_kind(&self) -> ContentKind {
        self.request.kind
    }

    pub fn keys(&self) -> &[PartialKey] {
        &self.request.keys
    }

    /// Partials still awaited.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_none()
    }

    fn accept(&mut self, key: &PartialKey, partial: PartialResponse) -> Result<(), AggregateError> {
        if self.is_finished() {
            return Err(AggregateError::UnknownContext(self.id));
        }
        let slot = self
            .request
            .keys
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| AggregateError::UnknownKey(key.to_string()))?;
        if self.slots[slot].is_some() {
            return Err(AggregateError::DuplicatePartial(key.to_string()));
        }
        match &partial.result {
            Ok(data) if data.content_kind() != self.request.kind => {
                return Err(AggregateError::ContentKindMismatch {
                    expected: self.request.kind,
                    found: data.content_kind(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                let tolerated = self.policy.tolerates(e);
                log::warn!(
                    "[aggregate] context {} partial {} failed ({}): {}",
                    self.id,
                    key,
                    if tolerated { "tolerated" } else { "propagated" },
                    e
                );
                if !tolerated && self.failure.is_none() {
                    self.failure = Some(e.clone());
                }
            }
        }
        self.slots[slot] = Some(partial);
        self.remaining -= 1;
        Ok(())
    }
}

impl fmt::Debug for AggregationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationContext")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("remaining", &self.remaining)
            .field("failure", &self.failure)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Collects the partial responses of in-flight requests and merges each
/// request's partials once all of them have arrived.
///
/// Contexts live in a concurrent table; each context is guarded by its own
/// mutex, so deliveries to different requests never contend. The thread
/// delivering the last partial performs the merge and runs the completion
/// outside every lock.
///
/// # Example
///
/// ```ignore
/// let aggregator = Aggregator::new(RuntimeConfig::default());
/// let keys = vec![PartialKey::new("root/cimv2", "ProvA"), PartialKey::new("root/cimv2", "ProvB")];
/// let id = aggregator.begin(AggregationRequest::new(ContentKind::Instances, keys.clone()), |result| {
///     // encode and send
/// })?;
/// aggregator.deliver(id, &keys[1], data_b)?;
/// aggregator.deliver(id, &keys[0], data_a)?; // merges A then B
/// ```
pub struct Aggregator {
    config: RuntimeConfig,
    contexts: DashMap<ContextId, Arc<Mutex<AggregationContext>>>,
    next_id: AtomicU64,
}

impl Aggregator {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            contexts: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a context expecting one partial per key.
    ///
    /// An empty fan-out list completes immediately with an empty container.
    ///
    /// # Errors
    ///
    /// `InvalidKeys` when the list names a key twice.
    pub fn begin<F>(&self, request: AggregationRequest, completion: F) -> Result<ContextId, AggregateError>
    where
        F: FnOnce(Result<ResponseData, CimException>) + Send + 'static,
    {
        let keys = &request.keys;
        if let Some(dup) = keys.iter().enumerate().find_map(|(i, k)| keys[..i].contains(k).then_some(k)) {
            return Err(AggregateError::InvalidKeys(format!("{} listed twice", dup)));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let config = self.config.load();
        if keys.is_empty() {
            log::debug!("[aggregate] context {} has no partials, completing", id);
            let empty = ResponseData::new(request.kind)
                .with_options(request.options)
                .with_binary_magic(config.binary_magic);
            completion(Ok(empty));
            return Ok(id);
        }

        let policy = request.policy.clone().unwrap_or_else(|| config.failure_policy());
        let expected = keys.len();
        log::debug!(
            "[aggregate] context {} opened: {} {} partials, {:?}",
            id,
            expected,
            request.kind,
            policy
        );
        let context = AggregationContext {
            id,
            slots: (0..expected).map(|_| None).collect(),
            remaining: expected,
            policy,
            failure: None,
            completion: Some(Box::new(completion)),
            request,
        };
        self.contexts.insert(id, Arc::new(Mutex::new(context)));
        Ok(id)
    }

    /// Record the partial for `key`.
    ///
    /// Returns `true` when this delivery completed the aggregation; the
    /// completion has then already run on the calling thread.
    pub fn deliver(
        &self,
        id: ContextId,
        key: &PartialKey,
        partial: impl Into<PartialResponse>,
    ) -> Result<bool, AggregateError> {
        let context = self
            .contexts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(AggregateError::UnknownContext(id))?;

        let mut ctx = context.lock();
        ctx.accept(key, partial.into())?;
        if ctx.remaining > 0 {
            log::debug!(
                "[aggregate] context {} got {}, {} remaining",
                id,
                key,
                ctx.remaining
            );
            return Ok(false);
        }
        let completion = match ctx.completion.take() {
            Some(completion) => completion,
            None => return Err(AggregateError::UnknownContext(id)),
        };
        let slots = std::mem::take(&mut ctx.slots);
        let failure = ctx.failure.take();
        let request = ctx.request.clone();
        drop(ctx);
        self.contexts.remove(&id);

        let result = match failure {
            Some(e) => Err(e),
            None => self.merge(id, request, slots),
        };
        match &result {
            Ok(merged) => log::debug!(
                "[aggregate] context {} complete: {} elements",
                id,
                merged.element_count()
            ),
            Err(e) => log::debug!("[aggregate] context {} complete with failure: {}", id, e),
        }
        completion(result);
        Ok(true)
    }

    /// Abandon an aggregation: buffered partials are dropped and the
    /// completion receives a `Failed` exception.
    pub fn cancel(&self, id: ContextId) -> Result<(), AggregateError> {
        let (_, context) = self
            .contexts
            .remove(&id)
            .ok_or(AggregateError::UnknownContext(id))?;
        let mut ctx = context.lock();
        let completion = ctx.completion.take();
        let buffered = ctx.slots.iter().filter(|s| s.is_some()).count();
        ctx.slots.clear();
        drop(ctx);

        let completion = completion.ok_or(AggregateError::UnknownContext(id))?;
        log::debug!(
            "[aggregate] context {} cancelled, {} buffered partials discarded",
            id,
            buffered
        );
        completion(Err(CimException::failed("request cancelled")));
        Ok(())
    }

    /// Cancel every open context.
    pub fn cancel_all(&self) {
        let ids: Vec<ContextId> = self.contexts.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            // Completed concurrently: nothing left to cancel.
            let _ = self.cancel(id);
        }
    }

    /// Number of open contexts.
    pub fn pending_count(&self) -> usize {
        self.contexts.len()
    }

    /// Partials still awaited by `id`, `None` once it is closed.
    pub fn remaining(&self, id: ContextId) -> Option<usize> {
        let context = self.contexts.get(&id).map(|entry| Arc::clone(entry.value()))?;
        let remaining = context.lock().remaining();
        Some(remaining)
    }

    /// Filter, address, then concatenate the partials in key order.
    fn merge(
        &self,
        id: ContextId,
        request: AggregationRequest,
        slots: Vec<Option<PartialResponse>>,
    ) -> Result<ResponseData, CimException> {
        let config = self.config.load();
        let AggregationRequest {
            kind,
            keys,
            options,
            filter,
            ..
        } = request;

        let mut partials = Vec::with_capacity(keys.len());
        for (key, slot) in keys.iter().zip(slots) {
            let Some(PartialResponse { result, needs_filter }) = slot else {
                continue;
            };
            // Failures reaching here were tolerated.
            let Ok(mut data) = result else {
                continue;
            };
            if needs_filter {
                if let Some(filter) = &filter {
                    data.apply_query_filter(filter.as_ref())?;
                }
            }
            data.complete_host_and_namespace(&config.hostname, key.namespace().as_str())?;
            partials.push(data);
        }

        if !single_shared_encoding(&partials) {
            log::debug!(
                "[aggregate] context {} partials use differing encodings, merging as classic",
                id
            );
            for data in partials.iter_mut() {
                data.resolve_to(Encoding::Classic)?;
            }
        }

        let mut merged = ResponseData::new(kind)
            .with_options(options)
            .with_binary_magic(config.binary_magic);
        for data in partials {
            merged.append_response_data(data);
        }
        Ok(merged)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Drop for Aggregator {
    fn drop(&mut self) {
        if !self.contexts.is_empty() {
            log::debug!(
                "[aggregate] dropping aggregator with {} open contexts",
                self.contexts.len()
            );
            self.cancel_all();
        }
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("pending", &self.contexts.len())
            .finish()
    }
}

/// Whether concatenating per encoding keeps key order: every non-empty
/// partial holds exactly one encoding (a mirrored pair counts as classic),
/// and it is the same one.
fn single_shared_encoding(partials: &[ResponseData]) -> bool {
    let mut shared: Option<Encodings> = None;
    for data in partials {
        let mut encodings = data.encodings();
        if data.is_mirrored() {
            encodings.remove(Encoding::Compact);
        }
        if encodings.is_empty() {
            continue;
        }
        if encodings.iter().count() > 1 {
            return false;
        }
        match shared {
            None => shared = Some(encodings),
            Some(seen) if seen == encodings => {}
            Some(_) => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ExpressionFilter;
    use crate::cim::{CimInstance, Property, Qualifier};
    use crate::config::BrokerConfig;
    use crate::error::CimStatusCode;
    use crate::scmo::convert;

    type Outcome = Arc<Mutex<Vec<Result<ResponseData, CimException>>>>;

    fn instance(id: &str, size: u64) -> CimInstance {
        CimInstance::new("CIM_Thing")
            .with_property(
                Property::new("Id", id)
                    .with_qualifier(Qualifier::new("Key", true))
                    .unwrap(),
            )
            .unwrap()
            .with_property(Property::new("Size", size))
            .unwrap()
    }

    fn instances(ids: &[&str]) -> ResponseData {
        let mut data = ResponseData::new(ContentKind::Instances);
        data.set_instances(ids.iter().map(|id| instance(id, 1)).collect());
        data
    }

    fn keys(n: usize) -> Vec<PartialKey> {
        (0..n).map(|i| PartialKey::new("root/cimv2", format!("Prov{}", i))).collect()
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(RuntimeConfig::new(BrokerConfig {
            hostname: "broker".into(),
            ..BrokerConfig::default()
        }))
    }

    fn begin(agg: &Aggregator, request: AggregationRequest) -> (ContextId, Outcome) {
        let outcome: Outcome = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcome);
        let id = agg
            .begin(request, move |result| sink.lock().push(result))
            .unwrap();
        (id, outcome)
    }

    fn ids(data: &mut ResponseData) -> Vec<String> {
        data.instances()
            .unwrap()
            .iter()
            .map(|i| i.value("Id").and_then(|v| v.as_str()).unwrap().to_string())
            .collect()
    }

    fn take_ok(outcome: &Outcome) -> ResponseData {
        let mut results = outcome.lock();
        assert_eq!(results.len(), 1, "completion must run exactly once");
        results.pop().unwrap().unwrap()
    }

    #[test]
    fn test_merge_follows_key_order() {
        let agg = aggregator();
        let keys = keys(3);
        let (id, outcome) = begin(&agg, AggregationRequest::new(ContentKind::Instances, keys.clone()));

        assert!(!agg.deliver(id, &keys[2], instances(&["c"])).unwrap());
        assert_eq!(agg.remaining(id), Some(2));
        assert!(!agg.deliver(id, &keys[0], instances(&["a1", "a2"])).unwrap());
        assert!(outcome.lock().is_empty());
        assert!(agg.deliver(id, &keys[1], instances(&["b"])).unwrap());

        let mut merged = take_ok(&outcome);
        assert_eq!(ids(&mut merged), vec!["a1", "a2", "b", "c"]);
        assert_eq!(agg.pending_count(), 0);
        assert_eq!(agg.remaining(id), None);
    }

    #[test]
    fn test_addressing_completed_per_key() {
        let agg = aggregator();
        let keys = vec![PartialKey::new("root/a", "P"), PartialKey::new("root/b", "P")];
        let (id, outcome) = begin(&agg, AggregationRequest::new(ContentKind::Instances, keys.clone()));
        agg.deliver(id, &keys[0], instances(&["x"])).unwrap();
        agg.deliver(id, &keys[1], instances(&["y"])).unwrap();

        let mut merged = take_ok(&outcome);
        let paths: Vec<String> = merged
            .instances()
            .unwrap()
            .iter()
            .map(|i| i.path().unwrap().to_string())
            .collect();
        assert_eq!(
            paths,
            vec![
                "//broker/root/a:CIM_Thing.Id=\"x\"",
                "//broker/root/b:CIM_Thing.Id=\"y\""
            ]
        );
    }

    #[test]
    fn test_first_failure_wins() {
        let agg = aggregator();
        let keys = keys(3);
        let (id, outcome) = begin(&agg, AggregationRequest::new(ContentKind::Instances, keys.clone()));
        agg.deliver(id, &keys[2], CimException::new(CimStatusCode::NotFound, "gone"))
            .unwrap();
        agg.deliver(id, &keys[0], CimException::new(CimStatusCode::AccessDenied, "no"))
            .unwrap();
        agg.deliver(id, &keys[1], instances(&["b"])).unwrap();

        let results = outcome.lock();
        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.code(), CimStatusCode::NotFound);
        assert_eq!(err.message(), "gone");
    }

    #[test]
    fn test_best_effort_skips_tolerated() {
        let agg = aggregator();
        let keys = keys(3);
        let request = AggregationRequest::new(ContentKind::Instances, keys.clone()).with_policy(
            FailurePolicy::BestEffort {
                tolerated: vec![CimStatusCode::NotSupported],
            },
        );
        let (id, outcome) = begin(&agg, request);
        agg.deliver(id, &keys[1], CimException::new(CimStatusCode::NotSupported, ""))
            .unwrap();
        agg.deliver(id, &keys[2], instances(&["c"])).unwrap();
        agg.deliver(id, &keys[0], instances(&["a"])).unwrap();
        assert_eq!(ids(&mut take_ok(&outcome)), vec!["a", "c"]);
    }

    #[test]
    fn test_policy_from_config() {
        let agg = Aggregator::new(RuntimeConfig::new(BrokerConfig {
            tolerated_status_codes: vec![CimStatusCode::NotSupported.code()],
            ..BrokerConfig::default()
        }));
        let keys = keys(2);
        let (id, outcome) = begin(&agg, AggregationRequest::new(ContentKind::Instances, keys.clone()));
        agg.deliver(id, &keys[0], CimException::new(CimStatusCode::NotSupported, ""))
            .unwrap();
        agg.deliver(id, &keys[1], instances(&["b"])).unwrap();
        assert_eq!(ids(&mut take_ok(&outcome)), vec!["b"]);
    }

    #[test]
    fn test_protocol_errors() {
        let agg = aggregator();
        let keys = keys(2);
        let (id, outcome) = begin(&agg, AggregationRequest::new(ContentKind::Instances, keys.clone()));

        assert_eq!(
            agg.deliver(id + 100, &keys[0], instances(&["a"])),
            Err(AggregateError::UnknownContext(id + 100))
        );
        assert!(matches!(
            agg.deliver(id, &PartialKey::new("root", "Other"), instances(&["a"])),
            Err(AggregateError::UnknownKey(_))
        ));
        assert_eq!(
            agg.deliver(id, &keys[0], ResponseData::new(ContentKind::ObjectPaths)),
            Err(AggregateError::ContentKindMismatch {
                expected: ContentKind::Instances,
                found: ContentKind::ObjectPaths,
            })
        );
        agg.deliver(id, &keys[0], instances(&["a"])).unwrap();
        assert!(matches!(
            agg.deliver(id, &keys[0], instances(&["a"])),
            Err(AggregateError::DuplicatePartial(_))
        ));
        assert_eq!(agg.remaining(id), Some(1));
        assert!(outcome.lock().is_empty());

        let dup = vec![keys[0].clone(), PartialKey::new("ROOT/CIMV2", "prov0")];
        assert!(matches!(
            agg.begin(AggregationRequest::new(ContentKind::Instances, dup), |_| {}),
            Err(AggregateError::InvalidKeys(_))
        ));
    }

    #[test]
    fn test_cancel_completes_once_with_failed() {
        let agg = aggregator();
        let keys = keys(2);
        let (id, outcome) = begin(&agg, AggregationRequest::new(ContentKind::Instances, keys.clone()));
        agg.deliver(id, &keys[0], instances(&["a"])).unwrap();

        agg.cancel(id).unwrap();
        assert_eq!(agg.cancel(id), Err(AggregateError::UnknownContext(id)));
        assert_eq!(
            agg.deliver(id, &keys[1], instances(&["b"])),
            Err(AggregateError::UnknownContext(id))
        );
        let results = outcome.lock();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap_err().code(), CimStatusCode::Failed);
    }

    #[test]
    fn test_drop_cancels_open_contexts() {
        let agg = aggregator();
        let (_, outcome) = begin(&agg, AggregationRequest::new(ContentKind::Instances, keys(1)));
        drop(agg);
        assert!(outcome.lock()[0].is_err());
    }

    #[test]
    fn test_empty_fan_out_completes_immediately() {
        let agg = aggregator();
        let (_, outcome) = begin(&agg, AggregationRequest::new(ContentKind::ObjectPaths, Vec::new()));
        let merged = take_ok(&outcome);
        assert!(merged.is_empty());
        assert_eq!(merged.content_kind(), ContentKind::ObjectPaths);
        assert_eq!(agg.pending_count(), 0);
    }

    #[test]
    fn test_filter_applies_to_unfiltered_partials_only() {
        let agg = aggregator();
        let keys = keys(2);
        let filter = Arc::new(ExpressionFilter::new("Size > 5").unwrap());
        let request = AggregationRequest::new(ContentKind::Instances, keys.clone()).with_filter(filter);
        let (id, outcome) = begin(&agg, request);

        let mut enumerated = ResponseData::new(ContentKind::Instances);
        enumerated.set_instances(vec![instance("small", 1), instance("big", 10)]);
        agg.deliver(id, &keys[1], PartialResponse::unfiltered(enumerated))
            .unwrap();
        // Query-capable provider already filtered; its result is kept as is.
        agg.deliver(id, &keys[0], instances(&["queried"])).unwrap();

        assert_eq!(ids(&mut take_ok(&outcome)), vec!["queried", "big"]);
    }

    #[test]
    fn test_mixed_encodings_keep_key_order() {
        let agg = aggregator();
        let keys = keys(3);
        let (id, outcome) = begin(&agg, AggregationRequest::new(ContentKind::Instances, keys.clone()));

        let mut compact = ResponseData::new(ContentKind::Instances);
        compact.set_compact(vec![convert::from_instance(&instance("a", 1), "root/cimv2", None).unwrap()]);
        let mut xml = instances(&["c"]);
        xml.resolve_to(Encoding::Xml).unwrap();

        agg.deliver(id, &keys[2], xml).unwrap();
        agg.deliver(id, &keys[1], instances(&["b"])).unwrap();
        agg.deliver(id, &keys[0], compact).unwrap();

        let mut merged = take_ok(&outcome);
        assert_eq!(ids(&mut merged), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_single_shared_encoding() {
        let classic = instances(&["a"]);
        let mut mirrored = instances(&["b"]);
        mirrored.resolve_to(Encoding::Compact).unwrap();
        let empty = ResponseData::new(ContentKind::Instances);
        assert!(single_shared_encoding(&[classic.clone(), mirrored, empty]));

        let mut xml = instances(&["c"]);
        xml.resolve_to(Encoding::Xml).unwrap();
        assert!(!single_shared_encoding(&[classic.clone(), xml]));

        let mut both = classic.clone();
        both.append_response_data({
            let mut x = instances(&["d"]);
            x.resolve_to(Encoding::Xml).unwrap();
            x
        });
        assert!(!single_shared_encoding(&[both]));
    }
}
