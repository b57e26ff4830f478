//! Bounded attribute store.
//!
//! Contract:
//! - Pairs passed to one `set` call are processed in the order the caller supplies them,
//!   so when a call offers more new keys than the count limit allows, the first ones win.
//! - The count limit is checked before the value is validated. A pair that would add a
//!   new key to a full store is dropped; overwriting an existing key is always allowed.
//! - Every pair that is not stored adds one to the drop counter. The counter never goes down.
//! - Values go in as fresh copies and come out as fresh copies; nothing is shared with callers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::diagnostics::{DropReport, DropSink, noop_sink};
use crate::keys::FALLBACK_KEY;
use crate::limits::AttributeLimits;
use crate::validator::{Rejection, validate};
use crate::value::{AttributeValue, Candidate};

/// Owned attribute map handed out to readers.
pub type Attributes = HashMap<String, AttributeValue>;

#[derive(Debug, Default)]
struct State {
    entries: Attributes,
    dropped: u64,
}

pub struct AttributeStore {
    state: Mutex<State>,
    limits: AttributeLimits,
    label: &'static str,
    sink: Arc<dyn DropSink>,
}

impl AttributeStore {
    /// Build a store and load `initial` through one `set` call.
    pub fn new<I, K, V>(initial: I, limits: AttributeLimits) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Candidate>,
    {
        Self::with_sink(initial, limits, noop_sink())
    }

    /// Like [`AttributeStore::new`], reporting drops (including those of the initial load) to `sink`.
    pub fn with_sink<I, K, V>(initial: I, limits: AttributeLimits, sink: Arc<dyn DropSink>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Candidate>,
    {
        let store = Self::empty(limits).reporting_to(sink);
        store.set(initial);
        store
    }

    pub fn empty(limits: AttributeLimits) -> Self {
        Self {
            state: Mutex::new(State::default()),
            limits,
            label: "attributes",
            sink: noop_sink(),
        }
    }

    /// Name of the owning entity, passed along with drop reports.
    pub fn labelled(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn reporting_to(mut self, sink: Arc<dyn DropSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Add or overwrite attributes. Never fails; refused pairs are counted as drops.
    ///
    /// An empty key is stored under [`FALLBACK_KEY`].
    pub fn set<I, K, V>(&self, pairs: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Candidate>,
    {
        // Convert before locking so caller code never runs under the lock.
        let pairs: Vec<(K, Candidate)> = pairs.into_iter().map(|(k, v)| (k, v.into())).collect();
        let mut report = DropReport {
            attempted: pairs.len(),
            ..Default::default()
        };

        {
            let mut state = self.lock();
            for (key, value) in &pairs {
                let key = match key.as_ref() {
                    "" => FALLBACK_KEY,
                    k => k,
                };

                let projected = state.entries.len() + usize::from(!state.entries.contains_key(key));
                if self.limits.count.is_some_and(|max| projected > max.get()) {
                    report.over_limit += 1;
                    continue;
                }

                match validate(value, self.limits.length) {
                    Ok(normalized) => {
                        state.entries.insert(key.to_owned(), normalized);
                        report.stored += 1;
                    }
                    Err(Rejection::Absent) => report.absent += 1,
                    Err(Rejection::Malformed) => report.malformed += 1,
                }
            }
            state.dropped += report.dropped() as u64;
        }

        if report.dropped() > 0 {
            self.sink.record(self.label, &report);
        }
        self
    }

    /// Copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<AttributeValue> {
        self.lock().entries.get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Total pairs refused over the store's lifetime.
    pub fn dropped_fields(&self) -> u64 {
        self.lock().dropped
    }

    /// Independent copy of every stored attribute.
    pub fn snapshot(&self) -> Attributes {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn limits(&self) -> AttributeLimits {
        self.limits
    }

    // State is consistent between pairs, so a panic elsewhere never leaves it half-written.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AttributeStore {
    fn default() -> Self {
        Self::empty(AttributeLimits::UNBOUNDED)
    }
}

impl fmt::Debug for AttributeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("AttributeStore")
            .field("label", &self.label)
            .field("limits", &self.limits)
            .field("entries", &state.entries)
            .field("dropped", &state.dropped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::TracingSink;
    use crate::test_capture::install_capture;
    use crate::value::Scalar;
    use serde_json::{Value, json};
    use std::num::NonZeroUsize;

    type Pairs = Vec<(&'static str, Value)>;

    fn limits(count: Option<usize>, length: Option<usize>) -> AttributeLimits {
        AttributeLimits::new(count, length).unwrap()
    }

    #[derive(Default)]
    struct RecordingSink {
        reports: Mutex<Vec<(String, DropReport)>>,
    }

    impl DropSink for RecordingSink {
        fn record(&self, entity: &str, report: &DropReport) {
            self.reports.lock().unwrap().push((entity.to_string(), *report));
        }
    }

    #[test]
    fn count_limit_keeps_first_supplied_keys() {
        let store = AttributeStore::empty(limits(Some(2), None));
        store.set([("a", 1), ("b", 2), ("c", 3)]);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.get("a"), Some(&AttributeValue::from(1)));
        assert_eq!(snap.get("b"), Some(&AttributeValue::from(2)));
        assert!(!snap.contains_key("c"));
        assert_eq!(store.dropped_fields(), 1);
    }

    #[test]
    fn scalar_is_truncated_to_length_limit() {
        let store = AttributeStore::empty(limits(None, Some(3)));
        store.set([("name", "hello")]);
        assert_eq!(store.get("name"), Some(AttributeValue::from("hel")));
    }

    #[test]
    fn array_elements_are_truncated() {
        let store = AttributeStore::empty(limits(None, Some(2)));
        store.set([("tags", json!(["x", "yyyy"]))]);
        assert_eq!(store.get("tags"), Some(AttributeValue::from(vec!["x", "yy"])));
    }

    #[test]
    fn array_with_object_is_dropped_whole() {
        let store = AttributeStore::default();
        store.set([("bad", json!(["ok", {"nested": 1}]))]);
        assert!(!store.contains_key("bad"));
        assert_eq!(store.dropped_fields(), 1);
    }

    #[test]
    fn empty_key_falls_back_to_null() {
        let store = AttributeStore::default();
        store.set([("", "v")]);
        assert_eq!(store.get("null"), Some(AttributeValue::from("v")));
        assert_eq!(store.dropped_fields(), 0);
    }

    #[test]
    fn overwrite_at_limit_is_not_a_drop() {
        let store = AttributeStore::empty(limits(Some(1), None));
        store.set([("a", 1)]).set([("a", 2)]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a"), Some(AttributeValue::from(2)));
        assert_eq!(store.dropped_fields(), 0);
    }

    #[test]
    fn non_finite_floats_are_stored_not_dropped() {
        let store = AttributeStore::default();
        store.set([("ratio", f64::NAN), ("hi", f64::INFINITY), ("lo", f64::NEG_INFINITY)]);
        store.set([("typed", AttributeValue::from(f64::NAN))]);

        assert_eq!(store.dropped_fields(), 0);
        assert_eq!(store.len(), 4);
        for key in ["ratio", "typed"] {
            let stored = store.get(key);
            assert!(
                matches!(stored, Some(AttributeValue::Scalar(Scalar::Float(x))) if x.is_nan()),
                "{key} should hold NaN, got {stored:?}"
            );
        }
        assert_eq!(store.get("hi"), Some(AttributeValue::from(f64::INFINITY)));
        assert_eq!(store.get("lo"), Some(AttributeValue::from(f64::NEG_INFINITY)));
    }

    #[test]
    fn large_unsigned_values_keep_their_exact_value() {
        let store = AttributeStore::default();
        store.set([("id", u64::MAX - 1)]);
        store.set([("json_id", json!(u64::MAX))]);
        store.set([("small", json!(7u64))]);

        assert_eq!(store.get("id"), Some(AttributeValue::Scalar(Scalar::UInt(u64::MAX - 1))));
        assert_eq!(store.get("json_id"), Some(AttributeValue::Scalar(Scalar::UInt(u64::MAX))));
        assert_eq!(store.get("small"), Some(AttributeValue::Scalar(Scalar::Int(7))));
    }

    #[test]
    fn large_unsigned_value_truncates_like_other_scalars() {
        let store = AttributeStore::empty(limits(None, Some(4)));
        store.set([("id", u64::MAX), ("n", 1234u64)]);
        assert_eq!(store.get("id"), Some(AttributeValue::from("1844")));
        assert_eq!(store.get("n"), Some(AttributeValue::from(1234)));
    }

    #[test]
    fn absent_value_counts_one_drop() {
        let store = AttributeStore::default();
        store.set([("k", Value::Null)]);
        assert!(store.is_empty());
        assert_eq!(store.dropped_fields(), 1);
        store.set([("k", None::<&str>)]);
        assert_eq!(store.dropped_fields(), 2);
    }

    #[test]
    fn absent_value_does_not_remove_existing_key() {
        let store = AttributeStore::new([("k", "v")], AttributeLimits::UNBOUNDED);
        store.set([("k", Value::Null)]);
        assert_eq!(store.get("k"), Some(AttributeValue::from("v")));
        assert_eq!(store.dropped_fields(), 1);
    }

    #[test]
    fn object_value_is_dropped() {
        let store = AttributeStore::default();
        store.set([("obj", json!({"a": 1}))]);
        assert!(store.is_empty());
        assert_eq!(store.dropped_fields(), 1);
    }

    #[test]
    fn initial_load_counts_drops() {
        let initial: Pairs = vec![
            ("a", json!(1)),
            ("b", json!({"x": 1})),
            ("c", json!(3)),
            ("d", json!(4)),
        ];
        let store = AttributeStore::new(initial, limits(Some(2), None));
        assert_eq!(store.len(), 2);
        assert!(store.contains_key("a"));
        assert!(store.contains_key("c"));
        // "b" was malformed, "d" hit the count limit
        assert_eq!(store.dropped_fields(), 2);
    }

    #[test]
    fn count_check_runs_before_validation() {
        let store = AttributeStore::empty(limits(Some(1), None));
        store.set([("a", json!(1)), ("b", json!({"x": 1}))]);
        let sink = Arc::new(RecordingSink::default());
        let store = store.reporting_to(sink.clone());
        store.set([("c", json!({"x": 1}))]);
        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports[0].1.over_limit, 1);
        assert_eq!(reports[0].1.malformed, 0);
        assert_eq!(store.dropped_fields(), 2);
    }

    #[test]
    fn empty_set_changes_nothing() {
        let store = AttributeStore::new([("a", 1)], limits(Some(1), None));
        let before = store.snapshot();
        store.set(Pairs::new());
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.dropped_fields(), 0);
    }

    #[test]
    fn snapshot_is_independent() {
        let store = AttributeStore::new([("tags", vec!["a", "b"])], AttributeLimits::UNBOUNDED);
        let mut snap = store.snapshot();
        if let Some(AttributeValue::Array(items)) = snap.get_mut("tags") {
            items.push(Some(Scalar::from("c")));
        }
        snap.insert("extra".into(), AttributeValue::from(true));
        let fresh = store.snapshot();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh.get("tags"), Some(&AttributeValue::from(vec!["a", "b"])));
    }

    #[test]
    fn caller_value_is_not_aliased() {
        let store = AttributeStore::default();
        let mut tags = json!(["a"]);
        store.set([("tags", tags.clone())]);
        if let Value::Array(items) = &mut tags {
            items.push(json!("b"));
        }
        assert_eq!(store.get("tags"), Some(AttributeValue::from(vec!["a"])));
    }

    #[test]
    fn limits_hold_after_many_calls() {
        let store = AttributeStore::empty(limits(Some(3), Some(4)));
        for i in 0..10 {
            let key = format!("k{i}");
            store.set([(key.as_str(), json!(format!("value-{i}")))]);
            store.set([("list", json!(["abcdefgh", null, 123456]))]);
        }
        let snap = store.snapshot();
        assert!(snap.len() <= 3);
        let max = NonZeroUsize::new(4).unwrap().get();
        for value in snap.values() {
            match value {
                AttributeValue::Scalar(s) => assert!(s.char_len() <= max),
                AttributeValue::Array(items) => {
                    for s in items.iter().flatten() {
                        assert!(s.char_len() <= max);
                    }
                }
            }
        }
        // k0, k1, list fit; k2..k9 dropped
        assert_eq!(store.dropped_fields(), 8);
    }

    #[test]
    fn sink_gets_one_report_per_dropping_call() {
        let sink = Arc::new(RecordingSink::default());
        let store = AttributeStore::empty(limits(Some(1), None))
            .labelled("span")
            .reporting_to(sink.clone());
        store.set([("a", json!(1)), ("b", json!(2)), ("a", Value::Null)]);
        store.set([("a", json!(3))]);

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let (entity, report) = &reports[0];
        assert_eq!(entity, "span");
        assert_eq!(
            *report,
            DropReport {
                attempted: 3,
                stored: 1,
                over_limit: 1,
                absent: 1,
                malformed: 0,
            }
        );
    }

    #[test]
    fn sink_choice_does_not_change_results() {
        let pairs = || -> Pairs { vec![("a", json!(1)), ("b", json!(null)), ("c", json!("long"))] };
        let quiet = AttributeStore::new(pairs(), limits(Some(2), Some(2)));
        let (_events, _guard) = install_capture();
        let loud = AttributeStore::with_sink(pairs(), limits(Some(2), Some(2)), Arc::new(TracingSink));
        assert_eq!(quiet.snapshot(), loud.snapshot());
        assert_eq!(quiet.dropped_fields(), loud.dropped_fields());
    }

    #[test]
    fn tracing_sink_reports_initial_load() {
        let (events, _guard) = install_capture();
        let dropped = AttributeStore::empty(limits(Some(1), None))
            .labelled("resource")
            .reporting_to(Arc::new(TracingSink))
            .set([("a", 1), ("b", 2)])
            .dropped_fields();
        assert_eq!(dropped, 1);
        let events = events.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fields.get("entity").map(String::as_str), Some("\"resource\""));
        assert_eq!(events[0].fields.get("over_limit").map(String::as_str), Some("1"));
    }

    #[test]
    fn store_is_shareable_across_threads() {
        let store = Arc::new(AttributeStore::empty(limits(Some(8), None)));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..4 {
                        store.set([(format!("t{t}-{i}"), i)]);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 8);
        assert_eq!(store.dropped_fields(), 8);
    }
}
