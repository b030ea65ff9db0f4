//! The transactional extension of a single observable cell.
//!
//! An [`Editable`] shares the cell's signal and adds one level of
//! transaction state: a baseline captured by [`Editable::begin_edit`], kept
//! by [`Editable::commit`] or written back by [`Editable::rollback`].
//! Every operation is a no-op outside the state it applies to.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Deserialize;

use super::equality::EqualityStrategy;
use super::ScopeId;
use crate::config::ScalarEquality;
use crate::graph::Value;
use crate::reactive::{Memo, Signal};

/// How a cell is extended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOptions {
    /// `false` marks the cell non-editable without installing transactions.
    pub enable: bool,
    /// Scope to register into; `None` leaves the cell unregistered.
    pub scope: Option<ScopeId>,
}

impl EditOptions {
    /// Enabled and registered under `scope`.
    pub fn in_scope(scope: impl Into<ScopeId>) -> Self {
        Self {
            enable: true,
            scope: Some(scope.into()),
        }
    }

    /// Enabled but not registered in any scope.
    pub fn unscoped() -> Self {
        Self {
            enable: true,
            scope: None,
        }
    }

    /// Marks the cell non-editable.
    pub fn disabled() -> Self {
        false.into()
    }

    /// Parse loosely shaped options.
    ///
    /// Accepts a boolean shorthand or `{ "enable": bool, "scope": string | false }`.
    /// Anything malformed falls back to the defaults rather than failing.
    pub fn from_json(json: &serde_json::Value) -> Self {
        serde_json::from_value::<RawOptions>(json.clone())
            .map(Self::from)
            .unwrap_or_default()
    }
}

impl Default for EditOptions {
    fn default() -> Self {
        Self::in_scope(ScopeId::DEFAULT)
    }
}

impl From<bool> for EditOptions {
    fn from(enable: bool) -> Self {
        Self {
            enable,
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOptions {
    Flag(bool),
    Config {
        #[serde(default)]
        enable: Option<bool>,
        #[serde(default)]
        scope: Option<RawScope>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScope {
    Name(String),
    Flag(bool),
}

impl From<RawOptions> for EditOptions {
    fn from(raw: RawOptions) -> Self {
        match raw {
            RawOptions::Flag(enable) => enable.into(),
            RawOptions::Config { enable, scope } => Self {
                enable: enable.unwrap_or(true),
                scope: match scope {
                    Some(RawScope::Name(name)) => Some(ScopeId::from(name)),
                    Some(RawScope::Flag(false)) => None,
                    Some(RawScope::Flag(true)) | None => Some(ScopeId::DEFAULT),
                },
            },
        }
    }
}

/// Transaction phases held in `Transaction::phase`.
///
/// `OPENING` and `CLOSING` cover the window in which `begin_edit`,
/// `commit` or `rollback` write signals. Handlers re-entering the cell from
/// those notifications, or threads racing them, see a busy guard and do
/// nothing, so `in_transaction` only ever changes under the guard.
const IDLE: u8 = 0;
const OPENING: u8 = 1;
const OPEN: u8 = 2;
const CLOSING: u8 = 3;

struct Baseline {
    value: Value,
    strategy: EqualityStrategy,
}

struct Transaction {
    /// Compare-and-set guard: at most one transaction per cell.
    phase: AtomicU8,
    /// Reactive mirror of the guard, true from `OPENING` until `CLOSING`
    /// ends. Read by `has_changes`.
    in_transaction: Signal<bool>,
    baseline: Mutex<Baseline>,
    policy: ScalarEquality,
    has_changes: Memo<bool>,
}

struct EditableInner {
    cell: Signal<Value>,
    scope: Option<ScopeId>,
    /// `None` for cells extended with `enable: false`.
    transaction: Option<Transaction>,
}

impl Transaction {
    fn enter(&self, from: u8, to: u8) -> bool {
        self.phase
            .compare_exchange(from, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl EditableInner {
    fn compute_has_changes(&self) -> bool {
        let Some(tx) = &self.transaction else {
            return false;
        };
        if !tx.in_transaction.get() {
            return false;
        }
        let current = self.cell.get();
        let baseline = tx.baseline.lock();
        !baseline.strategy.equals(&current, &baseline.value)
    }
}

/// Transactional handle for one observable cell. Clones share state.
#[derive(Clone)]
pub struct Editable {
    inner: Arc<EditableInner>,
}

impl Editable {
    pub(crate) fn new(cell: &Signal<Value>, options: &EditOptions, policy: ScalarEquality) -> Self {
        if !options.enable {
            return Self {
                inner: Arc::new(EditableInner {
                    cell: cell.clone(),
                    scope: None,
                    transaction: None,
                }),
            };
        }

        let inner = Arc::new_cyclic(|weak: &Weak<EditableInner>| {
            let weak = weak.clone();
            let has_changes =
                Memo::new(move || weak.upgrade().is_some_and(|inner| inner.compute_has_changes()));

            EditableInner {
                cell: cell.clone(),
                scope: options.scope.clone(),
                transaction: Some(Transaction {
                    phase: AtomicU8::new(IDLE),
                    in_transaction: Signal::new(false),
                    baseline: Mutex::new(Baseline {
                        value: Value::Undefined,
                        strategy: EqualityStrategy::Scalar(policy),
                    }),
                    policy,
                    has_changes,
                }),
            }
        });

        Self { inner }
    }

    /// Identity of the underlying cell.
    pub fn id(&self) -> u64 {
        self.inner.cell.id()
    }

    /// Whether transactions are installed on this cell.
    pub fn is_enabled(&self) -> bool {
        self.inner.transaction.is_some()
    }

    /// Scope the cell was registered under at extension time.
    pub fn scope(&self) -> Option<&ScopeId> {
        self.inner.scope.as_ref()
    }

    /// Current value of the cell.
    pub fn value(&self) -> Value {
        self.inner.cell.get()
    }

    /// Capture the current value as baseline and open a transaction.
    ///
    /// Does nothing while a transaction is open, opening or closing, so the
    /// first baseline survives repeated calls.
    pub fn begin_edit(&self) {
        let Some(tx) = &self.inner.transaction else {
            return;
        };
        if !tx.enter(IDLE, OPENING) {
            return;
        }

        let value = self.inner.cell.get_untracked();
        let strategy = EqualityStrategy::for_baseline(&value, tx.policy);
        *tx.baseline.lock() = Baseline { value, strategy };

        tracing::trace!(cell = self.id(), ?strategy, "begin edit");
        tx.in_transaction.set(true);
        tx.phase.store(OPEN, Ordering::SeqCst);
    }

    /// Accept the current value and close the transaction.
    pub fn commit(&self) {
        let Some(tx) = &self.inner.transaction else {
            return;
        };
        if !tx.enter(OPEN, CLOSING) {
            return;
        }

        tracing::trace!(cell = self.id(), "commit");
        tx.in_transaction.set(false);
        tx.phase.store(IDLE, Ordering::SeqCst);
    }

    /// Write the baseline back into the cell and close the transaction.
    ///
    /// The transaction stays open while the cell notifies, so handlers see
    /// `in_transaction() == true` and cannot start a new edit until the
    /// rollback has finished.
    pub fn rollback(&self) {
        let Some(tx) = &self.inner.transaction else {
            return;
        };
        if !tx.enter(OPEN, CLOSING) {
            return;
        }

        let baseline = tx.baseline.lock().value.clone();
        tracing::trace!(cell = self.id(), "rollback");
        self.inner.cell.set(baseline);
        tx.in_transaction.set(false);
        tx.phase.store(IDLE, Ordering::SeqCst);
    }

    /// The captured baseline. Stale once the transaction has closed.
    pub fn old_value(&self) -> Value {
        self.inner
            .transaction
            .as_ref()
            .map(|tx| tx.baseline.lock().value.clone())
            .unwrap_or_default()
    }

    /// Whether a transaction is open. Tracked inside a reactive context.
    pub fn in_transaction(&self) -> bool {
        self.inner
            .transaction
            .as_ref()
            .is_some_and(|tx| tx.in_transaction.get())
    }

    /// Open transaction whose value differs from its baseline.
    ///
    /// Backed by a lazily recomputed memo.
    pub fn has_changes(&self) -> bool {
        self.inner
            .transaction
            .as_ref()
            .is_some_and(|tx| tx.has_changes.get())
    }

    /// The derived change flag itself, for composing further memos.
    pub fn has_changes_memo(&self) -> Option<Memo<bool>> {
        self.inner.transaction.as_ref().map(|tx| tx.has_changes.clone())
    }

    /// The strategy chosen by the latest `begin_edit`.
    pub fn equality_strategy(&self) -> Option<EqualityStrategy> {
        self.inner
            .transaction
            .as_ref()
            .map(|tx| tx.baseline.lock().strategy)
    }

    pub fn ptr_eq(&self, other: &Editable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Editable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editable")
            .field("cell", &self.id())
            .field("enabled", &self.is_enabled())
            .field("scope", &self.scope())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use serde_json::json;

    fn phase(editable: &Editable) -> u8 {
        editable
            .inner
            .transaction
            .as_ref()
            .map_or(IDLE, |tx| tx.phase.load(Ordering::SeqCst))
    }

    fn editable(value: impl Into<Value>) -> (Signal<Value>, Editable) {
        let cell = Signal::new(value.into());
        let editable = Editable::new(&cell, &EditOptions::unscoped(), ScalarEquality::Loose);
        (cell, editable)
    }

    #[test]
    fn rollback_restores_and_closes() {
        let (cell, editable) = editable("A");
        editable.begin_edit();
        cell.set(Value::from("B"));
        editable.rollback();

        assert_eq!(cell.get(), Value::from("A"));
        assert!(!editable.in_transaction());
    }

    #[test]
    fn second_begin_keeps_first_baseline() {
        let (cell, editable) = editable(1);
        editable.begin_edit();
        cell.set(Value::from(2));
        editable.begin_edit();

        assert_eq!(editable.old_value(), Value::from(1));
        editable.rollback();
        assert_eq!(cell.get(), Value::from(1));
    }

    #[test]
    fn operations_outside_a_transaction_are_noops() {
        let (cell, editable) = editable(5);
        editable.commit();
        editable.rollback();

        assert_eq!(cell.get(), Value::from(5));
        assert!(!editable.in_transaction());
        assert!(!editable.has_changes());
    }

    #[test]
    fn has_changes_tracks_edits() {
        let (cell, editable) = editable("A");
        assert!(!editable.has_changes());

        editable.begin_edit();
        assert!(!editable.has_changes());

        cell.set(Value::from("B"));
        assert!(editable.has_changes());

        cell.set(Value::from("A"));
        assert!(!editable.has_changes());

        cell.set(Value::from("B"));
        editable.commit();
        assert!(!editable.has_changes());
    }

    #[test]
    fn array_baseline_is_a_snapshot() {
        let (cell, editable) = editable(vec![1, 2, 3]);
        editable.begin_edit();
        assert_eq!(editable.equality_strategy(), Some(EqualityStrategy::Sequence));

        cell.set(Value::from(vec![1, 2, 3]));
        assert!(!editable.has_changes());

        cell.set(Value::from(vec![1, 2]));
        assert!(editable.has_changes());
        assert_eq!(editable.old_value(), Value::from(vec![1, 2, 3]));
    }

    #[test]
    fn strategy_is_reselected_per_transaction() {
        let (cell, editable) = editable(vec![1]);
        editable.begin_edit();
        cell.set(Value::from(7));
        editable.commit();

        editable.begin_edit();
        assert_eq!(
            editable.equality_strategy(),
            Some(EqualityStrategy::Scalar(ScalarEquality::Loose))
        );
        cell.set(Value::from("7"));
        assert!(!editable.has_changes());
    }

    #[test]
    fn disabled_cells_never_open_transactions() {
        let cell = Signal::new(Value::from(1));
        let editable = Editable::new(&cell, &EditOptions::disabled(), ScalarEquality::Loose);

        editable.begin_edit();
        cell.set(Value::from(2));
        editable.rollback();

        assert!(!editable.is_enabled());
        assert!(!editable.in_transaction());
        assert!(!editable.has_changes());
        assert_eq!(cell.get(), Value::from(2));
    }

    #[test]
    fn options_parse_permissively() {
        assert_eq!(EditOptions::from_json(&json!(false)), EditOptions::disabled());
        assert_eq!(EditOptions::from_json(&json!({ "scope": "orders" })), EditOptions::in_scope("orders"));
        assert_eq!(EditOptions::from_json(&json!({ "scope": false })), EditOptions::unscoped());
        assert_eq!(
            EditOptions::from_json(&json!({ "enable": false, "scope": "x" })),
            EditOptions { enable: false, scope: Some(ScopeId::from("x")) }
        );
        assert_eq!(EditOptions::from_json(&json!({ "enable": "yes" })), EditOptions::default());
        assert_eq!(EditOptions::from_json(&json!(42)), EditOptions::default());
    }

    #[test]
    fn handler_restarting_an_edit_during_rollback_is_ignored() {
        let (cell, editable) = editable("A");
        let handler = editable.clone();
        let reader = cell.clone();
        let _effect = Effect::new(move || {
            let _ = reader.get();
            handler.begin_edit();
        });
        assert!(editable.in_transaction());

        cell.set(Value::from("B"));
        editable.rollback();

        assert_eq!(cell.get(), Value::from("A"));
        assert!(!editable.in_transaction());
        assert_eq!(phase(&editable), IDLE);

        editable.begin_edit();
        cell.set(Value::from("C"));
        assert!(editable.in_transaction());
        assert!(editable.has_changes());
        assert_eq!(editable.old_value(), Value::from("A"));
    }

    #[test]
    fn handler_watching_the_flag_cannot_reopen_during_commit() {
        let (cell, editable) = editable(1);
        let handler = editable.clone();
        let _effect = Effect::new(move || {
            if !handler.in_transaction() {
                handler.begin_edit();
            }
        });
        assert!(editable.in_transaction());

        cell.set(Value::from(2));
        editable.commit();

        assert!(!editable.in_transaction());
        assert_eq!(phase(&editable), IDLE);

        editable.begin_edit();
        assert!(editable.in_transaction());
        assert_eq!(phase(&editable), OPEN);
    }

    #[test]
    fn concurrent_transitions_keep_the_mirror_in_step() {
        let (cell, editable) = editable(0);

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let editable = &editable;
                let cell = &cell;
                scope.spawn(move || {
                    for round in 0..500 {
                        editable.begin_edit();
                        cell.set(Value::from(worker * 1000 + round));
                        if round % 2 == 0 {
                            editable.rollback();
                        } else {
                            editable.commit();
                        }
                    }
                });
            }
        });

        let open = phase(&editable) == OPEN;
        assert!(matches!(phase(&editable), IDLE | OPEN));
        assert_eq!(editable.in_transaction(), open);

        editable.rollback();
        assert!(!editable.in_transaction());
        editable.begin_edit();
        assert!(editable.in_transaction());
    }
}
