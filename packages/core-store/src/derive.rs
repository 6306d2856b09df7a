//! Derived values.
//!
//! A derived key is recomputed from the current values of its dependency
//! keys. Dependency watches only request a recompute; the recompute itself
//! runs on the frame clock, so several dependency writes landing in one
//! frame collapse into a single computation.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use nodestate_host::FrameClock;
use serde_json::Value;

use crate::scope::Access;
use crate::store::WeakStateStore;
use crate::{observe, Disposer, Error, Options, Result, StateStore};

type Compute = Box<dyn Fn(&[Option<Value>]) -> Value>;

struct Derivation {
    store: WeakStateStore,
    key: String,
    deps: Vec<String>,
    options: Options,
    compute: Compute,
    scheduled: Cell<bool>,
    active: Cell<bool>,
}

impl Derivation {
    /// Ask for a recompute on the next frame. Repeated requests before that
    /// frame are absorbed.
    fn schedule(self: &Rc<Self>) {
        if !self.active.get() || self.scheduled.replace(true) {
            return;
        }
        let Some(store) = self.store.upgrade() else {
            return;
        };

        let weak: Weak<Derivation> = Rc::downgrade(self);
        let requested = store.clock().request_frame(Box::new(move || {
            if let Some(derivation) = weak.upgrade() {
                derivation.scheduled.set(false);
                if let Err(e) = derivation.recompute() {
                    log::warn!("recomputing {:?}: {}", derivation.key, e);
                }
            }
        }));
        if let Err(e) = requested {
            self.scheduled.set(false);
            log::warn!("cannot schedule recompute of {:?}: {}", self.key, e);
        }
    }

    /// Read every dependency and write the computed value.
    ///
    /// The write is skipped when the stored value already equals the
    /// computed one: writing the derived key is itself a mutation of the
    /// watched node, and an unchanged write must not feed back into another
    /// computation.
    fn recompute(&self) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }
        let Some(store) = self.store.upgrade() else {
            return Ok(());
        };

        let inputs = self
            .deps
            .iter()
            .map(|dep| store.get(dep, &self.options))
            .collect::<Result<Vec<_>>>()?;

        let computed = panic::catch_unwind(AssertUnwindSafe(|| (self.compute)(&inputs)));
        let value = match computed {
            Ok(value) => value,
            Err(_) => {
                log::error!("compute for {:?} panicked; keeping previous value", self.key);
                return Ok(());
            }
        };

        if store.get(&self.key, &self.options)?.as_ref() == Some(&value) {
            log::trace!("derived {:?} already up to date", self.key);
            return Ok(());
        }

        log::debug!("derived {:?} recomputed", self.key);
        let write = self.options.clone().with_immediate(true);
        store.set(&self.key, value, &write)
    }
}

/// Keep `key` equal to `compute` applied to the current values of `deps`.
pub(crate) fn derive<F>(
    store: &StateStore,
    key: &str,
    deps: &[&str],
    compute: F,
    options: &Options,
) -> Result<Disposer>
where
    F: Fn(&[Option<Value>]) -> Value + 'static,
{
    let resolved = store
        .resolve(key, options, Access::Watch)?
        .ok_or(Error::MissingTarget)?;
    let options = options.clone().with_target(resolved.node);

    let derivation = Rc::new(Derivation {
        store: store.downgrade(),
        key: key.to_string(),
        deps: deps.iter().map(|d| d.to_string()).collect(),
        options,
        compute: Box::new(compute),
        scheduled: Cell::new(false),
        active: Cell::new(true),
    });

    let mut watches = Vec::with_capacity(deps.len());
    for dep in deps {
        let trigger = Rc::clone(&derivation);
        let watched = observe::watch(store, dep, move |_| trigger.schedule(), &derivation.options);
        match watched {
            Ok(disposer) => watches.push(disposer),
            Err(e) => {
                Disposer::all(watches).dispose();
                return Err(e);
            }
        }
    }

    if let Err(e) = derivation.recompute() {
        Disposer::all(watches).dispose();
        return Err(e);
    }

    let watches = Disposer::all(watches);
    Ok(Disposer::new(move || {
        derivation.active.set(false);
        watches.dispose();
        log::debug!("derived {:?} released", derivation.key);
    }))
}
