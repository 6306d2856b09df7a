//! Idempotent teardown handles.

use std::cell::RefCell;
use std::fmt;

type Release = Box<dyn FnOnce()>;

/// Tears down a subscription.
///
/// Every subscribing operation (`watch`, `derive`, `persist`) returns one.
/// Dropping a `Disposer` does *not* dispose it: subscriptions live until
/// [`dispose`](Self::dispose) is called. Calling `dispose` more than once is
/// a no-op.
#[must_use = "a subscription can only be released through its disposer"]
pub struct Disposer {
    release: RefCell<Option<Release>>,
}

impl Disposer {
    /// Create a disposer that runs `release` exactly once.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: RefCell::new(Some(Box::new(release))),
        }
    }

    /// A disposer with nothing to release.
    pub fn noop() -> Self {
        Self {
            release: RefCell::new(None),
        }
    }

    /// Combine several disposers into one.
    ///
    /// Every part is released, in order, even if an earlier part panics; the
    /// first panic is resumed once all parts have run.
    pub fn all(parts: Vec<Disposer>) -> Self {
        Self::new(move || {
            let mut first_panic = None;
            for part in parts {
                let outcome =
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| part.dispose()));
                if let Err(payload) = outcome {
                    log::warn!("disposer panicked; releasing the rest");
                    first_panic.get_or_insert(payload);
                }
            }
            if let Some(payload) = first_panic {
                std::panic::resume_unwind(payload);
            }
        })
    }

    /// Release the subscription. Later calls do nothing.
    pub fn dispose(&self) {
        let release = self.release.borrow_mut().take();
        if let Some(release) = release {
            release();
        }
    }

    /// Whether there is nothing left to release.
    pub fn is_disposed(&self) -> bool {
        self.release.borrow().is_none()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
