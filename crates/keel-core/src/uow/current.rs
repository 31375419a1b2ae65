use crate::uow::{UnitOfWork, UnitOfWorkInner};
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

// Per-thread stack of units of work; the top live entry is "current".
// Entries are weak so an abandoned unit of work does not stay current.
thread_local! {
    static CURRENT: RefCell<Vec<Weak<UnitOfWorkInner>>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn push(inner: &Rc<UnitOfWorkInner>) {
    CURRENT.with(|stack| stack.borrow_mut().push(Rc::downgrade(inner)));
}

/// Remove the most recent entry for `inner`. Returns false if absent.
pub(crate) fn remove(inner: &Rc<UnitOfWorkInner>) -> bool {
    let weak = Rc::downgrade(inner);
    CURRENT.with(|stack| {
        let mut stack = stack.borrow_mut();
        match stack.iter().rposition(|entry| Weak::ptr_eq(entry, &weak)) {
            Some(pos) => {
                stack.remove(pos);
                true
            }
            None => false,
        }
    })
}

/// Drop every entry for `inner`.
pub(crate) fn remove_all(inner: &Rc<UnitOfWorkInner>) {
    let weak = Rc::downgrade(inner);
    CURRENT.with(|stack| stack.borrow_mut().retain(|entry| !Weak::ptr_eq(entry, &weak)));
}

pub(crate) fn top() -> Option<Rc<UnitOfWorkInner>> {
    CURRENT.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.retain(|entry| entry.strong_count() > 0);
        stack.last().and_then(Weak::upgrade)
    })
}

///
/// CurrentGuard
///
/// Keeps a unit of work current until dropped, including on unwind.
///

#[must_use = "the unit of work stops being current when the guard drops"]
pub struct CurrentGuard {
    inner: Rc<UnitOfWorkInner>,
}

impl CurrentGuard {
    pub(crate) fn enter(inner: &Rc<UnitOfWorkInner>) -> Self {
        push(inner);

        Self {
            inner: Rc::clone(inner),
        }
    }
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        remove(&self.inner);
    }
}

/// Run `f` with `uow` as the current unit of work.
pub fn with_unit_of_work<T>(uow: &UnitOfWork, f: impl FnOnce() -> T) -> T {
    let _guard = uow.enter();
    f()
}
