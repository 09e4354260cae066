use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::context::Data;

/// Continuation handed to a middleware: runs the rest of the onion.
pub type Next<'n, T> = &'n dyn Fn(&mut Data<'_>) -> anyhow::Result<T>;

/// A fully wrapped callable ready to be invoked with a dispatch context.
pub type Chain<'c, T> = Box<dyn Fn(&mut Data<'_>) -> anyhow::Result<T> + 'c>;

type MiddlewareFn<T> =
    dyn Fn(&mut Data<'_>, Next<'_, T>) -> anyhow::Result<T> + Send + Sync;

/// Continuation-style middleware.
///
/// `T` is what the wrapped chain yields: [`crate::Outcome`] for outer
/// middleware (around admission and dispatch) and [`crate::Reply`] for inner
/// middleware (around the handler only). A middleware may mutate the context
/// before and after calling `next`, or not call it at all.
pub struct Middleware<T> {
    callback: Arc<MiddlewareFn<T>>,
    label: Cow<'static, str>,
}

impl<T> Clone for Middleware<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
            label: self.label.clone(),
        }
    }
}

impl<T> fmt::Debug for Middleware<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").field("label", &self.label).finish()
    }
}

impl<T: 'static> Middleware<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Data<'_>, Next<'_, T>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(f),
            label: Cow::Borrowed(std::any::type_name::<F>()),
        }
    }

    #[must_use]
    pub fn labelled(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// True if both handles point at the same underlying callable.
    #[must_use]
    pub fn same_as(&self, other: &Middleware<T>) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

/// Wrap `terminal` in `middlewares`, first-registered outermost.
///
/// Folds in reverse so the first middleware ends up as the outer layer of the
/// onion: it sees the context before every later middleware and the terminal,
/// and sees their mutations after `next` returns.
pub fn wrap<'c, T, I>(middlewares: I, terminal: Chain<'c, T>) -> Chain<'c, T>
where
    T: 'c,
    I: IntoIterator<Item = &'c Middleware<T>>,
    I::IntoIter: DoubleEndedIterator,
{
    middlewares.into_iter().rev().fold(terminal, |next, mw| {
        Box::new(move |data: &mut Data<'_>| (mw.callback)(data, &*next))
    })
}
