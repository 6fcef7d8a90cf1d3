use crate::Context;
use futures_core::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::Context as TaskContext;
use std::task::Poll;

impl<T: std::future::Future> std::future::Future for WithContext<T> {
    type Output = T::Output;

    fn poll(self: Pin<&mut Self>, task_cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = this.cx.clone().attach();

        this.inner.poll(task_cx)
    }
}

impl<T: Stream> Stream for WithContext<T> {
    type Item = T::Item;

    fn poll_next(self: Pin<&mut Self>, task_cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let _guard = this.cx.clone().attach();
        T::poll_next(this.inner, task_cx)
    }
}

pin_project! {
    /// A future or stream that has an associated context.
    ///
    /// The context is attached to the polling thread for the duration of every
    /// poll, so [`Context::current`] inside the wrapped code sees it even when
    /// the task moves between threads.
    #[derive(Clone, Debug)]
    pub struct WithContext<T> {
        #[pin]
        inner: T,
        cx: Context,
    }
}

impl<T> WithContext<T> {
    /// The context attached to the wrapped value.
    pub fn context(&self) -> &Context {
        &self.cx
    }
}

// The following two extension traits are _almost_ identical,
// but need to be separate to avoid overlapping implementation errors.

impl<F: std::future::Future> FutureContextExt for F {}
/// Extension trait allowing futures to carry a [`Context`].
pub trait FutureContextExt: Sized {
    /// Attaches the provided [`Context`] to this future, returning a `WithContext`
    /// wrapper.
    ///
    /// When the wrapped future is polled, the attached context will be set as current.
    fn with_context(self, cx: Context) -> WithContext<Self> {
        WithContext { inner: self, cx }
    }

    /// Attaches the current [`Context`] to this future, returning a `WithContext`
    /// wrapper.
    fn with_current_context(self) -> WithContext<Self> {
        let cx = Context::current();
        self.with_context(cx)
    }
}

impl<S: Stream> StreamContextExt for S {}
/// Extension trait allowing streams to carry a [`Context`].
pub trait StreamContextExt: Sized {
    /// Attaches the provided [`Context`] to this stream, returning a `WithContext`
    /// wrapper.
    ///
    /// When the wrapped stream is polled, the attached context will be set as current.
    fn with_context(self, cx: Context) -> WithContext<Self> {
        WithContext { inner: self, cx }
    }

    /// Attaches the current [`Context`] to this stream, returning a `WithContext`
    /// wrapper.
    fn with_current_context(self) -> WithContext<Self> {
        let cx = Context::current();
        self.with_context(cx)
    }
}
