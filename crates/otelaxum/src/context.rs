use std::{
    future::Future,
    pin::Pin,
    task::{self, Poll},
};

use opentelemetry::Context;
use pin_project_lite::pin_project;

pin_project! {
    /// Attaches a context as the current one while the inner future is polled.
    ///
    /// The previous context is restored at the end of every poll, including when the inner future
    /// panics.
    pub(crate) struct WithContext<F> {
        #[pin]
        inner: F,
        cx: Context,
    }
}

impl<F> WithContext<F> {
    pub(crate) fn new(inner: F, cx: Context) -> Self {
        Self { inner, cx }
    }
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, task: &mut task::Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = this.cx.clone().attach();

        this.inner.poll(task)
    }
}
