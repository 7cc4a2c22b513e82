use std::{
    pin::Pin,
    task::{self, Poll},
};

use axum::body::Bytes;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

use crate::finalizer::Finalizer;

pin_project! {
    /// Response body of an instrumented request.
    ///
    /// Counts the bytes written to the client while attaching the request span as the current
    /// context. The span ends and the metrics are recorded at the end of the stream, or when the
    /// body is dropped before that.
    pub struct InstrumentedBody<B> {
        #[pin]
        inner: B,
        finalizer: Option<Finalizer>,
    }
}

impl<B> InstrumentedBody<B> {
    /// A body of an excluded request, left untouched.
    pub(crate) fn passthrough(inner: B) -> Self {
        Self { inner, finalizer: None }
    }

    pub(crate) fn instrumented(inner: B, finalizer: Finalizer) -> Self {
        Self {
            inner,
            finalizer: Some(finalizer),
        }
    }
}

impl<B> Body for InstrumentedBody<B>
where
    B: Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        task: &mut task::Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();

        let Some(cx) = this.finalizer.as_ref().map(|finalizer| finalizer.context().clone()) else {
            return this.inner.poll_frame(task);
        };

        let _guard = cx.attach();
        let poll = this.inner.as_mut().poll_frame(task);

        let finished = match &poll {
            Poll::Ready(Some(Ok(frame))) => {
                if let (Some(data), Some(finalizer)) = (frame.data_ref(), this.finalizer.as_mut()) {
                    finalizer.observe_data(data.len());
                }

                this.inner.is_end_stream()
            }
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => true,
            Poll::Pending => false,
        };

        if finished {
            this.finalizer.take();
        }

        poll
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
