use std::sync::Arc;

use parking_lot::Mutex;

/// Number of idle recorders a pool keeps around for reuse.
pub const DEFAULT_MAX_IDLE: usize = 256;

/// What the response path of a single request looked like.
///
/// The first status-setting operation wins: either an explicit status, or the implicit `200 OK` of
/// a body written without one. Later status changes are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecorder {
    status: u16,
    written: bool,
    size: u64,
}

impl Default for ResponseRecorder {
    fn default() -> Self {
        Self {
            status: 200,
            written: false,
            size: 0,
        }
    }
}

impl ResponseRecorder {
    /// Record the response status, unless the response was already written.
    pub fn write_header(&mut self, status: u16) {
        if !self.written {
            self.written = true;
            self.status = status;
        }
    }

    /// Record `len` bytes of response body.
    pub fn write(&mut self, len: usize) {
        self.written = true;
        self.size = self.size.saturating_add(len as u64);
    }

    /// The captured status, `200` until something was written.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether a status or body bytes were written.
    pub fn written(&self) -> bool {
        self.written
    }

    /// Number of body bytes written.
    pub fn size(&self) -> u64 {
        self.size
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A pool of reusable [`ResponseRecorder`]s.
#[derive(Debug)]
pub struct RecorderPool {
    idle: Mutex<Vec<Box<ResponseRecorder>>>,
    max_idle: usize,
}

impl Default for RecorderPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

impl RecorderPool {
    /// A pool keeping at most `max_idle` recorders between requests.
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Check out a recorder in its initial state. It goes back to the pool when the guard drops.
    pub fn acquire(self: &Arc<Self>) -> PooledRecorder {
        let recorder = self.idle.lock().pop();

        let recorder = match recorder {
            Some(mut recorder) => {
                recorder.reset();
                recorder
            }
            None => Box::default(),
        };

        PooledRecorder {
            recorder: Some(recorder),
            pool: Arc::clone(self),
        }
    }

    /// Number of recorders waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, recorder: Box<ResponseRecorder>) {
        let mut idle = self.idle.lock();

        if idle.len() < self.max_idle {
            idle.push(recorder);
        }
    }
}

/// A recorder checked out of a [`RecorderPool`], owned by exactly one request.
#[derive(Debug)]
pub struct PooledRecorder {
    recorder: Option<Box<ResponseRecorder>>,
    pool: Arc<RecorderPool>,
}

impl PooledRecorder {
    /// See [`ResponseRecorder::write_header`].
    pub fn write_header(&mut self, status: u16) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.write_header(status);
        }
    }

    /// See [`ResponseRecorder::write`].
    pub fn write(&mut self, len: usize) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.write(len);
        }
    }

    /// See [`ResponseRecorder::status`].
    pub fn status(&self) -> u16 {
        self.recorder.as_ref().map_or(200, |recorder| recorder.status())
    }

    /// See [`ResponseRecorder::written`].
    pub fn written(&self) -> bool {
        self.recorder.as_ref().is_some_and(|recorder| recorder.written())
    }

    /// See [`ResponseRecorder::size`].
    pub fn size(&self) -> u64 {
        self.recorder.as_ref().map_or(0, |recorder| recorder.size())
    }
}

impl Drop for PooledRecorder {
    fn drop(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            self.pool.release(recorder);
        }
    }
}
