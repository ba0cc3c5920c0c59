//! Camera scanning with exclusive device access.
//!
//! A [`Scanner`] owns one camera. [`Scanner::try_acquire`] hands out a
//! [`ScanSession`] holding the camera lock; the camera is released when the
//! session ends, however it ends: decoded, cancelled, stream exhausted,
//! errored, or dropped mid-scan.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use super::{decode_frame, GrayFrame};
use crate::error::{AppError, Result};

#[async_trait]
pub trait FrameSource: Send {
    /// Next frame from the device, `None` once the stream has ended.
    async fn next_frame(&mut self) -> Result<Option<GrayFrame>>;

    /// Stop the stream. Called once per session when it ends.
    fn release(&mut self);
}

/// Frames captured ahead of time, e.g. snapshots uploaded from a phone
/// camera.
#[derive(Debug, Default)]
pub struct StillFrames {
    frames: VecDeque<GrayFrame>,
    released: usize,
}

impl StillFrames {
    pub fn new(frames: impl IntoIterator<Item = GrayFrame>) -> Self {
        Self { frames: frames.into_iter().collect(), released: 0 }
    }

    /// How many sessions have released this source.
    pub fn release_count(&self) -> usize {
        self.released
    }
}

#[async_trait]
impl FrameSource for StillFrames {
    async fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        Ok(self.frames.pop_front())
    }

    fn release(&mut self) {
        self.released += 1;
    }
}

pub struct Scanner<S> {
    camera: Arc<Mutex<S>>,
}

impl<S> Clone for Scanner<S> {
    fn clone(&self) -> Self {
        Self { camera: self.camera.clone() }
    }
}

impl<S: FrameSource + 'static> Scanner<S> {
    pub fn new(source: S) -> Self {
        Self { camera: Arc::new(Mutex::new(source)) }
    }

    /// Fails with [`AppError::CameraBusy`] while another session is live.
    pub fn try_acquire(&self) -> Result<ScanSession<S>> {
        let guard = self
            .camera
            .clone()
            .try_lock_owned()
            .map_err(|_| AppError::CameraBusy)?;
        tracing::debug!("Camera acquired for scan session");
        Ok(ScanSession { camera: Some(guard) })
    }

    pub fn is_busy(&self) -> bool {
        self.camera.try_lock().is_err()
    }

    /// Runs `f` against the idle camera, e.g. to inspect a test source.
    pub async fn with_camera<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        let camera = self.camera.lock().await;
        f(&camera)
    }
}

pub struct ScanSession<S: FrameSource> {
    camera: Option<OwnedMutexGuard<S>>,
}

impl<S: FrameSource> ScanSession<S> {
    /// Pulls frames until one decodes. Frames without a readable code are
    /// skipped.
    pub async fn scan(mut self, cancel: &CancellationToken) -> Result<String> {
        let result = match self.camera.as_mut() {
            Some(camera) => Self::read_until_decoded(camera, cancel).await,
            None => Err(AppError::Internal("Scan session has no camera".to_string())),
        };
        self.release();
        result
    }

    async fn read_until_decoded(camera: &mut OwnedMutexGuard<S>, cancel: &CancellationToken) -> Result<String> {
        let mut frames_seen = 0usize;
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AppError::Cancelled),
                frame = camera.next_frame() => frame?,
            };
            let Some(frame) = frame else {
                return Err(AppError::Qr(if frames_seen == 0 {
                    "No image was captured".to_string()
                } else {
                    "No QR code found in the captured images".to_string()
                }));
            };
            frames_seen += 1;
            match decode_frame(&frame) {
                Ok(text) => return Ok(text),
                Err(e) => tracing::debug!("Frame {} not decoded: {}", frames_seen, e),
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.release();
            tracing::debug!("Camera released");
        }
    }
}

impl<S: FrameSource> Drop for ScanSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}
