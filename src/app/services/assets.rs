//! Background decoding of persisted screenshot images.
//!
//! Each screenshot's variants are decoded as one batch: the batch joins all
//! of its decode tasks and reports a single complete result, so a screenshot
//! is never seen with half of its languages loaded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use rayon::prelude::*;

use crate::app::domain::asset::{ImageHandle, ImageSource};
use crate::app::domain::screenshot::{Screenshot, ScreenshotId};
use crate::app::infrastructure::error::{AppError, Result};
use crate::app::infrastructure::platform::{ImageDecoder, decode_data_uri};

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One language variant to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub lang: String,
    pub src: ImageSource,
}

/// Every variant of `screenshot` that has a source but no decoded image.
pub fn pending_requests(screenshot: &Screenshot) -> Vec<ImageRequest> {
    screenshot
        .localized_images
        .iter()
        .filter(|(_, entry)| !entry.is_decoded() && !entry.src.is_empty())
        .map(|(lang, entry)| ImageRequest {
            lang: lang.clone(),
            src: entry.src.clone(),
        })
        .collect()
}

/// Outcome of one screenshot's batch.
#[derive(Debug)]
pub struct LoadedScreenshot {
    pub screenshot_id: ScreenshotId,
    /// One entry per request; failures are reported, not dropped.
    pub results: Vec<(String, Result<ImageHandle>)>,
}

/// Decode every request in parallel and wait for all of them. Returns
/// `None` if the batch was cancelled.
pub fn decode_batch(
    decoder: &dyn ImageDecoder,
    requests: &[ImageRequest],
    cancel: &CancelToken,
) -> Option<Vec<(String, Result<ImageHandle>)>> {
    let results: Vec<(String, Result<ImageHandle>)> = requests
        .par_iter()
        .map(|request| {
            let result = if cancel.is_cancelled() {
                Err(AppError::Decode("cancelled".to_string()))
            } else {
                decode_data_uri(request.src.as_str()).and_then(|bytes| decoder.decode(&bytes))
            };
            (request.lang.clone(), result)
        })
        .collect();
    if cancel.is_cancelled() {
        return None;
    }
    Some(results)
}

struct Finished {
    ticket: u64,
    loaded: Option<LoadedScreenshot>,
}

struct InFlight {
    screenshot_id: ScreenshotId,
    cancel: CancelToken,
}

/// Runs decode batches off the state thread and hands back finished ones.
pub struct AssetLoader {
    decoder: Arc<dyn ImageDecoder>,
    sender: Sender<Finished>,
    receiver: Receiver<Finished>,
    in_flight: HashMap<u64, InFlight>,
    next_ticket: u64,
}

impl AssetLoader {
    pub fn new(decoder: Arc<dyn ImageDecoder>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            decoder,
            sender,
            receiver,
            in_flight: HashMap::new(),
            next_ticket: 1,
        }
    }

    pub fn decoder(&self) -> &dyn ImageDecoder {
        self.decoder.as_ref()
    }

    /// Start decoding `requests` for a screenshot on a worker thread.
    pub fn spawn(&mut self, screenshot_id: ScreenshotId, requests: Vec<ImageRequest>) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let cancel = CancelToken::default();
        self.in_flight.insert(
            ticket,
            InFlight {
                screenshot_id,
                cancel: cancel.clone(),
            },
        );

        let decoder = Arc::clone(&self.decoder);
        let sender = self.sender.clone();
        std::thread::spawn(move || {
            let loaded = decode_batch(decoder.as_ref(), &requests, &cancel).map(|results| {
                LoadedScreenshot {
                    screenshot_id,
                    results,
                }
            });
            // The loader may be gone by now; nothing to deliver to.
            let _ = sender.send(Finished { ticket, loaded });
        });
    }

    /// Cancel every batch for `screenshot_id`.
    pub fn cancel(&mut self, screenshot_id: ScreenshotId) {
        self.in_flight.retain(|_, job| {
            if job.screenshot_id == screenshot_id {
                job.cancel.cancel();
                false
            } else {
                true
            }
        });
    }

    pub fn cancel_all(&mut self) {
        for job in self.in_flight.values() {
            job.cancel.cancel();
        }
        if !self.in_flight.is_empty() {
            log::debug!("Cancelled {} image batch(es)", self.in_flight.len());
        }
        self.in_flight.clear();
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_loading(&self, screenshot_id: ScreenshotId) -> bool {
        self.in_flight.values().any(|job| job.screenshot_id == screenshot_id)
    }

    fn accept(&mut self, finished: Finished) -> Option<LoadedScreenshot> {
        // Unknown tickets were cancelled after they started.
        self.in_flight.remove(&finished.ticket)?;
        finished.loaded
    }

    /// Finished batches that are still wanted, without blocking.
    pub fn poll(&mut self) -> Vec<LoadedScreenshot> {
        let mut done = Vec::new();
        while let Ok(finished) = self.receiver.try_recv() {
            if let Some(loaded) = self.accept(finished) {
                done.push(loaded);
            }
        }
        done
    }

    /// Block until every batch still in flight has finished.
    pub fn wait(&mut self) -> Vec<LoadedScreenshot> {
        let mut done = Vec::new();
        while !self.in_flight.is_empty() {
            match self.receiver.recv() {
                Ok(finished) => {
                    if let Some(loaded) = self.accept(finished) {
                        done.push(loaded);
                    }
                }
                Err(_) => break,
            }
        }
        done
    }
}
