//! Shared application state: settings handle, engine slot, request counters.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::config::Settings;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Opaque handle to a loaded OCR backend. No backend ships with this
/// scaffold; the trait only pins down what the rest of the service may
/// assume about one.
pub trait OcrEngine: Send + Sync {
    /// Identifier of the loaded model checkpoint.
    fn model_id(&self) -> &str;
}

/// Cross-request statistics and lifecycle flags, shared as `Arc<AppState>`
/// and handed to every component that needs it instead of living in a
/// process global. Counters use relaxed atomics: increments are lossless
/// under concurrent handlers, while `stats()` reads each field independently
/// and may observe a snapshot mid-update. Counters only grow; a process
/// restart is the sole reset.
pub struct AppState {
    settings: Arc<Settings>,
    engine: Mutex<Option<Arc<dyn OcrEngine>>>,
    is_initialized: AtomicBool,
    model_loaded: AtomicBool,
    request_count: AtomicU64,
    error_count: AtomicU64,
    processing_micros_total: AtomicU64,
    image_requests: AtomicU64,
    pdf_requests: AtomicU64,
}

/// Point-in-time view of the counters plus derived rates, serialized as the
/// stats endpoint body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub request_count: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub average_processing_time: f64,
    pub image_requests: u64,
    pub pdf_requests: u64,
    pub model_loaded: bool,
    pub is_initialized: bool,
}

impl AppState {
    /// Constructs the shared handle with zeroed counters. Construction is
    /// initialization: the returned state already references its settings,
    /// so there is no separate init step to forget or double-call.
    pub fn new(settings: Arc<Settings>) -> Arc<Self> {
        Arc::new(Self {
            settings,
            engine: Mutex::new(None),
            is_initialized: AtomicBool::new(true),
            model_loaded: AtomicBool::new(false),
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            processing_micros_total: AtomicU64::new(0),
            image_requests: AtomicU64::new(0),
            pdf_requests: AtomicU64::new(0),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Stores the engine handle and flips `model_loaded`. Replacing an
    /// existing engine is allowed; the flag stays set.
    pub fn set_ocr_engine(&self, engine: Arc<dyn OcrEngine>) {
        let mut slot = self.engine.lock().expect("ocr engine lock poisoned");
        *slot = Some(engine);
        self.model_loaded.store(true, Ordering::Release);
    }

    pub fn ocr_engine(&self) -> Option<Arc<dyn OcrEngine>> {
        self.engine
            .lock()
            .expect("ocr engine lock poisoned")
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized.load(Ordering::Relaxed)
    }

    pub fn model_loaded(&self) -> bool {
        self.model_loaded.load(Ordering::Acquire)
    }

    pub fn increment_request_count(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_error_count(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_image_requests(&self) {
        self.image_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pdf_requests(&self) {
        self.pdf_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Accumulates wall-clock processing time, stored internally as whole
    /// microseconds. Negative inputs clamp to zero so the total stays
    /// monotone.
    pub fn add_processing_time(&self, seconds: f64) {
        let micros = (seconds.max(0.0) * MICROS_PER_SECOND).round() as u64;
        self.processing_micros_total
            .fetch_add(micros, Ordering::Relaxed);
    }

    /// Mean seconds per request, `0.0` before the first request rather than
    /// a division error.
    pub fn average_processing_time(&self) -> f64 {
        let requests = self.request_count.load(Ordering::Relaxed);
        if requests == 0 {
            return 0.0;
        }
        let total_micros = self.processing_micros_total.load(Ordering::Relaxed);
        total_micros as f64 / MICROS_PER_SECOND / requests as f64
    }

    /// Errors as a percentage of all requests, `0.0` before the first
    /// request.
    pub fn error_rate(&self) -> f64 {
        let requests = self.request_count.load(Ordering::Relaxed);
        if requests == 0 {
            return 0.0;
        }
        let errors = self.error_count.load(Ordering::Relaxed);
        errors as f64 / requests as f64 * 100.0
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            request_count: self.request_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            error_rate: self.error_rate(),
            average_processing_time: self.average_processing_time(),
            image_requests: self.image_requests.load(Ordering::Relaxed),
            pdf_requests: self.pdf_requests.load(Ordering::Relaxed),
            model_loaded: self.model_loaded(),
            is_initialized: self.is_initialized(),
        }
    }
}
