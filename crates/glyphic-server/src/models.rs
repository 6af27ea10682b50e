//! Wire-format models for the OCR service API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Extensions recognized as raster images, lowercase with leading dot.
pub const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".bmp", ".tiff"];

/// Extensions recognized as PDF documents.
pub const PDF_EXTENSIONS: [&str; 1] = [".pdf"];

/// Input classes the service distinguishes between. Each maps to a closed
/// extension set; no extension belongs to more than one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Pdf,
}

impl FileType {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FileType::Image => &IMAGE_EXTENSIONS,
            FileType::Pdf => &PDF_EXTENSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request processing options accepted alongside an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default)]
    pub include_bbox: bool,
    #[serde(default = "OcrConfig::default_crop_mode")]
    pub crop_mode: bool,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "OcrConfig::default_max_image_size")]
    pub max_image_size: u32,
    /// Page subset for PDF inputs, e.g. `"1-5,7"`.
    #[serde(default)]
    pub page_range: Option<String>,
}

impl OcrConfig {
    fn default_crop_mode() -> bool {
        true
    }

    fn default_max_image_size() -> u32 {
        4096
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            include_bbox: false,
            crop_mode: Self::default_crop_mode(),
            prompt: None,
            max_image_size: Self::default_max_image_size(),
            page_range: None,
        }
    }
}

/// Rectangle locating a detected element. Coordinates are whatever the model
/// emitted (pixel or normalized); `x2 >= x1` is not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Output for a single page or image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub markdown_content: String,
    /// Seconds spent on this page, non-negative.
    pub processing_time: f64,
    /// Present only for multi-page sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_boxes: Option<Vec<BoundingBox>>,
}

/// Aggregate response for one processed file. `results` preserves page order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResponse {
    pub success: bool,
    pub file_type: String,
    pub results: Vec<OcrResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    pub processing_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Wire shape for every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_code: String,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(
        error_code: impl Into<String>,
        error_message: impl Into<String>,
        details: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            success: false,
            error_code: error_code.into(),
            error_message: error_message.into(),
            details,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_loaded: bool,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn new(status: impl Into<String>, version: impl Into<String>, model_loaded: bool) -> Self {
        Self {
            status: status.into(),
            version: version.into(),
            model_loaded,
            timestamp: Utc::now(),
        }
    }
}
