use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// The manifest stored as summary.json in each split directory
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Manifest {
    pub images: Vec<ImageRecord>,
}

// One image and its bounding boxes, in pixel space
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageRecord {
    pub path: String,
    pub height: u32,
    pub width: u32,
    pub boxes: Vec<BoxRecord>,
}

// An axis-aligned box with its class label
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BoxRecord {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub label: String,
    pub label_index: i64,
}

// The splits converted on every run, in order
pub const SPLITS: [&str; 2] = ["training", "test"];

pub const MANIFEST_FILE_NAME: &str = "summary.json";
pub const RECORD_FILE_NAME: &str = "data.record";
pub const LABEL_MAP_FILE_NAME: &str = "label_map.pbtxt";

// Outcome of converting one split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitSummary {
    pub split: String,
    pub output_path: PathBuf,
    pub examples_written: usize,
    pub boxes_written: usize,
}

// Struct to hold processing statistics across splits
#[derive(Debug, Default, Clone)]
pub struct ConversionStats {
    pub splits: Vec<SplitSummary>,
    pub label_map_path: Option<PathBuf>,
}

impl ConversionStats {
    pub fn total_examples(&self) -> usize {
        self.splits.iter().map(|s| s.examples_written).sum()
    }

    pub fn total_boxes(&self) -> usize {
        self.splits.iter().map(|s| s.boxes_written).sum()
    }

    pub fn print_summary(&self) {
        log::info!("=== Conversion Summary ===");
        for split in &self.splits {
            log::info!(
                "{}: {} examples, {} boxes -> {}",
                split.split,
                split.examples_written,
                split.boxes_written,
                split.output_path.display()
            );
        }
        log::info!(
            "Total: {} examples, {} boxes",
            self.total_examples(),
            self.total_boxes()
        );
        if let Some(path) = &self.label_map_path {
            log::info!("Label map: {}", path.display());
        }
    }
}
