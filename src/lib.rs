//! Summary to TFRecord converter
//!
//! This library converts `summary.json` bounding-box manifests into TFRecord files of
//! `tf.train.Example` records for object detection training.

pub mod config;
pub mod dataset;
pub mod error;
pub mod example;
pub mod record;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use config::{Args, ConvertConfig, ImageFormat};
pub use dataset::{convert_dataset, read_examples, write_split, write_tf_record};
pub use error::{ConvertError, Result};
pub use example::{build_example, Example};
pub use record::{RecordReader, RecordWriter};
pub use types::{BoxRecord, ConversionStats, ImageRecord, Manifest, SplitSummary};
