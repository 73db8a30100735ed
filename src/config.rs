use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for converting summary.json manifests to TFRecord files.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Root directory holding the `training` and `test` splits
    #[arg(short = 'd', long = "data_directory_path", default_value = "")]
    pub data_directory_path: String,

    /// Value written to image/format: the literal 'png', or detected from the image bytes
    #[arg(long = "image_format", value_enum, default_value = "png")]
    pub image_format: ImageFormat,

    /// Also write label_map.pbtxt to the data directory
    #[arg(long = "label_map")]
    pub label_map: bool,

    /// Read every written file back and check its records
    #[arg(long = "verify")]
    pub verify: bool,
}

// How the image/format tag is chosen
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum ImageFormat {
    /// Always 'png'
    #[default]
    Png,
    /// Inferred from the file signature, 'png' when unknown
    Detect,
}

/// Settings for one conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    pub data_dir: PathBuf,
    pub image_format: ImageFormat,
    pub write_label_map: bool,
    pub verify: bool,
}

impl ConvertConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            image_format: ImageFormat::default(),
            write_label_map: false,
            verify: false,
        }
    }

    pub fn split_dir(&self, split: &str) -> PathBuf {
        self.data_dir.join(split)
    }
}

impl Args {
    pub fn to_convert_config(&self) -> ConvertConfig {
        ConvertConfig {
            data_dir: PathBuf::from(&self.data_directory_path),
            image_format: self.image_format,
            write_label_map: self.label_map,
            verify: self.verify,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["summary2tfrecord"]);
        assert_eq!(args.data_directory_path, "");
        assert_eq!(args.image_format, ImageFormat::Png);
        assert!(!args.label_map);
        assert!(!args.verify);
    }

    #[test]
    fn test_to_convert_config() {
        let args = Args::parse_from([
            "summary2tfrecord",
            "--data_directory_path",
            "/data/ocr",
            "--image_format",
            "detect",
            "--label_map",
        ]);
        let config = args.to_convert_config();

        assert_eq!(config.data_dir, PathBuf::from("/data/ocr"));
        assert_eq!(config.image_format, ImageFormat::Detect);
        assert!(config.write_label_map);
        assert!(!config.verify);
        assert_eq!(config.split_dir("training"), PathBuf::from("/data/ocr/training"));
    }
}
