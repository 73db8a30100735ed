//! `tf.train.Example` messages and the record builder
//!
//! The message types mirror `tensorflow/core/example/{example,feature}.proto`
//! field for field, so the encoded bytes are readable by any TensorFlow
//! input pipeline.

use prost::Message;
use std::collections::BTreeMap;
use std::fs;

use crate::config::ImageFormat;
use crate::error::{ConvertError, Result};
use crate::types::ImageRecord;
use crate::utils::infer_image_format;

pub const HEIGHT_KEY: &str = "image/height";
pub const WIDTH_KEY: &str = "image/width";
pub const FILENAME_KEY: &str = "image/filename";
pub const SOURCE_ID_KEY: &str = "image/source_id";
pub const ENCODED_KEY: &str = "image/encoded";
pub const FORMAT_KEY: &str = "image/format";
pub const XMIN_KEY: &str = "image/object/bbox/xmin";
pub const XMAX_KEY: &str = "image/object/bbox/xmax";
pub const YMIN_KEY: &str = "image/object/bbox/ymin";
pub const YMAX_KEY: &str = "image/object/bbox/ymax";
pub const CLASS_TEXT_KEY: &str = "image/object/class/text";
pub const CLASS_LABEL_KEY: &str = "image/object/class/label";

pub const DEFAULT_FORMAT_TAG: &str = "png";

#[derive(Clone, PartialEq, Message)]
pub struct BytesList {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub value: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FloatList {
    #[prost(float, repeated, tag = "1")]
    pub value: Vec<f32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Int64List {
    #[prost(int64, repeated, tag = "1")]
    pub value: Vec<i64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Feature {
    #[prost(oneof = "feature::Kind", tags = "1, 2, 3")]
    pub kind: Option<feature::Kind>,
}

pub mod feature {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        BytesList(super::BytesList),
        #[prost(message, tag = "2")]
        FloatList(super::FloatList),
        #[prost(message, tag = "3")]
        Int64List(super::Int64List),
    }
}

// Ordered map keeps the encoding stable between runs
#[derive(Clone, PartialEq, Message)]
pub struct Features {
    #[prost(btree_map = "string, message", tag = "1")]
    pub feature: BTreeMap<String, Feature>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Example {
    #[prost(message, optional, tag = "1")]
    pub features: Option<Features>,
}

pub fn int64_feature(value: i64) -> Feature {
    int64_list_feature(vec![value])
}

pub fn int64_list_feature(value: Vec<i64>) -> Feature {
    Feature {
        kind: Some(feature::Kind::Int64List(Int64List { value })),
    }
}

pub fn bytes_feature(value: impl Into<Vec<u8>>) -> Feature {
    bytes_list_feature(vec![value.into()])
}

pub fn bytes_list_feature(value: Vec<Vec<u8>>) -> Feature {
    Feature {
        kind: Some(feature::Kind::BytesList(BytesList { value })),
    }
}

pub fn float_list_feature(value: Vec<f32>) -> Feature {
    Feature {
        kind: Some(feature::Kind::FloatList(FloatList { value })),
    }
}

impl Example {
    pub fn from_features(feature: BTreeMap<String, Feature>) -> Self {
        Self {
            features: Some(Features { feature }),
        }
    }

    pub fn feature(&self, key: &str) -> Option<&Feature> {
        self.features.as_ref()?.feature.get(key)
    }

    pub fn int64_list(&self, key: &str) -> Option<&[i64]> {
        match &self.feature(key)?.kind {
            Some(feature::Kind::Int64List(list)) => Some(&list.value),
            _ => None,
        }
    }

    pub fn float_list(&self, key: &str) -> Option<&[f32]> {
        match &self.feature(key)?.kind {
            Some(feature::Kind::FloatList(list)) => Some(&list.value),
            _ => None,
        }
    }

    pub fn bytes_list(&self, key: &str) -> Option<&[Vec<u8>]> {
        match &self.feature(key)?.kind {
            Some(feature::Kind::BytesList(list)) => Some(&list.value),
            _ => None,
        }
    }
}

/// Build the Example for one image, reading the image bytes from `image.path`.
pub fn build_example(image: &ImageRecord, image_format: ImageFormat) -> Result<Example> {
    if image.width == 0 {
        return Err(ConvertError::ZeroDimension {
            path: image.path.clone(),
            dimension: "width",
        });
    }
    if image.height == 0 {
        return Err(ConvertError::ZeroDimension {
            path: image.path.clone(),
            dimension: "height",
        });
    }

    let encoded = fs::read(&image.path).map_err(|e| ConvertError::io(&image.path, e))?;
    Ok(build_example_from_bytes(image, encoded, image_format))
}

/// Package an image's metadata, boxes and already-loaded bytes.
///
/// Dimensions must be non-zero; [`build_example`] checks this before reading the file.
pub fn build_example_from_bytes(
    image: &ImageRecord,
    encoded: Vec<u8>,
    image_format: ImageFormat,
) -> Example {
    let width = f64::from(image.width);
    let height = f64::from(image.height);

    let n = image.boxes.len();
    let mut xmins = Vec::with_capacity(n);
    let mut xmaxs = Vec::with_capacity(n);
    let mut ymins = Vec::with_capacity(n);
    let mut ymaxs = Vec::with_capacity(n);
    let mut classes_text = Vec::with_capacity(n);
    let mut classes = Vec::with_capacity(n);

    for bbox in &image.boxes {
        xmins.push((bbox.x0 / width) as f32);
        xmaxs.push((bbox.x1 / width) as f32);
        ymins.push((bbox.y0 / height) as f32);
        ymaxs.push((bbox.y1 / height) as f32);
        classes_text.push(bbox.label.as_bytes().to_vec());
        classes.push(bbox.label_index);
    }

    let format_tag = match image_format {
        ImageFormat::Png => DEFAULT_FORMAT_TAG,
        ImageFormat::Detect => infer_image_format(&encoded).unwrap_or(DEFAULT_FORMAT_TAG),
    };

    let filename = image.path.as_bytes().to_vec();
    let feature = BTreeMap::from([
        (HEIGHT_KEY.to_string(), int64_feature(i64::from(image.height))),
        (WIDTH_KEY.to_string(), int64_feature(i64::from(image.width))),
        (FILENAME_KEY.to_string(), bytes_feature(filename.clone())),
        (SOURCE_ID_KEY.to_string(), bytes_feature(filename)),
        (ENCODED_KEY.to_string(), bytes_feature(encoded)),
        (FORMAT_KEY.to_string(), bytes_feature(format_tag)),
        (XMIN_KEY.to_string(), float_list_feature(xmins)),
        (XMAX_KEY.to_string(), float_list_feature(xmaxs)),
        (YMIN_KEY.to_string(), float_list_feature(ymins)),
        (YMAX_KEY.to_string(), float_list_feature(ymaxs)),
        (CLASS_TEXT_KEY.to_string(), bytes_list_feature(classes_text)),
        (CLASS_LABEL_KEY.to_string(), int64_list_feature(classes)),
    ]);

    Example::from_features(feature)
}
