use log::{debug, info, warn};
use prost::Message;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::config::{ConvertConfig, ImageFormat};
use crate::error::{ConvertError, Result};
use crate::example::{build_example, Example};
use crate::record::{RecordReader, RecordWriter};
use crate::types::{
    ConversionStats, Manifest, SplitSummary, LABEL_MAP_FILE_NAME, MANIFEST_FILE_NAME,
    RECORD_FILE_NAME, SPLITS,
};
use crate::utils::{create_progress_bar, read_manifest};

/// Convert both splits under the data directory, then write the optional label map
pub fn convert_dataset(config: &ConvertConfig) -> Result<ConversionStats> {
    let mut stats = ConversionStats::default();
    let mut manifests = Vec::with_capacity(SPLITS.len());

    for split in SPLITS {
        let split_dir = config.split_dir(split);
        info!("Converting {} split in {}", split, split_dir.display());

        let manifest = read_manifest(&split_dir.join(MANIFEST_FILE_NAME))?;
        let summary = write_split(&split_dir, split, &manifest, config.image_format)?;

        if config.verify {
            verify_split(&summary)?;
        }

        stats.splits.push(summary);
        manifests.push(manifest);
    }

    if config.write_label_map {
        let label_map = collect_label_map(&manifests);
        let path = config.data_dir.join(LABEL_MAP_FILE_NAME);
        write_label_map(&path, &label_map)?;
        info!("Wrote {} labels to {}", label_map.len(), path.display());
        stats.label_map_path = Some(path);
    }

    Ok(stats)
}

/// Load `<split_dir>/summary.json` and write `<split_dir>/data.record`
pub fn write_tf_record(split_dir: &Path, image_format: ImageFormat) -> Result<SplitSummary> {
    let manifest = read_manifest(&split_dir.join(MANIFEST_FILE_NAME))?;
    let split = split_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    write_split(split_dir, &split, &manifest, image_format)
}

/// Write every image of an already parsed manifest, in manifest order
pub fn write_split(
    split_dir: &Path,
    split: &str,
    manifest: &Manifest,
    image_format: ImageFormat,
) -> Result<SplitSummary> {
    let output_path = split_dir.join(RECORD_FILE_NAME);
    let file = File::create(&output_path).map_err(|e| ConvertError::io(&output_path, e))?;
    let mut writer = RecordWriter::new(BufWriter::new(file));

    let pb = create_progress_bar(manifest.images.len() as u64, split);
    let mut boxes_written = 0;

    for image in &manifest.images {
        let example = build_example(image, image_format)?;
        writer
            .write_record(&example.encode_to_vec())
            .map_err(|e| ConvertError::io(&output_path, e))?;
        boxes_written += image.boxes.len();
        debug!("Wrote {} with {} boxes", image.path, image.boxes.len());
        pb.inc(1);
    }

    writer.flush().map_err(|e| ConvertError::io(&output_path, e))?;
    pb.finish_with_message(format!("{} conversion complete", split));

    Ok(SplitSummary {
        split: split.to_string(),
        output_path,
        examples_written: writer.records_written(),
        boxes_written,
    })
}

/// Decode every record of a TFRecord file as an Example
pub fn read_examples(path: &Path) -> Result<Vec<Example>> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    RecordReader::new(BufReader::new(file))
        .map(|record| {
            let bytes = record.map_err(|e| ConvertError::Record {
                path: path.to_path_buf(),
                source: e,
            })?;
            Example::decode(bytes.as_slice()).map_err(|e| ConvertError::Decode {
                path: path.to_path_buf(),
                source: e,
            })
        })
        .collect()
}

/// Re-read a written split and check the number of decodable Examples
pub fn verify_split(summary: &SplitSummary) -> Result<()> {
    let found = read_examples(&summary.output_path)?.len();
    if found != summary.examples_written {
        return Err(ConvertError::VerifyMismatch {
            path: summary.output_path.clone(),
            expected: summary.examples_written,
            found,
        });
    }
    info!("Verified {} records in {}", found, summary.output_path.display());
    Ok(())
}

/// Collect label_index -> label across manifests; the first label seen for an index wins
pub fn collect_label_map(manifests: &[Manifest]) -> BTreeMap<i64, String> {
    let mut label_map: BTreeMap<i64, String> = BTreeMap::new();

    for bbox in manifests
        .iter()
        .flat_map(|manifest| manifest.images.iter())
        .flat_map(|image| image.boxes.iter())
    {
        match label_map.get(&bbox.label_index) {
            Some(existing) if existing != &bbox.label => warn!(
                "Label index {} is used for both '{}' and '{}', keeping '{}'",
                bbox.label_index, existing, bbox.label, existing
            ),
            Some(_) => {}
            None => {
                label_map.insert(bbox.label_index, bbox.label.clone());
            }
        }
    }

    label_map
}

/// Create the label_map.pbtxt file for the object detection pipeline
pub fn write_label_map(path: &Path, label_map: &BTreeMap<i64, String>) -> Result<()> {
    let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    let mut content = String::new();
    for (id, name) in label_map {
        content.push_str(&format!(
            "item {{\n  id: {}\n  name: '{}'\n}}\n",
            id,
            escape_text_format(name)
        ));
    }

    writer
        .write_all(content.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| ConvertError::io(path, e))
}

/// Escape a string for a single-quoted protobuf text format literal
fn escape_text_format(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}
