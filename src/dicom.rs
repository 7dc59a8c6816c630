//! Tag extraction and frame rendering for stored DICOM records.
//!
//! All parsing and pixel decoding is delegated to the `dicom-rs` crates; this
//! module only adapts their results to [`TagValue`] and PNG bytes. Parsing is
//! blocking and eager, so callers off the blocking pool should go through
//! [`DicomReader::with_document`].

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use dicom_core::dictionary::DataDictionary;
use dicom_core::value::{PrimitiveValue, Value};
use dicom_core::Tag;
use dicom_dictionary_std::{tags, StandardDataDictionary};
use dicom_object::DefaultDicomObject;
use dicom_pixeldata::PixelDecoder;
use image::ImageFormat;
use tracing::{debug, info_span, warn, Span};

/// Placeholder returned for tag names the dictionary does not know.
pub const INVALID_TAG_NAME: &str = "INVALID_TAG_NAME";
/// Placeholder returned for pixel data elements.
pub const NOT_SUPPORTED: &str = "Not Supported!";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to parse DICOM file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("failed to decode pixel data: {0}")]
    Decode(String),
    #[error("failed to encode PNG: {0}")]
    Encode(String),
    #[error("extraction worker failed: {0}")]
    Worker(String),
}

/// The value of a single tag, typed the way the decoder reported it.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// First string of a text element, trailing padding removed.
    Text(String),
    /// First value of a floating point element.
    Number(f64),
    /// First value of an integer element.
    Integer(i64),
    /// Pixel data, which is never returned inline.
    Unsupported,
    /// Decoder's string rendering of any other value kind.
    Unknown(String),
    /// The name is not in the standard dictionary.
    InvalidTagName,
    /// The tag is known but the dataset does not contain it.
    Absent,
}

/// Opens stored files for extraction.
#[derive(Debug, Clone)]
pub struct DicomReader {
    span: Span,
}

impl Default for DicomReader {
    fn default() -> Self {
        Self::new()
    }
}

impl DicomReader {
    pub fn new() -> Self {
        Self { span: info_span!("dicom") }
    }

    /// Parses the whole file at `path`.
    pub fn open(&self, path: &Path) -> Result<DicomDocument, ExtractError> {
        let span = info_span!(parent: &self.span, "document", path = %path.display());
        debug!(parent: &span, "Parsing DICOM file");
        let object = dicom_object::open_file(path).map_err(|e| {
            warn!(parent: &span, error = %e, "Failed to parse DICOM file");
            ExtractError::Parse { path: path.to_path_buf(), message: e.to_string() }
        })?;
        Ok(DicomDocument { object, span })
    }

    /// Opens `path` and runs `f` on the blocking thread pool.
    pub async fn with_document<T, F>(&self, path: PathBuf, f: F) -> Result<T, ExtractError>
    where
        T: Send + 'static,
        F: FnOnce(&DicomDocument) -> Result<T, ExtractError> + Send + 'static,
    {
        let reader = self.clone();
        tokio::task::spawn_blocking(move || {
            let doc = reader.open(&path)?;
            f(&doc)
        })
        .await
        .map_err(|e| ExtractError::Worker(e.to_string()))?
    }
}

/// A fully parsed DICOM file.
pub struct DicomDocument {
    object: DefaultDicomObject,
    span: Span,
}

impl DicomDocument {
    /// Looks up `tag_name` (a dictionary keyword such as `PatientName`).
    pub fn tag_value(&self, tag_name: &str) -> TagValue {
        let Some(entry) = StandardDataDictionary.by_name(tag_name) else {
            warn!(parent: &self.span, tag_name, "Invalid tag name");
            return TagValue::InvalidTagName;
        };
        self.value_of(entry.tag.inner())
    }

    /// Looks up a batch of names. Names are trimmed and empty entries are
    /// skipped.
    pub fn tag_values<'a, I>(&self, names: I) -> BTreeMap<String, TagValue>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| (name.to_string(), self.tag_value(name)))
            .collect()
    }

    /// Renders the first frame of the pixel data as PNG.
    pub fn render_png(&self) -> Result<Vec<u8>, ExtractError> {
        let decoded = self.object.decode_pixel_data().map_err(|e| {
            warn!(parent: &self.span, error = %e, "Failed to decode pixel data");
            ExtractError::Decode(e.to_string())
        })?;
        let frame = decoded.to_dynamic_image(0).map_err(|e| ExtractError::Decode(e.to_string()))?;

        let mut out = Cursor::new(Vec::new());
        frame.write_to(&mut out, ImageFormat::Png).map_err(|e| ExtractError::Encode(e.to_string()))?;
        debug!(parent: &self.span, width = frame.width(), height = frame.height(), "Rendered frame");
        Ok(out.into_inner())
    }

    fn value_of(&self, tag: Tag) -> TagValue {
        if tag == tags::PIXEL_DATA {
            return TagValue::Unsupported;
        }
        let Ok(element) = self.object.element(tag) else {
            return TagValue::Absent;
        };
        match element.value() {
            Value::Primitive(p) => classify(p),
            Value::PixelSequence(_) => TagValue::Unsupported,
            Value::Sequence(seq) => TagValue::Unknown(format!("[{} items]", seq.items().len())),
        }
    }
}

fn classify(value: &PrimitiveValue) -> TagValue {
    use PrimitiveValue::*;

    fn first<T: Copy>(values: &[T]) -> Option<T> {
        values.first().copied()
    }
    fn integer<T: Copy + Into<i64>>(values: &[T]) -> TagValue {
        first(values).map(|v| TagValue::Integer(v.into())).unwrap_or(TagValue::Absent)
    }

    match value {
        Empty => TagValue::Text(String::new()),
        Str(s) => TagValue::Text(trim_padding(s)),
        Strs(values) => TagValue::Text(values.first().map(|s| trim_padding(s)).unwrap_or_default()),
        F32(values) => first(values).map(|v| TagValue::Number(v as f64)).unwrap_or(TagValue::Absent),
        F64(values) => first(values).map(TagValue::Number).unwrap_or(TagValue::Absent),
        I16(values) => integer(values),
        U16(values) => integer(values),
        I32(values) => integer(values),
        U32(values) => integer(values),
        I64(values) => integer(values),
        U64(values) => match first(values) {
            Some(v) => i64::try_from(v).map(TagValue::Integer).unwrap_or_else(|_| TagValue::Unknown(v.to_string())),
            None => TagValue::Absent,
        },
        other => TagValue::Unknown(other.to_str().into_owned()),
    }
}

fn trim_padding(s: &str) -> String {
    s.trim_end_matches([' ', '\0']).to_string()
}
