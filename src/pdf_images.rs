//! Image extraction capability.
//!
//! [`PdfImageExtractor`] pulls embedded image XObjects out of a PDF and
//! writes them as standalone files. Only streams whose raw data already is
//! a complete image file are emitted (baseline JPEG and JPEG 2000), which
//! covers scanned pages and photographs without re-encoding anything.

use std::path::{Path, PathBuf};

use lopdf::{Document, Object, Stream};

use crate::extract::{extension_of, ExtractError};

/// One extracted image, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub path: PathBuf,
    pub size: u64,
}

/// Produces zero or more images from a source file into `out_dir`.
///
/// Implementations are blocking; callers run them on the blocking pool.
pub trait ImageExtractor: Send + Sync {
    fn extract_images(
        &self,
        source: &Path,
        out_dir: &Path,
    ) -> Result<Vec<ImageCandidate>, ExtractError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfImageExtractor;

impl ImageExtractor for PdfImageExtractor {
    fn extract_images(
        &self,
        source: &Path,
        out_dir: &Path,
    ) -> Result<Vec<ImageCandidate>, ExtractError> {
        if extension_of(source) != "pdf" {
            return Ok(Vec::new());
        }

        let doc = Document::load(source).map_err(|e| ExtractError::Pdf(e.to_string()))?;

        let mut candidates = Vec::new();
        for ((num, generation), object) in &doc.objects {
            let Object::Stream(stream) = object else {
                continue;
            };
            let Some(ext) = embedded_image_extension(stream) else {
                continue;
            };
            let path = out_dir.join(format!("img-{:05}-{}.{}", num, generation, ext));
            std::fs::write(&path, &stream.content).map_err(|e| ExtractError::Io(e.to_string()))?;
            candidates.push(ImageCandidate {
                path,
                size: stream.content.len() as u64,
            });
        }

        Ok(candidates)
    }
}

/// File extension for an image XObject that can be written out verbatim.
fn embedded_image_extension(stream: &Stream) -> Option<&'static str> {
    match stream.dict.get(b"Subtype") {
        Ok(Object::Name(name)) if name.as_slice() == b"Image" => {}
        _ => return None,
    }

    let filter = match stream.dict.get(b"Filter").ok()? {
        Object::Name(name) => name.as_slice(),
        Object::Array(filters) if filters.len() == 1 => match &filters[0] {
            Object::Name(name) => name.as_slice(),
            _ => return None,
        },
        _ => return None,
    };

    match filter {
        b"DCTDecode" => Some("jpg"),
        b"JPXDecode" => Some("jp2"),
        _ => None,
    }
}
