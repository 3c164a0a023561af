use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::error::{Error, Result};
use crate::generator::{DocumentMetadata, Generator, PageImage, PreparedPage};
use crate::path_utils::path_to_string_lossy;

const PRODUCER: &str = concat!("cbz2pdf ", env!("CARGO_PKG_VERSION"));

/// A generator for PDF documents with one full-bleed image per page.
///
/// Pages are laid out at the native size of their image (one pixel per point). The output
/// file is created up front; the document itself is assembled in memory and written by
/// [`save`](Generator::save). Raw pages are Flate-compressed as they are added, so the
/// document only ever holds compressed image data.
///
/// Dropping an unsaved generator still writes the pages appended so far, so an interrupted
/// part leaves a readable document behind. A generator without pages removes its file instead.
pub struct PdfGenerator {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    info: Dictionary,
    writer: Option<BufWriter<File>>,
    output_path: PathBuf,
}

impl PdfGenerator {
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn image_stream(page: PreparedPage) -> Stream {
        let (data, grayscale, filter) = match page.image {
            PageImage::Jpeg { data, grayscale } => (data, grayscale, Some("DCTDecode")),
            PageImage::Raw { data, grayscale } => (data, grayscale, None),
        };

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(page.width),
            "Height" => i64::from(page.height),
            "ColorSpace" => if grayscale { "DeviceGray" } else { "DeviceRGB" },
            "BitsPerComponent" => 8,
        };

        if let Some(filter) = filter {
            dict.set("Filter", filter);
        }
        Stream::new(dict, data)
    }

    /// Writes the page tree, catalog and info dictionary, then the document itself.
    fn finish(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Err(Error::Other("PDF writer already closed".to_string()));
        };

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut info = std::mem::take(&mut self.info);
        info.set("Producer", Object::string_literal(PRODUCER));
        info.set(
            "CreationDate",
            Object::string_literal(Local::now().format("D:%Y%m%d%H%M%S").to_string()),
        );
        let info_id = self.doc.add_object(info);
        self.doc.trailer.set("Info", info_id);

        self.doc.save_to(&mut writer)?;
        writer.flush()?;

        debug!(
            "Wrote {} page(s) to {}",
            self.page_ids.len(),
            path_to_string_lossy(&self.output_path)
        );
        Ok(())
    }
}

impl Generator for PdfGenerator {
    fn new(output_path: &Path) -> Result<Self> {
        let file = File::create(output_path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create PDF file '{}': {}",
                    path_to_string_lossy(output_path),
                    e
                ),
            ))
        })?;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        Ok(PdfGenerator {
            doc,
            pages_id,
            page_ids: Vec::new(),
            info: Dictionary::new(),
            writer: Some(BufWriter::new(file)),
            output_path: output_path.to_path_buf(),
        })
    }

    fn add_page(&mut self, page: PreparedPage) -> Result<&mut Self> {
        if self.writer.is_none() {
            return Err(Error::Other("PDF writer already closed".to_string()));
        }

        let width = i64::from(page.width);
        let height = i64::from(page.height);

        let mut image = Self::image_stream(page);
        if image.dict.get(b"Filter").is_err() {
            image.compress()?;
        }
        let image_id = self.doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let mut content = Stream::new(Dictionary::new(), content.encode()?);
        content.compress()?;
        let content_id = self.doc.add_object(content);

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        self.page_ids.push(page_id);

        Ok(self)
    }

    fn set_metadata(&mut self, metadata: &DocumentMetadata) -> Result<&mut Self> {
        let title = if metadata.total_parts > 1 {
            format!(
                "{} (part {} of {})",
                metadata.title, metadata.part_number, metadata.total_parts
            )
        } else {
            metadata.title.clone()
        };
        self.info.set("Title", Object::string_literal(title));
        Ok(self)
    }

    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn save(mut self) -> Result<PathBuf> {
        self.finish()?;
        Ok(self.output_path.clone())
    }
}

impl Drop for PdfGenerator {
    fn drop(&mut self) {
        if self.writer.is_none() {
            return;
        }

        if self.page_ids.is_empty() {
            self.writer = None;
            if let Err(e) = std::fs::remove_file(&self.output_path) {
                warn!(
                    "Could not remove empty PDF '{}': {}",
                    path_to_string_lossy(&self.output_path),
                    e
                );
            }
            return;
        }

        if let Err(e) = self.finish() {
            warn!(
                "Could not flush interrupted PDF '{}': {}",
                path_to_string_lossy(&self.output_path),
                e
            );
        }
    }
}
