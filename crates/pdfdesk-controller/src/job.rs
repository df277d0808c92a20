//! A validated operation, detached from the controller
//!
//! [`Job::run`] does the PDF work and touches no controller state, so hosts
//! can run it wherever they like and hand the result back with
//! `Controller::finish`.

use crate::descriptor::OperationKind;
use pdfdesk_core::{ImageKind, ModifyPagesCommand, PdfDeskError, Quality, RasterizerFactory};

/// A file as delivered by the host's file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    /// MIME type, e.g. `application/pdf` or `image/png`
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, PDF_MEDIA_TYPE, bytes)
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }
}

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// The file a successful operation produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Operation inputs captured when apply was accepted.
#[derive(Debug, Clone)]
pub enum JobInput {
    Merge { files: Vec<Vec<u8>> },
    Extract { pdf: Vec<u8>, ranges: String },
    ModifyPages { pdf: Vec<u8>, command: ModifyPagesCommand },
    AddWatermark { pdf: Vec<u8>, text: String },
    ImageToPdf { images: Vec<InputFile> },
    Compress { pdf: Vec<u8>, quality: Quality },
    Unlock { pdf: Vec<u8>, password: String },
    AddCover { cover: Vec<u8>, main: Vec<u8> },
}

impl JobInput {
    pub fn operation(&self) -> OperationKind {
        match self {
            JobInput::Merge { .. } => OperationKind::Merge,
            JobInput::Extract { .. } => OperationKind::Extract,
            JobInput::ModifyPages { .. } => OperationKind::DeleteReorder,
            JobInput::AddWatermark { .. } => OperationKind::AddWatermark,
            JobInput::ImageToPdf { .. } => OperationKind::ImageToPdf,
            JobInput::Compress { .. } => OperationKind::Compress,
            JobInput::Unlock { .. } => OperationKind::Unlock,
            JobInput::AddCover { .. } => OperationKind::AddCover,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    id: u64,
    input: JobInput,
}

impl Job {
    pub(crate) fn new(id: u64, input: JobInput) -> Self {
        Self { id, input }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn operation(&self) -> OperationKind {
        self.input.operation()
    }

    pub fn input(&self) -> &JobInput {
        &self.input
    }

    /// Execute the operation. `progress` receives `(done, total)` for
    /// operations with a determinate progress bar.
    pub fn run(
        &self,
        rasterizers: &dyn RasterizerFactory,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Download, PdfDeskError> {
        let operation = self.operation();
        tracing::debug!(job = self.id, %operation, "running job");

        let bytes = match &self.input {
            JobInput::Merge { files } => pdfdesk_core::merge_documents(files, progress)?,
            JobInput::Extract { pdf, ranges } => pdfdesk_core::extract_pages(pdf, ranges)?,
            JobInput::ModifyPages { pdf, command } => pdfdesk_core::modify_pages(pdf, command)?,
            JobInput::AddWatermark { pdf, text } => pdfdesk_core::add_watermark(pdf, text)?,
            JobInput::ImageToPdf { images } => {
                let typed = images
                    .iter()
                    .map(|file| {
                        ImageKind::from_media_type(&file.media_type)
                            .map(|kind| (kind, file.bytes.as_slice()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                pdfdesk_core::images_to_pdf(&typed, progress)?
            }
            JobInput::Compress { pdf, quality } => {
                let rasterizer = rasterizers.open(pdf)?;
                pdfdesk_core::compress_document(&*rasterizer, *quality, progress)?
            }
            JobInput::Unlock { pdf, password } => pdfdesk_core::unlock_document(pdf, password)?,
            JobInput::AddCover { cover, main } => pdfdesk_core::add_cover(cover, main)?,
        };

        Ok(Download {
            file_name: operation.descriptor().output_file_name.to_string(),
            media_type: PDF_MEDIA_TYPE,
            bytes,
        })
    }
}
