//! Command-line host for the PDF operations
//!
//! Each subcommand fills one operation form of the [`Controller`], applies
//! it and writes the download into the output directory. Validation and
//! failure toasts become the command's error.

pub mod args;

pub use args::{Cli, Command, PageEdit};

use anyhow::{bail, Context, Result};
use pdfdesk_controller::{Controller, InputFile, OperationKind, Toast, ToastKind, ViewState};
use pdfdesk_core::{PrerenderedPages, RasterizerFactory};
use std::path::{Path, PathBuf};

/// MIME type the browser would report for a file with this extension.
pub fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn read_input(path: &Path) -> Result<InputFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(InputFile::new(name, media_type_for(path), bytes))
}

fn read_inputs(paths: &[PathBuf]) -> Result<Vec<InputFile>> {
    paths.iter().map(|path| read_input(path)).collect()
}

/// Stand-in used when the binary was built without pdfium.
#[cfg(not(feature = "pdfium"))]
struct MissingPdfium;

#[cfg(not(feature = "pdfium"))]
impl RasterizerFactory for MissingPdfium {
    fn open<'a>(
        &'a self,
        _pdf: &'a [u8],
    ) -> Result<Box<dyn pdfdesk_core::PageRasterizer + 'a>, pdfdesk_core::PdfDeskError> {
        Err(pdfdesk_core::PdfDeskError::Render(
            "page rendering is unavailable; rebuild with --features pdfium".into(),
        ))
    }
}

fn rasterizers(operation: OperationKind) -> Result<Box<dyn RasterizerFactory>> {
    if operation == OperationKind::Compress {
        page_renderer()
    } else {
        Ok(Box::new(PrerenderedPages::default()))
    }
}

#[cfg(feature = "pdfium")]
fn page_renderer() -> Result<Box<dyn RasterizerFactory>> {
    Ok(Box::new(pdfdesk_core::pdfium::PdfiumRasterizer::bind()?))
}

#[cfg(not(feature = "pdfium"))]
fn page_renderer() -> Result<Box<dyn RasterizerFactory>> {
    Ok(Box::new(MissingPdfium))
}

/// Load the command's inputs into the operation form.
fn fill_form(controller: &mut Controller, command: &Command) -> Result<()> {
    controller.select(command.operation())?;
    match command {
        Command::Merge { files } => controller.set_files(read_inputs(files)?)?,
        Command::Extract { file, pages } => {
            controller.set_files(vec![read_input(file)?])?;
            controller.set_text(pages.as_str())?;
        }
        Command::DeleteReorder { file, edit } => {
            controller.set_files(vec![read_input(file)?])?;
            controller.set_text(edit.directive())?;
        }
        Command::Watermark { file, text } => {
            controller.set_files(vec![read_input(file)?])?;
            controller.set_text(text.as_str())?;
        }
        Command::Images { images } => controller.set_files(read_inputs(images)?)?,
        Command::Compress { file, quality } => {
            controller.set_files(vec![read_input(file)?])?;
            controller.set_text(quality.as_str())?;
        }
        Command::Unlock { file, password } => {
            controller.set_files(vec![read_input(file)?])?;
            controller.set_text(password.as_str())?;
        }
        Command::Cover { cover, main } => {
            controller.set_files(vec![read_input(cover)?])?;
            controller.set_secondary_file(Some(read_input(main)?))?;
        }
    }

    for line in controller.activity_log().lines() {
        tracing::debug!("{}", line);
    }
    Ok(())
}

fn first_error(toasts: &[Toast]) -> Option<&str> {
    toasts
        .iter()
        .find(|toast| toast.kind == ToastKind::Error)
        .map(|toast| toast.message.as_str())
}

/// Run one subcommand and return the path of the written file.
pub fn run(cli: &Cli) -> Result<PathBuf> {
    let mut controller = Controller::new();
    fill_form(&mut controller, &cli.command)?;

    let Some(job) = controller.begin_apply()? else {
        let toasts = controller.take_toasts();
        bail!("{}", first_error(&toasts).unwrap_or("invalid input"));
    };
    if let ViewState::Busy { message, .. } = controller.state() {
        tracing::info!("{}", message);
    }

    let factory = rasterizers(job.operation())?;
    let id = job.id();
    let result = job.run(factory.as_ref(), &mut |done, total| {
        controller.report_progress(id, done, total);
        tracing::info!(done, total, "progress");
    });

    let download = controller.finish(id, result);
    let toasts = controller.take_toasts();
    let Some(download) = download else {
        bail!("{}", first_error(&toasts).unwrap_or("operation failed"));
    };
    for toast in &toasts {
        tracing::info!("{}", toast.message);
    }

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("failed to create {}", cli.out_dir.display()))?;
    let path = cli.out_dir.join(&download.file_name);
    std::fs::write(&path, &download.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = download.bytes.len(), "saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pdfdesk_core::fixtures::{create_labelled_pdf, create_png, create_test_pdf, page_labels};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: Vec<u8>) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn run_args(dir: &TempDir, args: &[&str]) -> Result<PathBuf> {
        let out = dir.path().join("out");
        let mut argv = vec!["pdfdesk", "--out-dir", out.to_str().unwrap()];
        argv.extend_from_slice(args);
        run(&Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_media_types() {
        assert_eq!(media_type_for(Path::new("a.PDF")), "application/pdf");
        assert_eq!(media_type_for(Path::new("b.jpeg")), "image/jpeg");
        assert_eq!(media_type_for(Path::new("c.png")), "image/png");
        assert_eq!(media_type_for(Path::new("d.gif")), "application/octet-stream");
        assert_eq!(media_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_merge_writes_merged_pdf() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.pdf", create_labelled_pdf(1, "A"));
        let b = write(&dir, "b.pdf", create_labelled_pdf(2, "B"));

        let path = run_args(&dir, &["merge", &a, &b]).unwrap();
        assert_eq!(path.file_name().unwrap(), "merged.pdf");
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(page_labels(&bytes), vec!["A 1", "B 1", "B 2"]);
    }

    #[test]
    fn test_delete_pages() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "doc.pdf", create_test_pdf(4));

        let path = run_args(&dir, &["delete-reorder", &file, "--delete", "2,4"]).unwrap();
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(page_labels(&bytes), vec!["Page 1", "Page 3"]);
    }

    #[test]
    fn test_raw_directive_without_marker_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "doc.pdf", create_test_pdf(2));

        let err = run_args(&dir, &["delete-reorder", &file, "--directive", "2,1"]).unwrap_err();
        assert!(err.to_string().starts_with("입력 형식 오류"));
    }

    #[test]
    fn test_extract_out_of_range_reports_toast() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "doc.pdf", create_test_pdf(2));

        let err = run_args(&dir, &["extract", &file, "--pages", "5-9"]).unwrap_err();
        assert_eq!(err.to_string(), "유효한 페이지 번호가 없습니다.");
        assert!(!dir.path().join("out").join("extracted.pdf").exists());
    }

    #[test]
    fn test_bad_quality_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "doc.pdf", create_test_pdf(1));

        let err = run_args(&dir, &["compress", &file, "--quality", "150"]).unwrap_err();
        assert_eq!(err.to_string(), "압축 품질은 1에서 100 사이의 숫자여야 합니다.");
    }

    #[cfg(not(feature = "pdfium"))]
    #[test]
    fn test_compress_without_pdfium_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "doc.pdf", create_test_pdf(1));

        let err = run_args(&dir, &["compress", &file]).unwrap_err();
        assert!(err.to_string().starts_with("오류: "));
    }

    #[test]
    fn test_images_and_cover() {
        let dir = TempDir::new().unwrap();
        let image = write(&dir, "scan.png", create_png(20, 30));
        let path = run_args(&dir, &["images", &image]).unwrap();
        assert_eq!(path.file_name().unwrap(), "from_images.pdf");

        let cover = write(&dir, "cover.pdf", create_labelled_pdf(1, "Cover"));
        let body = write(&dir, "body.pdf", create_labelled_pdf(2, "Body"));
        let path = run_args(&dir, &["cover", &cover, &body]).unwrap();
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(page_labels(&bytes), vec!["Cover 1", "Body 1", "Body 2"]);
    }

    #[test]
    fn test_missing_input_file() {
        let dir = TempDir::new().unwrap();
        let err = run_args(&dir, &["unlock", "/nonexistent/file.pdf"]).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
