use clap::{Args, Parser, Subcommand};
use pdfdesk_controller::OperationKind;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdfdesk")]
#[command(version, about = "Merge, split, watermark, convert, compress and unlock PDF files")]
pub struct Cli {
    /// Directory the result is written to
    #[arg(short, long, default_value = ".", global = true)]
    pub out_dir: PathBuf,

    /// Log filter used when RUST_LOG is not set (e.g. "debug", "pdfdesk_core=trace")
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Combine two or more PDFs in the given order
    Merge {
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,
    },
    /// Copy selected pages into a new PDF
    Extract {
        file: PathBuf,
        /// Page ranges, e.g. "1, 3-5, 8"
        #[arg(short, long)]
        pages: String,
    },
    /// Delete pages or change their order
    DeleteReorder {
        file: PathBuf,
        #[command(flatten)]
        edit: PageEdit,
    },
    /// Stamp diagonal text across every page
    Watermark {
        file: PathBuf,
        #[arg(short, long)]
        text: String,
    },
    /// Build a PDF with one page per JPEG or PNG image
    Images {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Re-encode every page as a JPEG image
    Compress {
        file: PathBuf,
        /// JPEG quality, 1-100 (lower means smaller)
        #[arg(short, long, default_value = "75")]
        quality: String,
    },
    /// Remove password protection
    Unlock {
        file: PathBuf,
        #[arg(short, long, default_value = "")]
        password: String,
    },
    /// Put the pages of a cover PDF in front of another PDF
    Cover { cover: PathBuf, main: PathBuf },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PageEdit {
    /// Pages to delete, e.g. "2,4"
    #[arg(long)]
    pub delete: Option<String>,

    /// Complete new page order, e.g. "3,1,2"
    #[arg(long)]
    pub order: Option<String>,

    /// Raw directive text ("삭제: 2,4" or "순서 변경: 3,1,2")
    #[arg(long)]
    pub directive: Option<String>,
}

impl PageEdit {
    pub fn directive(&self) -> String {
        match (&self.delete, &self.order, &self.directive) {
            (Some(pages), _, _) => format!("{} {}", pdfdesk_core::DELETE_MARKER, pages),
            (_, Some(order), _) => format!("{} {}", pdfdesk_core::REORDER_MARKER, order),
            (_, _, Some(text)) => text.clone(),
            (None, None, None) => String::new(),
        }
    }
}

impl Command {
    pub fn operation(&self) -> OperationKind {
        match self {
            Command::Merge { .. } => OperationKind::Merge,
            Command::Extract { .. } => OperationKind::Extract,
            Command::DeleteReorder { .. } => OperationKind::DeleteReorder,
            Command::Watermark { .. } => OperationKind::AddWatermark,
            Command::Images { .. } => OperationKind::ImageToPdf,
            Command::Compress { .. } => OperationKind::Compress,
            Command::Unlock { .. } => OperationKind::Unlock,
            Command::Cover { .. } => OperationKind::AddCover,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compress_quality_defaults_to_75() {
        let cli = Cli::try_parse_from(["pdfdesk", "compress", "in.pdf"]).unwrap();
        match cli.command {
            Command::Compress { quality, .. } => assert_eq!(quality, "75"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_merge_needs_two_files() {
        assert!(Cli::try_parse_from(["pdfdesk", "merge", "a.pdf"]).is_err());
        assert!(Cli::try_parse_from(["pdfdesk", "merge", "a.pdf", "b.pdf"]).is_ok());
    }

    #[test]
    fn test_page_edit_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["pdfdesk", "delete-reorder", "a.pdf"]).is_err());
        assert!(Cli::try_parse_from([
            "pdfdesk",
            "delete-reorder",
            "a.pdf",
            "--delete",
            "1",
            "--order",
            "2,1"
        ])
        .is_err());
    }

    #[test]
    fn test_page_edit_builds_directives() {
        let cli =
            Cli::try_parse_from(["pdfdesk", "delete-reorder", "a.pdf", "--order", "3,1,2"]).unwrap();
        match cli.command {
            Command::DeleteReorder { edit, .. } => assert_eq!(edit.directive(), "순서 변경: 3,1,2"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_out_dir_after_subcommand() {
        let cli =
            Cli::try_parse_from(["pdfdesk", "unlock", "a.pdf", "--out-dir", "/tmp/out"]).unwrap();
        assert_eq!(cli.out_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cli.command.operation(), OperationKind::Unlock);
    }
}
