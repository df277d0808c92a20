//! Static per-operation configuration
//!
//! One [`OperationDescriptor`] per [`OperationKind`], built once and looked
//! up by tag. The controller reads everything it shows from here.

use crate::error::ControllerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Merge,
    Extract,
    DeleteReorder,
    AddWatermark,
    ImageToPdf,
    Compress,
    Unlock,
    AddCover,
}

impl OperationKind {
    pub const ALL: [OperationKind; 8] = [
        OperationKind::Merge,
        OperationKind::Extract,
        OperationKind::DeleteReorder,
        OperationKind::AddWatermark,
        OperationKind::ImageToPdf,
        OperationKind::Compress,
        OperationKind::Unlock,
        OperationKind::AddCover,
    ];

    /// Tag used by hosts and in the activity log
    pub fn tag(self) -> &'static str {
        match self {
            OperationKind::Merge => "merge",
            OperationKind::Extract => "extract",
            OperationKind::DeleteReorder => "deleteReorder",
            OperationKind::AddWatermark => "addWatermark",
            OperationKind::ImageToPdf => "imageToPdf",
            OperationKind::Compress => "compress",
            OperationKind::Unlock => "unlock",
            OperationKind::AddCover => "addCover",
        }
    }

    pub fn descriptor(self) -> &'static OperationDescriptor {
        &DESCRIPTORS[self as usize]
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for OperationKind {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| ControllerError::UnknownOperation(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextInputKind {
    Text,
    Number,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressStyle {
    /// Percentage bar updated per processed unit
    Determinate,
    /// Busy message only
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PreviewStyle {
    None,
    PdfPages,
    Images,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSlot {
    pub label: &'static str,
    /// `accept` filter for the file picker
    pub accept: &'static str,
    pub multiple: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInput {
    pub kind: TextInputKind,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub default_value: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub kind: OperationKind,
    pub title: &'static str,
    pub busy_message: &'static str,
    pub success_message: &'static str,
    pub primary: FileSlot,
    /// Second file picker, only for the cover workflow
    pub secondary: Option<FileSlot>,
    pub text: Option<TextInput>,
    pub output_file_name: &'static str,
    pub progress: ProgressStyle,
    pub preview: PreviewStyle,
}

impl OperationDescriptor {
    pub fn has_preview(&self) -> bool {
        self.preview != PreviewStyle::None
    }
}

const PDF_ACCEPT: &str = "application/pdf";
const DEFAULT_FILE_LABEL: &str = "여기에 파일을 드롭하거나 클릭하여 선택";

const SINGLE_PDF: FileSlot = FileSlot {
    label: DEFAULT_FILE_LABEL,
    accept: PDF_ACCEPT,
    multiple: false,
};

// Indexed by `OperationKind as usize`
static DESCRIPTORS: [OperationDescriptor; 8] = [
    OperationDescriptor {
        kind: OperationKind::Merge,
        title: "PDF 파일 합치기",
        busy_message: "PDF 파일을 합치는 중입니다...",
        success_message: "PDF 합치기 완료!",
        primary: FileSlot {
            label: "여기에 PDF 파일들을 드롭하거나 클릭하여 선택",
            accept: PDF_ACCEPT,
            multiple: true,
        },
        secondary: None,
        text: None,
        output_file_name: "merged.pdf",
        progress: ProgressStyle::Determinate,
        preview: PreviewStyle::None,
    },
    OperationDescriptor {
        kind: OperationKind::Extract,
        title: "페이지 추출",
        busy_message: "페이지를 추출하는 중입니다...",
        success_message: "페이지 추출 완료!",
        primary: SINGLE_PDF,
        secondary: None,
        text: Some(TextInput {
            kind: TextInputKind::Text,
            label: "추출할 페이지를 선택하거나 직접 입력하세요.",
            placeholder: "예: 1, 3-5, 8",
            default_value: "",
        }),
        output_file_name: "extracted.pdf",
        progress: ProgressStyle::Indeterminate,
        preview: PreviewStyle::PdfPages,
    },
    OperationDescriptor {
        kind: OperationKind::DeleteReorder,
        title: "페이지 삭제/순서 변경",
        busy_message: "페이지를 수정하는 중입니다...",
        success_message: "페이지 수정 완료!",
        primary: SINGLE_PDF,
        secondary: None,
        text: Some(TextInput {
            kind: TextInputKind::Text,
            label: "페이지 순서를 드래그하거나, 삭제할 페이지를 선택하세요.",
            placeholder: "삭제할 페이지는 클릭하여 선택",
            default_value: "",
        }),
        output_file_name: "modified.pdf",
        progress: ProgressStyle::Indeterminate,
        preview: PreviewStyle::PdfPages,
    },
    OperationDescriptor {
        kind: OperationKind::AddWatermark,
        title: "워터마크 추가",
        busy_message: "워터마크를 추가하는 중입니다...",
        success_message: "워터마크 추가 완료!",
        primary: SINGLE_PDF,
        secondary: None,
        text: Some(TextInput {
            kind: TextInputKind::Text,
            label: "추가할 워터마크 텍스트를 입력하세요.",
            placeholder: "예: CONFIDENTIAL",
            default_value: "",
        }),
        output_file_name: "watermarked.pdf",
        progress: ProgressStyle::Indeterminate,
        preview: PreviewStyle::PdfPages,
    },
    OperationDescriptor {
        kind: OperationKind::ImageToPdf,
        title: "이미지를 PDF로 변환",
        busy_message: "이미지를 PDF로 변환 중입니다...",
        success_message: "이미지 변환 완료!",
        primary: FileSlot {
            label: "여기에 이미지 파일(JPG, PNG)들을 드롭하거나 클릭",
            accept: "image/jpeg, image/png",
            multiple: true,
        },
        secondary: None,
        text: None,
        output_file_name: "from_images.pdf",
        progress: ProgressStyle::Determinate,
        preview: PreviewStyle::Images,
    },
    OperationDescriptor {
        kind: OperationKind::Compress,
        title: "PDF 압축",
        busy_message: "PDF를 압축하는 중입니다...",
        success_message: "PDF 압축 완료!",
        primary: SINGLE_PDF,
        secondary: None,
        text: Some(TextInput {
            kind: TextInputKind::Number,
            label: "압축 품질 (1-100, 낮을수록 용량 작아짐)",
            placeholder: "",
            default_value: "75",
        }),
        output_file_name: "compressed.pdf",
        progress: ProgressStyle::Determinate,
        preview: PreviewStyle::PdfPages,
    },
    OperationDescriptor {
        kind: OperationKind::Unlock,
        title: "PDF 암호 해제",
        busy_message: "암호를 해제하는 중입니다...",
        success_message: "암호 해제 완료!",
        primary: SINGLE_PDF,
        secondary: None,
        text: Some(TextInput {
            kind: TextInputKind::Password,
            label: "PDF 암호를 입력하세요.",
            placeholder: "",
            default_value: "",
        }),
        output_file_name: "unlocked.pdf",
        progress: ProgressStyle::Indeterminate,
        preview: PreviewStyle::None,
    },
    OperationDescriptor {
        kind: OperationKind::AddCover,
        title: "표지 추가",
        busy_message: "표지를 추가하는 중입니다...",
        success_message: "표지 추가 완료!",
        primary: FileSlot {
            label: "표지 PDF 파일을 선택하세요",
            accept: PDF_ACCEPT,
            multiple: false,
        },
        secondary: Some(FileSlot {
            label: "본문 PDF 파일을 선택하세요",
            accept: PDF_ACCEPT,
            multiple: false,
        }),
        text: None,
        output_file_name: "with_cover.pdf",
        progress: ProgressStyle::Indeterminate,
        preview: PreviewStyle::None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_is_indexed_by_kind() {
        for kind in OperationKind::ALL {
            assert_eq!(kind.descriptor().kind, kind);
        }
    }

    #[test]
    fn test_tags_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(kind.tag().parse::<OperationKind>().unwrap(), kind);
        }
        assert!("split".parse::<OperationKind>().is_err());
    }

    #[test]
    fn test_serde_uses_tags() {
        let json = serde_json::to_string(&OperationKind::DeleteReorder).unwrap();
        assert_eq!(json, "\"deleteReorder\"");
        let kind: OperationKind = serde_json::from_str("\"imageToPdf\"").unwrap();
        assert_eq!(kind, OperationKind::ImageToPdf);
    }

    #[test]
    fn test_output_names_are_distinct_pdfs() {
        let mut names: Vec<&str> = OperationKind::ALL
            .iter()
            .map(|k| k.descriptor().output_file_name)
            .collect();
        assert!(names.iter().all(|n| n.ends_with(".pdf")));
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_preview_operations() {
        let with_preview: Vec<OperationKind> = OperationKind::ALL
            .into_iter()
            .filter(|k| k.descriptor().has_preview())
            .collect();
        assert_eq!(
            with_preview,
            vec![
                OperationKind::Extract,
                OperationKind::DeleteReorder,
                OperationKind::AddWatermark,
                OperationKind::ImageToPdf,
                OperationKind::Compress,
            ]
        );
    }

    #[test]
    fn test_compress_defaults_to_quality_75() {
        let text = OperationKind::Compress.descriptor().text.unwrap();
        assert_eq!(text.kind, TextInputKind::Number);
        assert_eq!(text.default_value, "75");
    }

    #[test]
    fn test_only_cover_has_secondary_slot() {
        for kind in OperationKind::ALL {
            assert_eq!(
                kind.descriptor().secondary.is_some(),
                kind == OperationKind::AddCover
            );
        }
    }
}
