//! Pure mapping from controller state to display configuration
//!
//! Hosts re-render from a [`ViewModel`] after every call; nothing here
//! mutates the controller.

use crate::descriptor::{FileSlot, PreviewStyle, TextInputKind};
use crate::grid::PageTile;
use crate::{Controller, ViewState};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    MainMenu,
    OperationForm,
    /// Status panel with busy message and optional progress bar
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PaneWidth {
    Full,
    OneThird,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSlotView {
    pub label: &'static str,
    pub accept: &'static str,
    pub multiple: bool,
    /// Chosen file names joined with ", "
    pub file_list: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInputView {
    pub kind: TextInputKind,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub message: &'static str,
    /// Rounded percentage once progress has been reported
    pub progress_percent: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewView {
    pub style: PreviewStyle,
    pub pages: Vec<PageTile>,
    /// Image file names, for the image thumbnail preview
    pub images: Vec<String>,
    pub error: Option<String>,
    pub placeholder_visible: bool,
    /// Tiles can be dragged to reorder
    pub sortable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub screen: Screen,
    pub home_button_visible: bool,
    pub title: Option<&'static str>,
    pub primary_file: Option<FileSlotView>,
    pub secondary_file: Option<FileSlotView>,
    pub text_input: Option<TextInputView>,
    pub status: Option<StatusView>,
    pub preview: Option<PreviewView>,
    pub control_pane: PaneWidth,
    pub log_visible: bool,
    pub log: Vec<String>,
}

fn slot_view(slot: &FileSlot, names: impl Iterator<Item = String>) -> FileSlotView {
    FileSlotView {
        label: slot.label,
        accept: slot.accept,
        multiple: slot.multiple,
        file_list: names.collect::<Vec<_>>().join(", "),
    }
}

pub fn render(controller: &Controller) -> ViewModel {
    let log = controller.activity_log().lines();
    let mut view = ViewModel {
        screen: Screen::MainMenu,
        home_button_visible: false,
        title: None,
        primary_file: None,
        secondary_file: None,
        text_input: None,
        status: None,
        preview: None,
        control_pane: PaneWidth::Full,
        log_visible: !log.is_empty(),
        log,
    };

    match controller.state() {
        ViewState::MainMenu => view,
        ViewState::Busy {
            message, progress, ..
        } => {
            view.screen = Screen::Status;
            view.status = Some(StatusView {
                message: *message,
                progress_percent: *progress,
            });
            view
        }
        ViewState::OperationForm(operation) => {
            let descriptor = operation.descriptor();
            view.screen = Screen::OperationForm;
            view.home_button_visible = true;
            view.title = Some(descriptor.title);
            view.primary_file = Some(slot_view(
                &descriptor.primary,
                controller.files().iter().map(|f| f.name.clone()),
            ));
            view.secondary_file = descriptor.secondary.as_ref().map(|slot| {
                slot_view(slot, controller.secondary_file().map(|f| f.name.clone()).into_iter())
            });
            view.text_input = descriptor.text.map(|input| TextInputView {
                kind: input.kind,
                label: input.label,
                placeholder: input.placeholder,
                value: controller.text().to_string(),
            });

            if descriptor.has_preview() {
                view.control_pane = PaneWidth::OneThird;
                view.preview = Some(preview_view(controller, descriptor.preview));
            }
            view
        }
    }
}

fn preview_view(controller: &Controller, style: PreviewStyle) -> PreviewView {
    let pages = controller.grid().map(|grid| grid.tiles()).unwrap_or_default();
    let images: Vec<String> = match style {
        PreviewStyle::Images => controller.files().iter().map(|f| f.name.clone()).collect(),
        _ => Vec::new(),
    };
    let error = controller.preview_error().map(str::to_string);
    PreviewView {
        style,
        placeholder_visible: pages.is_empty() && images.is_empty() && error.is_none(),
        sortable: controller.grid_is_sortable(),
        pages,
        images,
        error,
    }
}
