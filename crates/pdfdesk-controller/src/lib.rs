//! Operation UI controller
//!
//! A state machine over [`ViewState`] that owns the inputs of the open
//! operation form, validates them, turns them into a [`Job`], and maps the
//! job's result to a download, toasts and the next state. It has no
//! knowledge of the DOM or terminal; hosts call [`Controller::render`] and
//! draw the returned [`ViewModel`].
//!
//! ```text
//! MainMenu --select--> OperationForm --apply--> Busy --finish--> MainMenu
//!              ^            |   (invalid: toast, stay)  |
//!              +----home----+--------------home---------+
//! ```

pub mod descriptor;
pub mod error;
pub mod grid;
pub mod job;
pub mod log;
pub mod view;

pub use descriptor::{OperationDescriptor, OperationKind};
pub use error::ControllerError;
pub use grid::PageGrid;
pub use job::{Download, InputFile, Job, JobInput};
pub use log::{ActivityEntry, ActivityLog};
pub use view::ViewModel;

use descriptor::PreviewStyle;
use pdfdesk_core::{ModifyPagesCommand, PdfDeskError, Quality, RasterizerFactory};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewState {
    #[default]
    MainMenu,
    OperationForm(OperationKind),
    Busy {
        operation: OperationKind,
        message: &'static str,
        /// Percentage, once the job has reported progress
        progress: Option<u8>,
    },
}

pub const WRONG_PASSWORD_MESSAGE: &str = "암호가 잘못되었습니다.";
pub const NO_VALID_PAGES_MESSAGE: &str = "유효한 페이지 번호가 없습니다.";
const QUALITY_RANGE_MESSAGE: &str = "압축 품질은 1에서 100 사이의 숫자여야 합니다.";
const MARKER_FORMAT_MESSAGE: &str = "입력 형식 오류: \"순서 변경:\" 또는 \"삭제:\"를 포함해야 합니다.";

#[derive(Debug, Default)]
pub struct Controller {
    state: ViewState,
    files: Vec<InputFile>,
    secondary_file: Option<InputFile>,
    text: String,
    grid: Option<PageGrid>,
    preview_error: Option<String>,
    toasts: Vec<Toast>,
    log: ActivityLog,
    next_job_id: u64,
    active_job: Option<u64>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// The operation whose form is open or which is running.
    pub fn operation(&self) -> Option<OperationKind> {
        match self.state {
            ViewState::MainMenu => None,
            ViewState::OperationForm(operation) | ViewState::Busy { operation, .. } => {
                Some(operation)
            }
        }
    }

    pub fn files(&self) -> &[InputFile] {
        &self.files
    }

    pub fn secondary_file(&self) -> Option<&InputFile> {
        self.secondary_file.as_ref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn grid(&self) -> Option<&PageGrid> {
        self.grid.as_ref()
    }

    pub fn preview_error(&self) -> Option<&str> {
        self.preview_error.as_deref()
    }

    pub(crate) fn grid_is_sortable(&self) -> bool {
        self.grid.is_some() && self.operation() == Some(OperationKind::DeleteReorder)
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn render(&self) -> ViewModel {
        view::render(self)
    }

    /// Drain toasts raised since the last call.
    pub fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    /// Open the form for `operation`, discarding any inputs of a previous one.
    pub fn select(&mut self, operation: OperationKind) -> Result<(), ControllerError> {
        if matches!(self.state, ViewState::Busy { .. }) {
            return Err(ControllerError::Busy);
        }

        self.reset_inputs();
        self.text = operation
            .descriptor()
            .text
            .map(|input| input.default_value.to_string())
            .unwrap_or_default();
        self.state = ViewState::OperationForm(operation);
        self.log.add(format!("새로운 작업을 시작합니다: {}", operation));
        tracing::debug!(%operation, "operation selected");
        Ok(())
    }

    /// Back to the main menu from anywhere. A running job's result will be
    /// discarded when it arrives.
    pub fn home(&mut self) {
        if let Some(job) = self.active_job.take() {
            tracing::debug!(job, "abandoning running job");
        }
        self.show_main_menu();
    }

    fn show_main_menu(&mut self) {
        self.reset_inputs();
        self.log.clear();
        self.state = ViewState::MainMenu;
    }

    fn reset_inputs(&mut self) {
        self.files.clear();
        self.secondary_file = None;
        self.text.clear();
        self.grid = None;
        self.preview_error = None;
    }

    fn form_operation(&self) -> Result<OperationKind, ControllerError> {
        match self.state {
            ViewState::OperationForm(operation) => Ok(operation),
            ViewState::Busy { .. } => Err(ControllerError::Busy),
            ViewState::MainMenu => Err(ControllerError::NotInForm),
        }
    }

    /// Replace the primary file selection. For operations with a PDF
    /// preview the first file is loaded into the page grid.
    pub fn set_files(&mut self, files: Vec<InputFile>) -> Result<(), ControllerError> {
        let operation = self.form_operation()?;
        self.files = files;
        self.grid = None;
        self.preview_error = None;

        if operation.descriptor().preview != PreviewStyle::PdfPages {
            return Ok(());
        }
        let Some(first) = self.files.first().filter(|file| file.is_pdf()) else {
            return Ok(());
        };

        match pdfdesk_core::validate_pdf(&first.bytes) {
            Ok(info) => {
                tracing::debug!(pages = info.page_count, file = %first.name, "preview loaded");
                self.grid = Some(PageGrid::new(info.page_count));
            }
            Err(err) => {
                let message = format!("미리보기 오류: {}", err);
                tracing::warn!(file = %first.name, error = %err, "preview failed");
                self.log.add(message.clone());
                self.preview_error = Some(message);
            }
        }
        Ok(())
    }

    pub fn set_secondary_file(&mut self, file: Option<InputFile>) -> Result<(), ControllerError> {
        let operation = self.form_operation()?;
        if operation.descriptor().secondary.is_none() {
            return Err(ControllerError::NoSecondaryInput(operation));
        }
        self.secondary_file = file;
        Ok(())
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), ControllerError> {
        let operation = self.form_operation()?;
        if operation.descriptor().text.is_none() {
            return Err(ControllerError::NoTextInput(operation));
        }
        self.text = text.into();
        Ok(())
    }

    /// Click on a preview tile. Extract writes the selection into the text
    /// input; delete/reorder writes a delete directive.
    pub fn toggle_page(&mut self, page_number: u32) -> Result<bool, ControllerError> {
        let operation = self.form_operation()?;
        let grid = self.grid.as_mut().ok_or(ControllerError::NoPreview)?;
        let selected = grid.toggle(page_number)?;

        let pages = grid.selected_in_display_order();
        match operation {
            OperationKind::Extract => self.text = pdfdesk_core::serialize_selection(&pages),
            OperationKind::DeleteReorder => self.text = pdfdesk_core::serialize_delete(&pages),
            _ => {}
        }
        Ok(selected)
    }

    /// Drag of a preview tile; writes a reorder directive for the full
    /// display order.
    pub fn move_page(&mut self, from: usize, to: usize) -> Result<(), ControllerError> {
        let operation = self.form_operation()?;
        if operation != OperationKind::DeleteReorder {
            return Err(ControllerError::ReorderUnavailable(operation));
        }
        let grid = self.grid.as_mut().ok_or(ControllerError::NoPreview)?;
        grid.move_page(from, to)?;
        self.text = pdfdesk_core::serialize_reorder(grid.display_order());
        Ok(())
    }

    /// Validate the form and, if it is complete, enter `Busy` and return
    /// the job to run. Invalid input raises an error toast, keeps the form
    /// open and returns `Ok(None)`.
    pub fn begin_apply(&mut self) -> Result<Option<Job>, ControllerError> {
        let operation = self.form_operation()?;
        let input = match self.job_input(operation) {
            Ok(input) => input,
            Err(message) => {
                tracing::debug!(%operation, reason = message, "validation failed");
                self.toasts.push(Toast::error(message));
                return Ok(None);
            }
        };

        self.next_job_id += 1;
        let id = self.next_job_id;
        self.active_job = Some(id);
        self.state = ViewState::Busy {
            operation,
            message: operation.descriptor().busy_message,
            progress: None,
        };
        tracing::debug!(job = id, %operation, "job started");
        Ok(Some(Job::new(id, input)))
    }

    /// Build the job input from the form, or the validation message.
    fn job_input(&self, operation: OperationKind) -> Result<JobInput, &'static str> {
        let first_pdf = || self.files.first().map(|file| file.bytes.clone());

        match operation {
            OperationKind::Merge => {
                if self.files.len() < 2 {
                    return Err("PDF 파일을 2개 이상 선택해주세요.");
                }
                Ok(JobInput::Merge {
                    files: self.files.iter().map(|file| file.bytes.clone()).collect(),
                })
            }
            OperationKind::Extract => match first_pdf() {
                Some(pdf) if !self.text.is_empty() => Ok(JobInput::Extract {
                    pdf,
                    ranges: self.text.clone(),
                }),
                _ => Err("파일과 추출할 페이지를 입력/선택해주세요."),
            },
            OperationKind::DeleteReorder => match first_pdf() {
                Some(pdf) if !self.text.is_empty() => {
                    let command =
                        ModifyPagesCommand::parse(&self.text).map_err(|_| MARKER_FORMAT_MESSAGE)?;
                    Ok(JobInput::ModifyPages { pdf, command })
                }
                _ => Err("파일과 작업 정보를 입력해주세요."),
            },
            OperationKind::AddWatermark => match first_pdf() {
                Some(pdf) if !self.text.is_empty() => Ok(JobInput::AddWatermark {
                    pdf,
                    text: self.text.clone(),
                }),
                _ => Err("파일과 워터마크 텍스트를 입력해주세요."),
            },
            OperationKind::ImageToPdf => {
                if self.files.is_empty() {
                    return Err("이미지 파일을 선택해주세요.");
                }
                Ok(JobInput::ImageToPdf {
                    images: self.files.clone(),
                })
            }
            OperationKind::Compress => {
                let pdf = first_pdf().ok_or("PDF 파일을 선택해주세요.")?;
                let quality: Quality = self.text.parse().map_err(|_| QUALITY_RANGE_MESSAGE)?;
                Ok(JobInput::Compress { pdf, quality })
            }
            OperationKind::Unlock => {
                let pdf = first_pdf().ok_or("PDF 파일을 선택해주세요.")?;
                Ok(JobInput::Unlock {
                    pdf,
                    password: self.text.clone(),
                })
            }
            OperationKind::AddCover => match (first_pdf(), &self.secondary_file) {
                (Some(cover), Some(main)) => Ok(JobInput::AddCover {
                    cover,
                    main: main.bytes.clone(),
                }),
                _ => Err("표지 파일과 본문 파일을 모두 선택해주세요."),
            },
        }
    }

    /// Progress from a running job. Ignored for jobs that are no longer
    /// active.
    pub fn report_progress(&mut self, job_id: u64, done: usize, total: usize) {
        if self.active_job != Some(job_id) || total == 0 {
            return;
        }
        if let ViewState::Busy { progress, .. } = &mut self.state {
            let percent = (done as f64 / total as f64 * 100.0).round().clamp(0.0, 100.0);
            *progress = Some(percent as u8);
        }
    }

    /// Deliver a job's result. Returns the download on success. A result
    /// for a job abandoned by [`Controller::home`] is dropped.
    pub fn finish(
        &mut self,
        job_id: u64,
        result: Result<Download, PdfDeskError>,
    ) -> Option<Download> {
        let ViewState::Busy { operation, .. } = self.state else {
            tracing::debug!(job = job_id, "result arrived outside busy state, dropped");
            return None;
        };
        if self.active_job != Some(job_id) {
            tracing::debug!(job = job_id, "stale job result dropped");
            return None;
        }
        self.active_job = None;
        self.show_main_menu();

        match result {
            Ok(download) => {
                tracing::info!(
                    %operation,
                    file = %download.file_name,
                    bytes = download.bytes.len(),
                    "operation completed"
                );
                self.toasts
                    .push(Toast::success(operation.descriptor().success_message));
                Some(download)
            }
            Err(err) => {
                tracing::warn!(%operation, error = %err, "operation failed");
                self.toasts.push(Toast::error(failure_message(operation, &err)));
                None
            }
        }
    }

    /// Validate, run and finish in one call.
    pub fn apply(
        &mut self,
        rasterizers: &dyn RasterizerFactory,
    ) -> Result<Option<Download>, ControllerError> {
        let Some(job) = self.begin_apply()? else {
            return Ok(None);
        };
        let id = job.id();
        let result = job.run(rasterizers, &mut |done, total| {
            self.report_progress(id, done, total)
        });
        Ok(self.finish(id, result))
    }
}

/// Toast text for a failed operation.
fn failure_message(operation: OperationKind, err: &PdfDeskError) -> String {
    match err {
        _ if operation == OperationKind::Unlock && err.is_password_error() => {
            WRONG_PASSWORD_MESSAGE.to_string()
        }
        PdfDeskError::NoValidPages => NO_VALID_PAGES_MESSAGE.to_string(),
        _ => format!("오류: {}", err),
    }
}
