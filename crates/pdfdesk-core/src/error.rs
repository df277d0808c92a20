use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfDeskError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("No valid pages selected")]
    NoValidPages,

    #[error("Invalid page command: {0}")]
    InvalidCommand(String),

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Failed to decrypt PDF: {0}")]
    Decryption(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Text cannot be encoded with the standard font: {0}")]
    UnencodableText(String),

    #[error("Page rendering failed: {0}")]
    Render(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),
}

impl PdfDeskError {
    /// True when the failure came from a rejected password.
    pub fn is_password_error(&self) -> bool {
        matches!(self, PdfDeskError::IncorrectPassword)
            || self.to_string().to_lowercase().contains("password")
    }
}

impl From<lopdf::Error> for PdfDeskError {
    fn from(err: lopdf::Error) -> Self {
        PdfDeskError::OperationError(err.to_string())
    }
}
