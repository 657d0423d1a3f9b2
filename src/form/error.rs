// Form parsing errors

/// Reasons a request body could not be turned into a form
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("invalid multipart content type: {0}")]
    ContentType(#[source] multer::Error),

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("form values exceed {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to store form file: {0}")]
    Io(#[from] std::io::Error),
}
