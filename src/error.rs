use std::fmt::{Display, Formatter};

/// Errors produced while loading, aggregating, rendering or serving asset data
#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Calamine(calamine::Error),
    /// The uploaded file's extension is neither `xlsx` nor `xls`
    UnsupportedFileType(String),
    MissingExtension,
    EmptyWorkbook,
    /// Nothing to draw or export for the requested selection
    NoData(String),
    InvalidInput(String),
    Chart(String),
    #[cfg(feature = "web")]
    Image(image::ImageError),
    #[cfg(feature = "web")]
    Xlsx(rust_xlsxwriter::XlsxError),
    #[cfg(feature = "web")]
    Template(handlebars::RenderError),
    Generic(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IO(err) => err.fmt(f),
            Error::Calamine(err) => err.fmt(f),
            Error::UnsupportedFileType(ext) => write!(f, "Unsupported file type: {}", ext),
            Error::MissingExtension => write!(f, "File has no extension"),
            Error::EmptyWorkbook => write!(f, "Workbook has no worksheet"),
            Error::NoData(err) => write!(f, "{}", err),
            Error::InvalidInput(err) => write!(f, "{}", err),
            Error::Chart(err) => write!(f, "Failed to draw chart: {}", err),
            #[cfg(feature = "web")]
            Error::Image(err) => err.fmt(f),
            #[cfg(feature = "web")]
            Error::Xlsx(err) => err.fmt(f),
            #[cfg(feature = "web")]
            Error::Template(err) => err.fmt(f),
            Error::Generic(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<&str> for Error {
    fn from(str: &str) -> Self {
        Error::Generic(str.to_owned())
    }
}

impl From<String> for Error {
    fn from(str: String) -> Self {
        Error::Generic(str)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

impl From<calamine::Error> for Error {
    fn from(error: calamine::Error) -> Self {
        Error::Calamine(error)
    }
}

#[cfg(feature = "web")]
impl From<image::ImageError> for Error {
    fn from(error: image::ImageError) -> Self {
        Error::Image(error)
    }
}

#[cfg(feature = "web")]
impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        Error::Xlsx(error)
    }
}

#[cfg(feature = "web")]
impl From<handlebars::RenderError> for Error {
    fn from(error: handlebars::RenderError) -> Self {
        Error::Template(error)
    }
}

#[cfg(feature = "web")]
impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for Error
where
    E: std::error::Error + Send + Sync,
{
    fn from(error: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        Error::Chart(error.to_string())
    }
}
