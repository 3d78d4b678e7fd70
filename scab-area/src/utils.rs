use std::path::Path;

use image::DynamicImage;
use slog::{o, Drain, FnValue, Logger};

use crate::error::{MeasureError, Result};

pub struct ImageUtil {}
impl ImageUtil {
    /// Decode an in-memory image. The format is sniffed from the leading bytes;
    /// multi-page TIFF yields its first page.
    pub fn decode(name: &str, bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|source| MeasureError::Decode {
            name: name.to_string(),
            source,
        })
    }

    /// Read and decode an image from disk. Returns the file name with the image.
    pub fn read(path: &Path) -> Result<(String, DynamicImage)> {
        let bytes = std::fs::read(path).map_err(|source| MeasureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = Self::file_name(path);
        let image = Self::decode(&name, &bytes)?;
        Ok((name, image))
    }

    pub fn file_name(path: &Path) -> String {
        path.file_name()
            .unwrap_or(path.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}

pub fn set_log_config() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(
        drain,
        o!("place" =>
         FnValue(move |info| {
             format!("{}:{} {}",
                     info.file(),
                     info.line(),
                     info.module(),
                     )
         })
        ),
    )
}
