use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for file extensions that may appear in a storage key
    /// Must be lowercase alphanumeric, 1 to 10 characters
    /// - Valid: "pdf", "docx", "7z", "mp4"
    /// - Invalid: "", "PDF", "tar.gz", "a b", "verylongextension"
    pub static ref STORAGE_EXTENSION_REGEX: Regex = Regex::new(r"^[a-z0-9]{1,10}$").unwrap();
}

/// Lower-cased extension of a file name, if it has one
///
/// A leading dot alone (".env") does not count as an extension.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
