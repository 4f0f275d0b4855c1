//! File system boundary: netkan input and `.ckan` output.

mod ckan;
mod netkan;

pub use ckan::{ckan_file_name, render_ckan, write_ckan};
pub use netkan::{parse_netkans, read_netkans};

use crate::errors::Result;
use std::fs;
use std::path::Path;

pub fn read_file(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)?;
    Ok(())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
