use eyre::{Result, WrapErr};
use std::path::Path;

pub fn read(json_path: &Path) -> Result<serde_json::Value> {
    let file = std::fs::File::open(json_path)
        .wrap_err_with(|| format!("failed to open {}", json_path.display()))?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
