//! Reading a model description from disk.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::ModelError;
use crate::model::Model;

/// Load and validate the model file at `path`.
///
/// The path is checked before it is opened so that the common
/// misconfigurations (no path, a missing file, a directory) produce a
/// message that names the problem rather than an operating system code.
pub fn load_model(path: &Path) -> Result<Model, ModelError> {
    if path.as_os_str().is_empty() {
        return Err(ModelError::EmptyPath);
    }
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ModelError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(ModelError::Io {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };
    if meta.is_dir() {
        return Err(ModelError::IsDirectory {
            path: path.to_path_buf(),
        });
    }

    let text = fs::read_to_string(path).map_err(|e| ModelError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let model = Model::parse(&text)?;
    tracing::info!(
        path = %path.display(),
        subcatchments = model.subcatchments.len(),
        flow_units = %model.options.flow_units,
        duration_s = model.options.duration_seconds(),
        "model loaded"
    );
    Ok(model)
}
