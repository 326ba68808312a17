use std::env;
use std::path::PathBuf;

const DATA_DIR_NAME: &str = ".silent_summarizer";

/// `.env` inside the data home: `SS_HOME` when set, else `~/.silent_summarizer`.
fn data_home_dotenv(ss_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    let base = match ss_home.filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => home_dir?.join(DATA_DIR_NAME),
    };
    Some(base.join(".env"))
}

/// Load `.env` from the working directory (or its parents), falling back to
/// the data home. Returns the file that was applied, if any.
///
/// Runs before logging is initialised so `SS_LOG` can come from the file.
pub fn load_dotenv() -> Option<PathBuf> {
    if let Ok(path) = dotenvy::dotenv() {
        return Some(path);
    }

    let path = data_home_dotenv(env::var_os("SS_HOME").map(PathBuf::from), dirs::home_dir())?;
    if !path.is_file() {
        return None;
    }
    dotenvy::from_path(&path).ok().map(|_| path)
}
