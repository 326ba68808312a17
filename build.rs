use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn source_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(next) = pending.pop() {
        for entry in fs::read_dir(&next)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// A quoted literal that names an `SS_*` variable, e.g. `"SS_BASE_URL"`.
fn is_ss_var(literal: &str) -> bool {
    literal.len() > 3
        && literal.starts_with("SS_")
        && literal
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

fn ss_vars_in(source: &str) -> impl Iterator<Item = &str> {
    // Every other segment of a `"`-split sits between quotes; false positives
    // from escaped quotes still have to pass `is_ss_var`.
    source.split('"').skip(1).step_by(2).filter(|s| is_ss_var(s))
}

fn render_allowlist(vars: &BTreeSet<String>) -> String {
    let mut out = String::from("pub const GENERATED_SS_ENV_ALLOWLIST: &[&str] = &[\n");
    for var in vars {
        out.push_str(&format!("    \"{var}\",\n"));
    }
    out.push_str("];\n");
    out
}

fn main() {
    let mut vars = BTreeSet::new();
    let files = source_files(Path::new("src")).expect("failed to walk src/");
    for file in files {
        if let Ok(content) = fs::read_to_string(&file) {
            vars.extend(ss_vars_in(&content).map(str::to_string));
        }
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    fs::write(
        Path::new(&out_dir).join("ss_env_allowlist.rs"),
        render_allowlist(&vars),
    )
    .expect("failed to write SS env allowlist");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
