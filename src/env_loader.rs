use std::env;
use std::path::PathBuf;

fn fallback_dotenv_paths(docshelf_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(base) = docshelf_home {
        out.push(base.join(".env"));
    }
    if let Some(home) = home_dir {
        out.push(home.join(".docshelf/.env"));
    }
    out
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let candidates = fallback_dotenv_paths(
        env::var_os("DOCSHELF_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    if let Some(path) = candidates.into_iter().find(|p| p.is_file()) {
        let _ = dotenvy::from_path(&path);
    }
}
