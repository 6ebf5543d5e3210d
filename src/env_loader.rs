use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(rankroll_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    match (rankroll_home, home_dir) {
        (Some(base), _) => Some(base.join(".env")),
        (None, Some(home)) => Some(home.join("rankroll/.env")),
        (None, None) => None,
    }
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("RANKROLL_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn fallback_uses_rankroll_home_directly() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/srv/rankroll")),
            Some(PathBuf::from("/home/alice")),
        );
        assert_eq!(got, Some(PathBuf::from("/srv/rankroll/.env")));
    }

    #[test]
    fn fallback_uses_home_when_rankroll_home_unset() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/alice")));
        assert_eq!(got, Some(PathBuf::from("/home/alice/rankroll/.env")));
    }
}
