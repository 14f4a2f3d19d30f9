/// Error kinds that can occur in overlay-lib
#[derive(Debug)]
pub enum ErrorKind {
    Fetch(crate::fetch::FetchErrorKind),
    General(String),
    InvalidUsername(String),
    Io(std::io::Error),
    NoLobby,
    NoOwnUsername,
    Reqwest(reqwest::Error),
    SerdeJson(serde_json::Error),
    SettingsParse(toml::de::Error),
    SettingsWrite(toml::ser::Error),
    TailerOpen(std::path::PathBuf, std::io::Error),
}

/// Errors that can occur in overlay-lib, optionally including a file and line number
/// where they were generated
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorKind::*;
        if let Some(file) = self.file {
            write!(f, "{file}:")?;
        }
        if let Some(line) = self.line {
            write!(f, "{line}:")?;
        }
        match &self.kind {
            Fetch(e) => write!(f, "fetch error: {e}"),
            General(s) => write!(f, "{s}"),
            InvalidUsername(s) => write!(f, "invalid username: {s}"),
            Io(e) => write!(f, "IO error: {e}"),
            NoLobby => write!(f, "not currently in a lobby"),
            NoOwnUsername => write!(f, "own username is not known yet"),
            Reqwest(e) => write!(f, "HTTP error: {e}"),
            SerdeJson(e) => write!(f, "JSON error: {e}"),
            SettingsParse(e) => write!(f, "settings file is not valid TOML: {e}"),
            SettingsWrite(e) => write!(f, "could not serialize settings: {e}"),
            TailerOpen(path, e) => write!(f, "could not open {}: {e}", path.display()),
        }
    }
}

impl std::error::Error for Error {}

impl<E> From<(E, &'static str, u32)> for Error
where
    ErrorKind: From<E>,
{
    fn from(triplet: (E, &'static str, u32)) -> Error {
        Error {
            kind: triplet.0.into(),
            file: Some(triplet.1),
            line: Some(triplet.2),
        }
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(intoek: E) -> Error {
        Error {
            kind: intoek.into(),
            file: None,
            line: None,
        }
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(e: std::io::Error) -> ErrorKind {
        ErrorKind::Io(e)
    }
}

impl From<reqwest::Error> for ErrorKind {
    fn from(e: reqwest::Error) -> ErrorKind {
        ErrorKind::Reqwest(e)
    }
}

impl From<serde_json::Error> for ErrorKind {
    fn from(e: serde_json::Error) -> ErrorKind {
        ErrorKind::SerdeJson(e)
    }
}

impl From<crate::fetch::FetchErrorKind> for ErrorKind {
    fn from(e: crate::fetch::FetchErrorKind) -> ErrorKind {
        ErrorKind::Fetch(e)
    }
}
