use std::io;

use thiserror::Error;

use crate::providers::FetchError;

/// Why a download stopped. The `Display` text is the underlying error detail
/// alone, since it is embedded verbatim in the `FAILED <detail>` status.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{0}")]
    CreateFile(#[source] io::Error),

    #[error("{0}")]
    OpenRemote(#[source] FetchError),

    #[error("{0}")]
    Transfer(#[source] FetchError),

    #[error("{0}")]
    WriteFile(#[source] io::Error),

    #[error("{0}")]
    Finalize(#[source] FetchError),
}

impl DownloadError {
    /// Short description of the step that failed, for logs
    pub fn step(&self) -> &'static str {
        match self {
            DownloadError::CreateFile(_) => "create local file",
            DownloadError::OpenRemote(_) => "open remote object",
            DownloadError::Transfer(_) => "stream remote object",
            DownloadError::WriteFile(_) => "write local file",
            DownloadError::Finalize(_) => "finish remote read",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DownloadError;
    use std::io;

    #[test]
    fn display_is_the_underlying_detail() {
        let err = DownloadError::CreateFile(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "permission denied",
        ));
        assert_eq!(err.to_string(), "permission denied");
        assert_eq!(err.step(), "create local file");

        let err = DownloadError::Finalize("short read".into());
        assert_eq!(err.to_string(), "short read");
        assert_eq!(err.step(), "finish remote read");
    }

    #[test]
    fn every_step_has_its_own_name() {
        let errors = [
            DownloadError::CreateFile(io::Error::other("create")),
            DownloadError::OpenRemote("open".into()),
            DownloadError::Transfer("transfer".into()),
            DownloadError::WriteFile(io::Error::other("write")),
            DownloadError::Finalize("finalize".into()),
        ];
        let steps: Vec<&str> = errors.iter().map(DownloadError::step).collect();
        assert_eq!(
            steps,
            [
                "create local file",
                "open remote object",
                "stream remote object",
                "write local file",
                "finish remote read",
            ]
        );
    }
}
