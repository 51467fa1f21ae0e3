use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyerError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: String,
    },

    #[error("Playback already in progress")]
    AlreadyPlaying,

    #[error("Nothing to play: text is empty or contains no encodable characters")]
    NothingToPlay,

    #[error("No tone generator attached")]
    MissingGenerator,

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KeyerError>;
