mod episode;

pub use episode::{Category, Episode, EpisodeStatus, Language, StreamingUrls};
