use crate::api::DEFAULT_MAX_TEXT_LEN;

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    /// Longest comment body accepted, in bytes. Longer texts are rejected
    /// before any optimistic write.
    pub max_text_len: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            max_text_len: DEFAULT_MAX_TEXT_LEN,
        }
    }
}
