use std::path::Path;
use std::sync::Arc;

use websocket::Config;

impl Config {
    /// Create a config with defaults
    pub fn new() -> Config {
        Config {
            max_frame_size: 10 << 20,
            max_message_size: 10 << 20,
            body_memory_threshold: 128 << 10,
            spool_dir: None,
        }
    }

    /// Maximum size of a single frame
    ///
    /// If some frame declares size larger than this, we immediately abort
    /// the connection.
    pub fn max_frame_size(&mut self, size: usize) -> &mut Self {
        self.max_frame_size = size;
        self
    }

    /// Maximum size of a reassembled message
    ///
    /// A fragmented message may stay under the frame limit per frame and
    /// still exceed this; the check runs on every accepted frame header.
    pub fn max_message_size(&mut self, size: usize) -> &mut Self {
        self.max_message_size = size;
        self
    }

    /// Message payloads beyond this size are spooled to disk
    ///
    /// Only effective when a spool directory is configured, same policy
    /// as HTTP bodies.
    pub fn body_memory_threshold(&mut self, size: usize) -> &mut Self {
        self.body_memory_threshold = size;
        self
    }

    /// Directory for payload spool files
    pub fn spool_dir(&mut self, dir: &Path) -> &mut Self {
        self.spool_dir = Some(dir.to_path_buf());
        self
    }

    /// Create a Arc'd config clone to pass to the constructor
    ///
    /// This is just a convenience method.
    pub fn done(&mut self) -> Arc<Config> {
        Arc::new(self.clone())
    }
}
