use std::sync::Arc;

use mitmcheck_db::Loader;

/// Where the processor reads its corpus from: the three corpus file names,
/// resolved either against the local filesystem or through a custom
/// [`Loader`].
#[derive(Clone, Default)]
pub struct Config {
    /// Known-browser records.
    pub browser_file_name: String,
    /// Known-interceptor records.
    pub mitm_file_name: String,
    /// Header names browsers never send, one per line, taken verbatim.
    pub bad_header_file_name: String,
    /// Optional blob source; `None` reads the names as filesystem paths.
    pub loader: Option<Arc<dyn Loader>>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("browser_file_name", &self.browser_file_name)
            .field("mitm_file_name", &self.mitm_file_name)
            .field("bad_header_file_name", &self.bad_header_file_name)
            .field("loader", &self.loader.as_ref().map(|_| "<custom>"))
            .finish()
    }
}
