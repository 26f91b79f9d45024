// Public modules
pub mod batch;
pub mod config;
pub mod history;
pub mod io;
pub mod models;
pub mod params;
pub mod resolver;
pub mod rpc;
pub mod token;
pub mod transport;

// Re-export commonly used types
pub use batch::BatchResolver;
pub use config::ResolverConfig;
pub use history::{HistoryStats, HistoryStore};
pub use io::{get_default_history_path, read_url_list, write_report};
pub use models::{BatchReport, DecodingParams, Resolution, ResolveError};
pub use resolver::Resolver;
pub use token::{extract_token, is_redirect_link, TokenMatch};
pub use transport::{HttpTransport, Transport, TransportError};
