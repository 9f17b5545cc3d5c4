pub mod connection;
pub mod request;
pub mod response;

pub use connection::{CgiHandle, Connection, ConnectionState};
pub use request::{BodyProgress, HttpRequest, ParsingState, READ_BUF_SIZE, find_subsequence};
pub use response::{HttpResponse, generate_autoindex, get_mime_type, handle_error, status_text};
