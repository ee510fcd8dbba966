pub mod error_report;
pub mod file_io;
pub mod html;
pub mod path;
pub mod time;

pub use error_report::*;
pub use file_io::*;
pub use html::*;
pub use path::*;
pub use time::*;
