pub mod config;
pub mod object;
pub mod operator;
pub mod path;


pub use config::{Backend, StorageConfig};
pub use object::{ObjectStorage, OperatorStorage, StoredObject};
pub use operator::{create_operator, init_operator};
pub use path::{recording_file_name, sanitize_title, validate_path};
