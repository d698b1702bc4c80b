pub mod event;
pub mod path;
pub mod podcast;
pub mod request;
pub mod response;
