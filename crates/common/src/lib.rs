pub mod error;
pub mod image;
pub mod locator;
pub mod request;
pub mod status;

pub use error::{MintError, Result};
pub use image::GeneratedImage;
pub use locator::{StorageLocator, DEFAULT_GATEWAY_BASE};
pub use request::{MintRequest, UploadedFile};
pub use status::{MintOutcome, MintReceipt, RunSnapshot, RunStatus, Stage};
