// Client module - analysis, selection and job tracking against the download service

pub mod backend;
pub mod controller;
pub mod diagnostics;
pub mod errors;
pub mod format_selector;
pub mod models;
pub mod platform;
pub mod session;
pub mod traits;
pub mod utils;
pub mod view;

pub use backend::HttpBackend;
pub use controller::{Controller, SubmitMode, UiVariant};
pub use errors::{ClientError, Result, SelectionStep};
pub use models::{MediaKind, QualityToken, VideoMetadata};
pub use platform::Platform;
pub use session::{JobOutcome, Session};
pub use traits::{BackendApi, Presenter};
pub use view::View;
