pub mod config;
pub mod dispatcher;
pub mod error;
pub mod form;
pub mod logger;
pub mod models;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod transport;

pub use config::{Config, DeepInfraConfig, OpenAiConfig};
pub use dispatcher::{Dispatcher, GenerationPhase, GenerationTask};
pub use error::{ErrorKind, LumiereError, Result};
pub use form::{apply_form, FormInput};
pub use models::{GenerationResult, ImageModel, ProviderFamily, SessionState};
pub use providers::ImageProvider;
pub use transport::{HttpReply, HttpTransport, ProviderRequest, ReqwestTransport};
