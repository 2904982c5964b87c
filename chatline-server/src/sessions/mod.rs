//! Live session tracking

mod registry;
mod session;

pub use registry::{RegisterError, SessionRegistry};
pub use session::{NewSessionParams, SendFailure, Session};
