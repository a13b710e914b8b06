pub mod domain;
pub mod normalize;
pub mod ports;

pub use domain::{
    routes, Credentials, Identity, PasswordReset, Registration, Role, Toast, ToastId, ToastKind,
};
pub use normalize::{identity_from_login, normalize_identity, normalize_message, resolve_role, token_from_login};
pub use ports::{keys, DurableStorage, Navigator, PortError, PortResult};
