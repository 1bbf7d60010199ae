//! Authentication layer: challenge issuance, EIP-191 signature
//! verification, token codec, session management, and the request gate.

pub mod challenge;
pub mod middleware;
pub mod session;
pub mod token;
pub mod verify;

pub use challenge::{issue_challenge, IssuedChallenge};
pub use middleware::{attach_auth, extract_bearer_token, require_auth, AppState, AuthSession};
pub use session::SessionManager;
pub use token::TokenCodec;
pub use verify::{recover_address, verify_wallet_signature};
