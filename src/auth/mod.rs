/// Authentication module
///
/// Self-contained HS256 token engine (codec, signer, duration parser),
/// refresh-token rotating session manager, password hashing
/// and the account sign-up/login service.

mod claims;
mod clock;
mod codec;
mod duration;
mod password;
mod service;
mod session;
mod signer;
mod token;

pub use claims::{Claims, Identity};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{decode, encode};
pub use duration::parse_duration;
pub use password::{hash_password, verify_password};
pub use service::{AuthService, SignedIn};
pub use session::{CredentialPair, Renewal, RenewalError, SessionError, SessionManager};
pub use signer::{sign, signatures_match};
pub use token::{Payload, TokenEngine, TokenError};
