//! Business logic services.
//!
//! # Services
//!
//! - `auth` - registration, sign-in, and the password-reset flow
//! - `cart` - cart mutations above the merge-on-add repository
//! - `catalog` - item mutations and permission administration
//! - `checkout` - cart snapshot, pricing, charge, order materialization
//! - `guard` - capability checks shared by protected operations
//! - `mail` - transactional mail over SMTP
//! - `payment` - payment gateway client
//! - `session` - session credential codec and cookies

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod guard;
pub mod mail;
pub mod payment;
pub mod session;

pub use auth::{AuthError, AuthService, Authenticated};
pub use cart::CartService;
pub use catalog::{CatalogService, NewItem};
pub use checkout::{CheckoutService, OrderDraft, OrderStore};
pub use guard::{require_permission, require_user};
pub use mail::{MailError, Mailer};
pub use payment::{Charge, ChargeRequest, PaymentError, PaymentGateway, StripeGateway};
pub use session::{SESSION_COOKIE, SessionCodec, SessionError};
