pub mod config;
pub mod domain;
pub mod errors;
pub mod lifecycle;

pub use domain::item::{Item, ItemId, Listing, NewItem};
pub use domain::request::{Decision, PurchaseRequest, RequestId, RequestStatus};
pub use domain::user::{NewUser, User, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use lifecycle::gateway::{GatewayError, RequestGateway, RequestListing, RequestQuery};
pub use lifecycle::{DecidedRequest, RequestLifecycleEngine, SubmittedRequest};
