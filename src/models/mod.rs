mod payment;
mod subscription;
mod tier;
mod user;
mod webhook_event;

pub use payment::*;
pub use subscription::*;
pub use tier::*;
pub use user::*;
pub use webhook_event::*;
