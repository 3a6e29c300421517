pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use memory::MemoryUserStore;
pub use model::{NewUser, PublicUser, Role, User};
pub use postgres::PgUserStore;
pub use store::{StoreError, UserStore};
