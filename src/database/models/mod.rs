pub mod bootcamp;
pub mod user;

pub use bootcamp::{Bootcamp, CreateBootcamp, Location, UpdateBootcamp};
pub use user::{CreateUser, Role, UpdateUser, User};
