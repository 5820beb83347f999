pub mod access;
pub mod domain;
pub mod ports;
pub mod progress;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

pub use domain::{AuthSession, Lesson, LessonProgress, Product, ProductAccess, User, UserCredentials};
pub use ports::{DatabaseService, PortError, PortResult};
pub use view::{LessonView, ProductView, ProgressView, UserView};
