pub mod driver;
pub mod history;
pub mod issue;
pub mod location;
pub mod offer;
pub mod session;
pub mod trip;
