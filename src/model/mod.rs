pub mod attendance;
pub mod department;
pub mod role;
pub mod student;
pub mod user;
