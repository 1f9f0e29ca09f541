pub mod comment;
pub mod ingredient;
pub mod review;
pub mod user;
