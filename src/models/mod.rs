pub mod account;
pub mod assignment;
pub mod event;
pub mod ids;
pub mod order;
pub mod value;
