pub mod change_requests;
pub mod output;
pub mod proposals;
pub mod public;
