pub mod utils;

mod reports;
