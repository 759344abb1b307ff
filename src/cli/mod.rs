pub mod assets;
pub mod price;
pub mod serve;
pub mod setup;
pub mod ui;
