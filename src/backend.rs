pub mod args;
pub mod external;
pub mod manager;
pub mod probe;
pub mod process;
pub mod properties;
pub mod workshop;
