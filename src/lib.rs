pub mod clock;
pub mod command;
pub mod frame;
pub mod ingest;
pub mod sensor;
